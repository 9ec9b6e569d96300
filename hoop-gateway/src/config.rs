// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::defaults::{API_KEY_VAR, API_URL_VAR, DEFAULT_TIMEOUT, TIMEOUT_VAR};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVariable(&'static str),

    #[error("invalid request timeout {0:?}, expected a positive number of seconds")]
    InvalidTimeout(String),

    #[error("invalid api url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("api key contains characters not allowed in a header")]
    InvalidApiKey,

    #[error("failed building http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Connection settings for a gateway.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway API, for example `https://gateway.example/api`.
    pub api_url: String,

    /// Key sent in the `Api-Key` header of every request.
    pub api_key: String,

    pub timeout: Duration,

    /// Honor proxy settings from the environment.
    pub system_proxy: bool,
}

impl GatewayConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            system_proxy: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.system_proxy = enabled;
        self
    }

    /// Reads `HOOP_APIURL`, `HOOP_APIKEY` and the optional `HOOP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingVariable(key))
        };

        let mut config = Self::new(required(API_URL_VAR)?, required(API_KEY_VAR)?);

        if let Some(value) = lookup(TIMEOUT_VAR) {
            let secs = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout(value.clone()))?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("system_proxy", &self.system_proxy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::{ConfigError, GatewayConfig};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn reads_variables() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("HOOP_APIURL", "https://gateway.example/api"),
            ("HOOP_APIKEY", "secret"),
            ("HOOP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://gateway.example/api");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn requires_url_and_key() {
        assert_matches!(
            GatewayConfig::from_lookup(lookup(&[("HOOP_APIKEY", "secret")])),
            Err(ConfigError::MissingVariable("HOOP_APIURL"))
        );
        assert_matches!(
            GatewayConfig::from_lookup(lookup(&[
                ("HOOP_APIURL", "https://gateway.example"),
                ("HOOP_APIKEY", ""),
            ])),
            Err(ConfigError::MissingVariable("HOOP_APIKEY"))
        );
    }

    #[test]
    fn rejects_invalid_timeout() {
        assert_matches!(
            GatewayConfig::from_lookup(lookup(&[
                ("HOOP_APIURL", "https://gateway.example"),
                ("HOOP_APIKEY", "secret"),
                ("HOOP_TIMEOUT_SECS", "soon"),
            ])),
            Err(ConfigError::InvalidTimeout(value)) if value == "soon"
        );
        assert_matches!(
            GatewayConfig::from_lookup(lookup(&[
                ("HOOP_APIURL", "https://gateway.example"),
                ("HOOP_APIKEY", "secret"),
                ("HOOP_TIMEOUT_SECS", "0"),
            ])),
            Err(ConfigError::InvalidTimeout(value)) if value == "0"
        );
    }

    #[test]
    fn debug_output_hides_key() {
        let config = GatewayConfig::new("https://gateway.example", "secret");
        assert!(!format!("{config:?}").contains("secret"));
    }
}
