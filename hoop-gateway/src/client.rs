// SPDX-License-Identifier: MIT OR Apache-2.0

use hoop_access::{
    Connection, ConnectionResolver, IndexId, MembershipEntry, MembershipIndex, MembershipStore,
};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{ConfigError, GatewayConfig};
use crate::defaults::ACCESS_CONTROL_PLUGIN;
use crate::error::GatewayError;
use crate::wire::{ConnectionResource, Plugin};

const API_KEY_HEADER: &str = "api-key";

/// REST client for a hoop gateway.
///
/// Resolves connections by name and keeps the membership index in the gateway's access control
/// plugin. Redirects are never followed, a redirect response surfaces as a status error.
#[derive(Clone, Debug)]
pub struct GatewayClient {
    http: reqwest::Client,
    base: Url,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.api_url).map_err(|err| ConfigError::InvalidUrl {
            url: config.api_url.clone(),
            reason: err.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                url: config.api_url.clone(),
                reason: "url cannot be used as a base".to_owned(),
            });
        }

        let mut api_key =
            HeaderValue::from_str(&config.api_key).map_err(|_| ConfigError::InvalidApiKey)?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(config.timeout)
            .default_headers(headers);
        if !config.system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            http: builder.build()?,
            base,
        })
    }

    /// Builds a client from `HOOP_APIURL`, `HOOP_APIKEY` and `HOOP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(&GatewayConfig::from_env()?)
    }

    /// Appends percent-encoded path segments to the base url.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked when the client was built.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Fetches a JSON resource, `None` if the gateway does not know it.
    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        url: Url,
    ) -> Result<Option<T>, GatewayError> {
        debug!(%url, "GET {resource}");
        let response = self.http.get(url).send().await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await?;
                serde_json::from_slice(&body)
                    .map(Some)
                    .map_err(|source| GatewayError::Decode { resource, source })
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(status_error(response).await),
        }
    }

    async fn send_json(
        &self,
        method: Method,
        url: Url,
        body: &impl Serialize,
        accepted: &[StatusCode],
    ) -> Result<(), GatewayError> {
        debug!(%url, "{method} request");
        let response = self.http.request(method, url).json(body).send().await?;

        if accepted.contains(&response.status()) {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }
}

async fn status_error(response: Response) -> GatewayError {
    let status = response.status();
    let payload = response.text().await.unwrap_or_default();
    GatewayError::Status { status, payload }
}

impl ConnectionResolver for GatewayClient {
    type Error = GatewayError;

    async fn resolve(&self, name: &str) -> Result<Option<Connection>, Self::Error> {
        let resource: Option<ConnectionResource> = self
            .get_json("connection", self.url(&["connections", name]))
            .await?;
        Ok(resource.map(Connection::from))
    }
}

impl MembershipStore for GatewayClient {
    type Error = GatewayError;

    async fn fetch_index(&self) -> Result<Option<MembershipIndex>, Self::Error> {
        let plugin: Option<Plugin> = self
            .get_json("plugin", self.url(&["plugins", ACCESS_CONTROL_PLUGIN]))
            .await?;

        Ok(plugin.and_then(|plugin| {
            let index = plugin.into_index();
            if index.is_none() {
                warn!("access control plugin has no id, treating it as absent");
            }
            index
        }))
    }

    async fn replace_index(
        &self,
        id: Option<&IndexId>,
        entries: Vec<MembershipEntry>,
    ) -> Result<(), Self::Error> {
        match id {
            None => {
                self.send_json(
                    Method::POST,
                    self.url(&["plugins"]),
                    &Plugin::access_control(None, entries),
                    &[StatusCode::CREATED, StatusCode::OK],
                )
                .await
            }
            Some(id) => {
                // Only the connections change, every other plugin setting is written back as
                // served.
                let current: Option<Plugin> = self
                    .get_json("plugin", self.url(&["plugins", ACCESS_CONTROL_PLUGIN]))
                    .await?;
                let plugin = match current {
                    Some(current) => current.with_entries(id, entries),
                    None => {
                        warn!(index_id = %id, "access control plugin vanished before write");
                        Plugin::access_control(Some(id), entries)
                    }
                };

                self.send_json(
                    Method::PUT,
                    self.url(&["plugins", ACCESS_CONTROL_PLUGIN]),
                    &plugin,
                    &[StatusCode::OK],
                )
                .await
            }
        }
    }
}
