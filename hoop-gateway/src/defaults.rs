// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default values used for gateway configuration.
use std::time::Duration;

/// Environment variable holding the gateway API URL.
pub const API_URL_VAR: &str = "HOOP_APIURL";

/// Environment variable holding the gateway API key.
pub const API_KEY_VAR: &str = "HOOP_APIKEY";

/// Environment variable overriding the request timeout, in seconds.
pub const TIMEOUT_VAR: &str = "HOOP_TIMEOUT_SECS";

/// Timeout applied to every request sent to the gateway.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Name of the gateway plugin whose connection list holds the membership index.
pub const ACCESS_CONTROL_PLUGIN: &str = "access_control";
