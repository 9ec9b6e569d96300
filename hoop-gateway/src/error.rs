// SPDX-License-Identifier: MIT OR Apache-2.0

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to gateway failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Gateway answered with a status the operation does not accept.
    #[error("gateway responded with {status}: {payload}")]
    Status { status: StatusCode, payload: String },

    #[error("failed decoding {resource} returned by gateway: {source}")]
    Decode {
        resource: &'static str,
        source: serde_json::Error,
    },
}
