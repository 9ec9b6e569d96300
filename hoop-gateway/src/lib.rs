// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST adaptor connecting [`hoop_access`] to a hoop gateway.
//!
//! [`GatewayClient`] implements both collaborators of the reconciler:
//!
//! - connections are resolved with `GET /connections/{name}`,
//! - the membership index is the connection list of the `access_control` plugin, read with
//!   `GET /plugins/access_control`, created with `POST /plugins` and replaced with
//!   `PUT /plugins/access_control`.
//!
//! Every request carries the configured key in the `Api-Key` header.
//!
//! ```rust,no_run
//! use hoop_gateway::GatewayConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads HOOP_APIURL and HOOP_APIKEY.
//! let reconciler = hoop_gateway::reconciler(&GatewayConfig::from_env()?)?;
//! reconciler.create_group("eng", "", ["pg-prod", "redis"]).await?;
//! # Ok(())
//! # }
//! ```
mod client;
pub mod config;
pub mod defaults;
mod error;
pub mod wire;

pub use client::GatewayClient;
pub use config::{ConfigError, GatewayConfig};
pub use error::GatewayError;

/// Reconciler talking to a gateway for both connection lookups and index storage.
pub type GatewayReconciler = hoop_access::AccessGroupReconciler<GatewayClient, GatewayClient>;

/// Builds a reconciler sharing one client between resolver and store.
pub fn reconciler(config: &GatewayConfig) -> Result<GatewayReconciler, ConfigError> {
    let client = GatewayClient::new(config)?;
    Ok(hoop_access::AccessGroupReconciler::new(client.clone(), client))
}
