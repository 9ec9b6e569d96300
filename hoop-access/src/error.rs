// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// Errors of reconciler operations.
///
/// `InvalidArgument`, `ConnectionNotFound` and `ConnectionWithoutId` are caller errors, they are
/// raised before anything is written. The `*Unavailable` variants wrap infrastructure failures
/// of the collaborators and are safe to retry by re-invoking the whole operation.
#[derive(Debug, Error)]
pub enum ReconcileError<RE, SE> {
    #[error("access group name must not be empty")]
    InvalidArgument,

    #[error("connection {0} does not exist")]
    ConnectionNotFound(String),

    #[error("connection {0} has no id")]
    ConnectionWithoutId(String),

    #[error("failed resolving connection: {0}")]
    ResolverUnavailable(RE),

    #[error("membership store unavailable: {0}")]
    StoreUnavailable(SE),
}
