// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces of the collaborators the reconciler is built on.
use std::error::Error;

use crate::index::{MembershipEntry, MembershipIndex};
use crate::types::{Connection, IndexId};

/// Resolves human-readable connection names to connections.
pub trait ConnectionResolver {
    type Error: Error;

    /// Looks up a connection by its name.
    ///
    /// Returns `None` if no connection with that name exists.
    fn resolve(&self, name: &str) -> impl Future<Output = Result<Option<Connection>, Self::Error>>;
}

/// Holds the single, shared membership index.
///
/// Only whole-index reads and writes are assumed, there is no partial update and no conditional
/// write.
pub trait MembershipStore {
    type Error: Error;

    /// Fetches the membership index.
    ///
    /// Returns `None` if the index was never created. This is a regular outcome and must not be
    /// reported as an error.
    fn fetch_index(&self) -> impl Future<Output = Result<Option<MembershipIndex>, Self::Error>>;

    /// Replaces all entries of the membership index.
    ///
    /// Passing no id creates the index.
    fn replace_index(
        &self,
        id: Option<&IndexId>,
        entries: Vec<MembershipEntry>,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}
