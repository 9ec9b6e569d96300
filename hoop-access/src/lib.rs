// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side reconciliation of access-group membership.
//!
//! The gateway has no native notion of an "access group". Membership is encoded indirectly: one
//! shared resource, the _membership index_, holds a list of connections and for each of them the
//! set of group names ("tags") allowed to access it. A group is therefore _virtual_, it only
//! exists as the projection of that index onto a group name.
//!
//! [`AccessGroupReconciler`] implements group-level operations (get, create, update, delete) on
//! top of two collaborators:
//!
//! - a [`ConnectionResolver`], turning human-readable connection names into stable identifiers,
//! - a [`MembershipStore`], fetching and fully replacing the membership index.
//!
//! Every mutating operation fetches the current index, computes the target index in memory and
//! writes it back as a whole. Tags of other groups on shared connections are never touched and
//! entries are pruned as soon as their last tag is removed.
//!
//! ```rust
//! # use hoop_access::memory::{MemoryConnections, MemoryMembershipStore};
//! # use hoop_access::AccessGroupReconciler;
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let connections = MemoryConnections::new();
//! connections.insert("c1", "db1");
//! connections.insert("c2", "db2");
//!
//! let reconciler = AccessGroupReconciler::new(connections, MemoryMembershipStore::new());
//! reconciler.create_group("eng", "", ["db1", "db2"]).await?;
//!
//! let group = reconciler.get_group("eng").await?.expect("index exists after first write");
//! assert_eq!(group.connections.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrent writers
//!
//! The gateway offers no compare-and-swap or version token for the index. A reconciler serializes
//! its own operations, but two processes reconciling at the same moment can still overwrite each
//! other's changes: the later write replaces the whole index computed from a stale fetch. Callers
//! running several writers against the same gateway must serialize them externally.
mod error;
mod index;
#[cfg(feature = "memory")]
pub mod memory;
mod reconciler;
#[cfg(feature = "test_utils")]
pub mod test_utils;
mod traits;
mod types;

pub use error::ReconcileError;
pub use index::{MembershipEntry, MembershipIndex};
pub use reconciler::AccessGroupReconciler;
pub use traits::{ConnectionResolver, MembershipStore};
pub use types::{AccessGroup, Connection, ConnectionId, IndexId};
