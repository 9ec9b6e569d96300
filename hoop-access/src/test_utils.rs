// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use crate::index::MembershipEntry;
use crate::memory::{MemoryConnections, MemoryMembershipStore};
use crate::reconciler::AccessGroupReconciler;

pub type TestReconciler = AccessGroupReconciler<MemoryConnections, MemoryMembershipStore>;

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Reconciler over in-memory collaborators knowing the given `(id, name)` connections.
///
/// Also returns a handle to the store for inspecting what got written.
pub fn test_reconciler(connections: &[(&str, &str)]) -> (TestReconciler, MemoryMembershipStore) {
    setup_logging();

    let resolver = MemoryConnections::new();
    for (id, name) in connections {
        resolver.insert(*id, name);
    }

    let store = MemoryMembershipStore::new();
    (AccessGroupReconciler::new(resolver, store.clone()), store)
}

/// Group tags per connection id, flattened for readable assertions.
pub fn tags_by_connection(entries: &[MembershipEntry]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|entry| {
            (
                entry.connection_id.to_string(),
                entry.groups.iter().cloned().collect(),
            )
        })
        .collect()
}

/// Tags currently held by the store, empty if the index was never created.
pub fn stored_tags(store: &MemoryMembershipStore) -> BTreeMap<String, Vec<String>> {
    store
        .entries()
        .map(|entries| tags_by_connection(&entries))
        .unwrap_or_default()
}
