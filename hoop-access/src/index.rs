// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{Connection, ConnectionId, IndexId};

/// Group tags attached to a single connection.
///
/// This is the only persisted representation of membership: a connection belongs to a group iff
/// its entry carries that group's name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEntry {
    pub connection_id: ConnectionId,
    pub connection_name: String,
    #[serde(rename = "group_tags")]
    pub groups: BTreeSet<String>,
}

impl MembershipEntry {
    pub fn new(connection: &Connection, group: &str) -> Self {
        Self {
            connection_id: connection.id.clone(),
            connection_name: connection.name.clone(),
            groups: BTreeSet::from([group.to_owned()]),
        }
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

/// Inverted index of connection to group tags, keyed by connection id.
///
/// There is exactly one index per deployment. It is created lazily by the first write and never
/// removed afterwards, even when no entries remain. An index without an [`IndexId`] has not been
/// written to the store yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MembershipIndex {
    id: Option<IndexId>,
    entries: BTreeMap<ConnectionId, MembershipEntry>,
}

impl MembershipIndex {
    /// Returns an empty index which does not exist in the store yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the index from the list representation used on the wire.
    ///
    /// Entries for the same connection are merged and entries without any tag are dropped, the
    /// store is expected to never hold either.
    pub fn from_entries(id: IndexId, entries: impl IntoIterator<Item = MembershipEntry>) -> Self {
        let mut index = Self {
            id: Some(id),
            entries: BTreeMap::new(),
        };

        for entry in entries {
            if entry.groups.is_empty() {
                warn!(
                    connection_id = %entry.connection_id,
                    "dropping membership entry without group tags"
                );
                continue;
            }

            match index.entries.entry(entry.connection_id.clone()) {
                Entry::Vacant(vacant) => {
                    vacant.insert(entry);
                }
                Entry::Occupied(mut occupied) => {
                    warn!(
                        connection_id = %entry.connection_id,
                        "merging duplicate membership entries"
                    );
                    occupied.get_mut().groups.extend(entry.groups);
                }
            }
        }

        index
    }

    /// Returns the list representation used on the wire, ordered by connection id.
    pub fn to_entries(&self) -> Vec<MembershipEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn id(&self) -> Option<&IndexId> {
        self.id.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<&MembershipEntry> {
        self.entries.get(connection_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &MembershipEntry> {
        self.entries.values()
    }

    /// Names of all connections tagged with this group.
    pub fn connections_of(&self, group: &str) -> BTreeSet<String> {
        self.entries
            .values()
            .filter(|entry| entry.has_group(group))
            .map(|entry| entry.connection_name.clone())
            .collect()
    }

    /// Ids of all connections tagged with this group.
    pub fn tagged_with(&self, group: &str) -> Vec<ConnectionId> {
        self.entries
            .values()
            .filter(|entry| entry.has_group(group))
            .map(|entry| entry.connection_id.clone())
            .collect()
    }

    /// Every group name referenced by at least one entry.
    pub fn groups(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .flat_map(|entry| entry.groups.iter().cloned())
            .collect()
    }

    /// Adds the group tag to a connection, creating its entry if needed.
    ///
    /// Returns `true` if the index changed. An existing entry keeps its recorded connection name.
    pub fn tag(&mut self, connection: &Connection, group: &str) -> bool {
        match self.entries.entry(connection.id.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(MembershipEntry::new(connection, group));
                true
            }
            Entry::Occupied(mut occupied) => occupied.get_mut().groups.insert(group.to_owned()),
        }
    }

    /// Removes the group tag from a connection, dropping the entry once no tag is left.
    ///
    /// Returns `true` if the index changed.
    pub fn untag(&mut self, connection_id: &ConnectionId, group: &str) -> bool {
        let Some(entry) = self.entries.get_mut(connection_id) else {
            return false;
        };

        let removed = entry.groups.remove(group);
        if entry.groups.is_empty() {
            self.entries.remove(connection_id);
        }
        removed
    }

    /// Removes the group tag from every connection.
    ///
    /// Returns `true` if the index changed.
    pub fn untag_all(&mut self, group: &str) -> bool {
        let mut changed = false;
        self.entries.retain(|_, entry| {
            changed |= entry.groups.remove(group);
            !entry.groups.is_empty()
        });
        changed
    }
}
