// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory collaborators.
//!
//! This does not talk to any gateway, all state is lost when the process ends. Use this only in
//! development or test contexts.
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use thiserror::Error;

use crate::index::{MembershipEntry, MembershipIndex};
use crate::traits::{ConnectionResolver, MembershipStore};
use crate::types::{Connection, ConnectionId, IndexId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("store is unavailable")]
    Unavailable,

    #[error("membership index already exists")]
    IndexExists,

    #[error("membership index {0} does not exist")]
    UnknownIndex(IndexId),
}

/// Connections known by name.
#[derive(Clone, Debug, Default)]
pub struct MemoryConnections {
    connections: Rc<RefCell<BTreeMap<String, ConnectionId>>>,
    unavailable: Rc<RefCell<bool>>,
}

impl MemoryConnections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<ConnectionId>, name: &str) {
        let mut connections = self.connections.borrow_mut();
        connections.insert(name.to_owned(), id.into());
    }

    /// Makes every following lookup fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.borrow_mut() = unavailable;
    }
}

impl ConnectionResolver for MemoryConnections {
    type Error = MemoryStoreError;

    async fn resolve(&self, name: &str) -> Result<Option<Connection>, Self::Error> {
        if *self.unavailable.borrow() {
            return Err(MemoryStoreError::Unavailable);
        }

        let connections = self.connections.borrow();
        Ok(connections
            .get(name)
            .map(|id| Connection::new(id.clone(), name)))
    }
}

#[derive(Debug, Default)]
struct MembershipState {
    index: Option<(IndexId, Vec<MembershipEntry>)>,
    next_id: u64,
    writes: usize,
    unavailable: bool,
}

/// Membership index kept in its wire representation.
///
/// Clones share the same state, which allows tests to inspect or tamper with the index while a
/// reconciler owns another handle.
#[derive(Clone, Debug, Default)]
pub struct MemoryMembershipStore {
    state: Rc<RefCell<MembershipState>>,
}

impl MemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a store which already holds an index with these entries.
    pub fn with_entries(id: IndexId, entries: Vec<MembershipEntry>) -> Self {
        let store = Self::new();
        store.state.borrow_mut().index = Some((id, entries));
        store
    }

    /// Stored entries, `None` if the index was never created.
    pub fn entries(&self) -> Option<Vec<MembershipEntry>> {
        let state = self.state.borrow();
        state.index.as_ref().map(|(_, entries)| entries.clone())
    }

    pub fn index_id(&self) -> Option<IndexId> {
        let state = self.state.borrow();
        state.index.as_ref().map(|(id, _)| id.clone())
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }

    /// Makes every following fetch and write fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.borrow_mut().unavailable = unavailable;
    }
}

impl MembershipStore for MemoryMembershipStore {
    type Error = MemoryStoreError;

    async fn fetch_index(&self) -> Result<Option<MembershipIndex>, Self::Error> {
        let state = self.state.borrow();
        if state.unavailable {
            return Err(MemoryStoreError::Unavailable);
        }

        Ok(state
            .index
            .as_ref()
            .map(|(id, entries)| MembershipIndex::from_entries(id.clone(), entries.clone())))
    }

    async fn replace_index(
        &self,
        id: Option<&IndexId>,
        entries: Vec<MembershipEntry>,
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        if state.unavailable {
            return Err(MemoryStoreError::Unavailable);
        }

        let id = match (id, &state.index) {
            (None, None) => {
                state.next_id += 1;
                IndexId::new(format!("index-{}", state.next_id))
            }
            (None, Some(_)) => return Err(MemoryStoreError::IndexExists),
            (Some(id), Some((current, _))) if id == current => id.clone(),
            (Some(id), _) => return Err(MemoryStoreError::UnknownIndex(id.clone())),
        };

        state.index = Some((id, entries));
        state.writes += 1;
        Ok(())
    }
}
