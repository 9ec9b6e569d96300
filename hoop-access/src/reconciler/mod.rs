// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::ReconcileError;
use crate::index::MembershipIndex;
use crate::traits::{ConnectionResolver, MembershipStore};
use crate::types::{AccessGroup, Connection, ConnectionId};


type OperationError<R, S> =
    ReconcileError<<R as ConnectionResolver>::Error, <S as MembershipStore>::Error>;

/// Maintains virtual access groups inside the shared membership index.
///
/// Each mutating operation runs fetch, compute and write while holding a lock, so operations
/// issued through the same reconciler never overwrite each other. Nothing protects against other
/// writers of the same index, see the crate documentation.
#[derive(Debug)]
pub struct AccessGroupReconciler<R, S> {
    resolver: R,
    store: S,
    write_lock: Mutex<()>,
}

impl<R, S> AccessGroupReconciler<R, S>
where
    R: ConnectionResolver,
    S: MembershipStore,
{
    pub fn new(resolver: R, store: S) -> Self {
        Self {
            resolver,
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Projects the membership index onto a group.
    ///
    /// Returns `None` if the index was never created. Otherwise the group is returned with all
    /// connections carrying its tag, which might be none at all: group existence is not tracked
    /// separately.
    pub async fn get_group(&self, name: &str) -> Result<Option<AccessGroup>, OperationError<R, S>> {
        validate_name(name)?;

        let Some(index) = self.fetch().await? else {
            debug!(group = %name, "membership index does not exist");
            return Ok(None);
        };

        Ok(Some(AccessGroup {
            name: name.to_owned(),
            description: String::new(),
            connections: index.connections_of(name),
        }))
    }

    /// Returns the names of all groups tagged on at least one connection.
    pub async fn list_groups(&self) -> Result<BTreeSet<String>, OperationError<R, S>> {
        let groups = self
            .fetch()
            .await?
            .map(|index| index.groups())
            .unwrap_or_default();
        Ok(groups)
    }

    /// Tags every given connection with the group, keeping all other tags in place.
    ///
    /// The description is accepted for parity with the group model but is not persisted. Empty
    /// connection names are ignored; when none remain nothing is fetched or written.
    pub async fn create_group<I, C>(
        &self,
        name: &str,
        description: &str,
        connections: I,
    ) -> Result<(), OperationError<R, S>>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        let _guard = self.write_lock.lock().await;
        if !description.is_empty() {
            debug!(group = %name, "access group descriptions are not persisted");
        }
        self.create_locked(name, normalize(connections)).await
    }

    /// Makes the given connections the exact member set of the group.
    ///
    /// Falls back to [`create_group`](Self::create_group) when the index does not exist yet. The
    /// index is always written, even if no tag changed.
    pub async fn update_group<I, C>(
        &self,
        name: &str,
        connections: I,
    ) -> Result<(), OperationError<R, S>>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        let _guard = self.write_lock.lock().await;
        self.update_locked(name, normalize(connections)).await
    }

    /// Removes the group tag from every connection.
    ///
    /// Nothing is written when no connection carries the tag or the index does not exist.
    pub async fn delete_group(&self, name: &str) -> Result<(), OperationError<R, S>> {
        let _guard = self.write_lock.lock().await;
        self.delete_locked(name).await
    }

    async fn create_locked(
        &self,
        name: &str,
        targets: BTreeSet<String>,
    ) -> Result<(), OperationError<R, S>> {
        validate_name(name)?;

        if targets.is_empty() {
            debug!(group = %name, "no connections given, nothing to create");
            return Ok(());
        }

        let mut index = self.fetch().await?.unwrap_or_default();
        let connections = self.resolve_all(&targets).await?;

        let mut changed = false;
        for connection in &connections {
            changed |= index.tag(connection, name);
        }

        if !changed {
            debug!(group = %name, "access group is already up to date");
            return Ok(());
        }

        self.write(name, &index).await
    }

    async fn update_locked(
        &self,
        name: &str,
        targets: BTreeSet<String>,
    ) -> Result<(), OperationError<R, S>> {
        validate_name(name)?;

        let Some(mut index) = self.fetch().await? else {
            debug!(group = %name, "membership index does not exist, creating group instead");
            return self.create_locked(name, targets).await;
        };

        let mut pending: BTreeMap<ConnectionId, Connection> = self
            .resolve_all(&targets)
            .await?
            .into_iter()
            .map(|connection| (connection.id.clone(), connection))
            .collect();

        // Connections already tagged either stay (and are done) or lose the tag.
        for connection_id in index.tagged_with(name) {
            if pending.remove(&connection_id).is_none() {
                index.untag(&connection_id, name);
            }
        }

        for connection in pending.values() {
            index.tag(connection, name);
        }

        self.write(name, &index).await
    }

    async fn delete_locked(&self, name: &str) -> Result<(), OperationError<R, S>> {
        validate_name(name)?;

        let Some(mut index) = self.fetch().await? else {
            debug!(group = %name, "membership index does not exist, nothing to delete");
            return Ok(());
        };

        if !index.untag_all(name) {
            debug!(group = %name, "no connection carries the group, nothing to delete");
            return Ok(());
        }

        self.write(name, &index).await
    }

    async fn fetch(&self) -> Result<Option<MembershipIndex>, OperationError<R, S>> {
        self.store
            .fetch_index()
            .await
            .map_err(ReconcileError::StoreUnavailable)
    }

    /// Resolves all names, failing on the first one which does not resolve.
    async fn resolve_all(
        &self,
        names: &BTreeSet<String>,
    ) -> Result<Vec<Connection>, OperationError<R, S>> {
        let mut connections = Vec::with_capacity(names.len());

        for name in names {
            let connection = self
                .resolver
                .resolve(name)
                .await
                .map_err(ReconcileError::ResolverUnavailable)?
                .ok_or_else(|| ReconcileError::ConnectionNotFound(name.clone()))?;

            if connection.id.is_empty() {
                return Err(ReconcileError::ConnectionWithoutId(name.clone()));
            }

            connections.push(Connection::new(connection.id, name.clone()));
        }

        Ok(connections)
    }

    async fn write(&self, group: &str, index: &MembershipIndex) -> Result<(), OperationError<R, S>> {
        self.store
            .replace_index(index.id(), index.to_entries())
            .await
            .map_err(ReconcileError::StoreUnavailable)?;

        info!(
            group = %group,
            entries = index.len(),
            created = index.id().is_none(),
            "membership index written"
        );
        Ok(())
    }
}

fn validate_name<RE, SE>(name: &str) -> Result<(), ReconcileError<RE, SE>> {
    if name.is_empty() {
        return Err(ReconcileError::InvalidArgument);
    }
    Ok(())
}

fn normalize<I, C>(connections: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = C>,
    C: AsRef<str>,
{
    connections
        .into_iter()
        .map(|name| name.as_ref().to_owned())
        .filter(|name| !name.is_empty())
        .collect()
}
