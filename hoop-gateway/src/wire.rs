// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON bodies exchanged with the gateway.
//!
//! The membership index lives in the connection list of the `access_control` plugin: every
//! connection entry carries the group names it is tagged with as its `config`.
use std::collections::BTreeSet;

use hoop_access::{Connection, ConnectionId, IndexId, MembershipEntry, MembershipIndex};
use serde::{Deserialize, Deserializer, Serialize};

use crate::defaults::ACCESS_CONTROL_PLUGIN;

/// Connection as returned by `GET /connections/{name}`.
///
/// Only the fields needed to tag a connection are decoded, everything else is ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionResource {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

impl From<ConnectionResource> for Connection {
    fn from(resource: ConnectionResource) -> Self {
        Connection::new(resource.id, resource.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConnection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub config: Vec<String>,
}

impl From<MembershipEntry> for PluginConnection {
    fn from(entry: MembershipEntry) -> Self {
        Self {
            id: entry.connection_id.to_string(),
            name: entry.connection_name,
            config: entry.groups.into_iter().collect(),
        }
    }
}

impl From<PluginConnection> for MembershipEntry {
    fn from(connection: PluginConnection) -> Self {
        Self {
            connection_id: ConnectionId::new(connection.id),
            connection_name: connection.name,
            groups: connection
                .config
                .into_iter()
                .filter(|group| !group.is_empty())
                .collect::<BTreeSet<_>>(),
        }
    }
}

/// Plugin resource as served under `/plugins`.
///
/// Fields unrelated to membership, including ones unknown to this crate, are kept as served so a
/// fetched plugin can be written back unchanged apart from its connections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub connections: Vec<PluginConnection>,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub source: Option<serde_json::Value>,
    #[serde(default)]
    pub priority: i64,
    #[serde(rename = "installed?", default)]
    pub installed: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Plugin {
    /// New access control plugin holding the given membership entries.
    pub fn access_control(id: Option<&IndexId>, entries: Vec<MembershipEntry>) -> Self {
        Self {
            id: id.map(|id| id.to_string()),
            name: ACCESS_CONTROL_PLUGIN.to_owned(),
            connections: entries.into_iter().map(PluginConnection::from).collect(),
            config: None,
            source: None,
            priority: 0,
            installed: true,
            extra: serde_json::Map::new(),
        }
    }

    /// Replaces the connections with the given membership entries, leaving everything else as is.
    pub fn with_entries(mut self, id: &IndexId, entries: Vec<MembershipEntry>) -> Self {
        self.id = Some(id.to_string());
        self.connections = entries.into_iter().map(PluginConnection::from).collect();
        self
    }

    /// Membership index held by this plugin.
    ///
    /// Returns `None` if the gateway did not report an id for the plugin.
    pub fn into_index(self) -> Option<MembershipIndex> {
        let id = self.id.filter(|id| !id.is_empty())?;
        Some(MembershipIndex::from_entries(
            IndexId::new(id),
            self.connections.into_iter().map(MembershipEntry::from),
        ))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use hoop_access::{Connection, ConnectionId, IndexId, MembershipEntry};
    use serde_json::json;

    use super::{ConnectionResource, Plugin};

    #[test]
    fn decodes_access_control_plugin() {
        let plugin: Plugin = serde_json::from_value(json!({
            "id": "plugin-1",
            "name": "access_control",
            "connections": [
                { "id": "c2", "name": "pg-prod", "config": ["ops", "eng"] },
                { "id": "c1", "name": "pg-dev", "config": null },
                { "id": "c2", "name": "pg-prod", "config": ["sre"] }
            ],
            "config": null,
            "source": null,
            "priority": 0,
            "installed?": true
        }))
        .unwrap();

        let index = plugin.into_index().unwrap();
        assert_eq!(index.id(), Some(&IndexId::new("plugin-1")));
        assert_eq!(index.len(), 1);

        let entry = index.get(&ConnectionId::new("c2")).unwrap();
        assert_eq!(entry.connection_name, "pg-prod");
        assert!(entry.has_group("eng") && entry.has_group("ops") && entry.has_group("sre"));
    }

    #[test]
    fn plugin_without_id_is_no_index() {
        let plugin: Plugin = serde_json::from_value(json!({
            "name": "access_control",
            "connections": null
        }))
        .unwrap();
        assert!(plugin.into_index().is_none());
    }

    #[test]
    fn encodes_membership_entries() {
        let connection = Connection::new("c1", "pg-dev");
        let plugin = Plugin::access_control(None, vec![MembershipEntry::new(&connection, "eng")]);

        assert_eq!(
            serde_json::to_value(&plugin).unwrap(),
            json!({
                "name": "access_control",
                "connections": [{ "id": "c1", "name": "pg-dev", "config": ["eng"] }],
                "config": null,
                "source": null,
                "priority": 0,
                "installed?": true
            })
        );
    }

    #[test]
    fn keeps_plugin_settings_when_replacing_entries() {
        let served = json!({
            "id": "plugin-7",
            "name": "access_control",
            "connections": [{ "id": "c9", "name": "old-db", "config": ["legacy"] }],
            "config": { "envvars": { "K": "V" } },
            "source": { "kind": "builtin" },
            "priority": 5,
            "installed?": false,
            "description": "managed elsewhere"
        });
        let plugin: Plugin = serde_json::from_value(served.clone()).unwrap();

        let connection = Connection::new("c1", "");
        let plugin = plugin.with_entries(
            &IndexId::new("plugin-7"),
            vec![MembershipEntry::new(&connection, "eng")],
        );

        let mut expected = served;
        expected["connections"] = json!([{ "id": "c1", "config": ["eng"] }]);
        assert_eq!(serde_json::to_value(&plugin).unwrap(), expected);
    }

    #[test]
    fn connection_without_id_decodes_empty() {
        let resource: ConnectionResource =
            serde_json::from_value(json!({ "name": "pg-dev", "type": "database" })).unwrap();
        let connection = Connection::from(resource);
        assert!(connection.id.is_empty());
        assert_eq!(connection.name, "pg-dev");
    }
}
