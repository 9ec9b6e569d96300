// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fake gateway serving the connection and plugin endpoints from memory.
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use hoop_gateway::GatewayConfig;
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const API_KEY: &str = "test-key";

#[derive(Debug, Default)]
struct GatewayState {
    connections: HashMap<String, Value>,
    plugin: Option<Value>,
    requests: Vec<String>,
    created: usize,
}

#[derive(Clone, Debug, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_connection(&self, id: &str, name: &str) {
        self.add_raw_connection(name, json!({ "id": id, "name": name, "type": "database" }));
    }

    pub fn add_raw_connection(&self, name: &str, body: Value) {
        let mut state = self.state.lock().unwrap();
        state.connections.insert(name.to_owned(), body);
    }

    /// Serves the given access control plugin as if it had been configured elsewhere.
    pub fn set_plugin(&self, plugin: Value) {
        self.state.lock().unwrap().plugin = Some(plugin);
    }

    pub fn plugin(&self) -> Option<Value> {
        self.state.lock().unwrap().plugin.clone()
    }

    /// Tags of the stored plugin as `(connection id, groups)` pairs.
    pub fn stored_tags(&self) -> Vec<(String, Vec<String>)> {
        let Some(plugin) = self.plugin() else {
            return Vec::new();
        };

        plugin["connections"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|connection| {
                let id = connection["id"].as_str().unwrap_or_default().to_owned();
                let groups = connection["config"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|group| group.as_str().map(str::to_owned))
                    .collect();
                (id, groups)
            })
            .collect()
    }

    /// Requests received so far, formatted as `METHOD path`.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Serves the fake gateway on a local port and returns its config.
    pub async fn spawn(&self) -> GatewayConfig {
        let app = Router::new()
            .route("/api/connections/{name}", get(get_connection))
            .route("/api/plugins", post(create_plugin))
            .route("/api/plugins/{name}", get(get_plugin).put(update_plugin))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr: SocketAddr = listener.local_addr().expect("addr");
        let server = axum::serve(listener, app.into_make_service());
        tokio::spawn(async move {
            let _ = server.await;
        });

        GatewayConfig::new(format!("http://{addr}/api"), API_KEY).with_system_proxy(false)
    }

    fn authorize(&self, headers: &HeaderMap, request: String) -> Result<(), StatusCode> {
        self.state.lock().unwrap().requests.push(request);

        match headers.get("api-key") {
            Some(value) if value == API_KEY => Ok(()),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}

async fn get_connection(
    State(gateway): State<FakeGateway>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    gateway.authorize(&headers, format!("GET /connections/{name}"))?;

    let state = gateway.state.lock().unwrap();
    state
        .connections
        .get(&name)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn create_plugin(
    State(gateway): State<FakeGateway>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    gateway.authorize(&headers, "POST /plugins".to_owned())?;

    let mut state = gateway.state.lock().unwrap();
    if state.plugin.is_some() {
        return Err(StatusCode::CONFLICT);
    }

    state.created += 1;
    body["id"] = json!(format!("plugin-{}", state.created));
    state.plugin = Some(body.clone());
    Ok((StatusCode::CREATED, Json(body)))
}

async fn get_plugin(
    State(gateway): State<FakeGateway>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    gateway.authorize(&headers, format!("GET /plugins/{name}"))?;

    let state = gateway.state.lock().unwrap();
    state
        .plugin
        .clone()
        .filter(|plugin| plugin["name"] == name)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_plugin(
    State(gateway): State<FakeGateway>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    gateway.authorize(&headers, format!("PUT /plugins/{name}"))?;

    let mut state = gateway.state.lock().unwrap();
    let Some(current) = state.plugin.as_ref().filter(|plugin| plugin["name"] == name) else {
        return Err(StatusCode::NOT_FOUND);
    };
    if body["id"] != current["id"] {
        return Err(StatusCode::BAD_REQUEST);
    }

    body["name"] = json!(name);
    state.plugin = Some(body.clone());
    Ok(Json(body))
}
