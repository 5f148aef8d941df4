// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::extract::Request;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use street_hunt::config::Config;
use street_hunt::routes::create_router;
use street_hunt::services::VisionService;
use street_hunt::store::LocalStore;
use street_hunt::AppState;
use tempfile::TempDir;

/// Serve `router` on an ephemeral local port. Returns its base URL.
#[allow(dead_code)]
pub async fn spawn_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub listener");
    let addr = listener.local_addr().expect("Stub has no address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{}", addr)
}

/// Create a test app whose vision service points at `config`.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let vision = VisionService::new(&config);
    let state = Arc::new(AppState { config, vision });
    (create_router(state.clone()), state)
}

/// Create a test app with unreachable upstreams.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

/// A fresh on-disk store. Keep the `TempDir` alive for the test.
#[allow(dead_code)]
pub fn temp_store() -> (LocalStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = LocalStore::open(dir.path()).expect("Failed to open store");
    (store, dir)
}

/// One request seen by a recording stub.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    /// Path plus query string
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[allow(dead_code)]
impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A stub server that records every request it receives.
#[allow(dead_code)]
pub struct RecordingStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

#[allow(dead_code)]
impl RecordingStub {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests matching `method` whose URI starts with `prefix`.
    pub fn matching(&self, method: Method, prefix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.uri.starts_with(prefix))
            .collect()
    }
}

/// Serve a stub answering each request with `respond(method, uri)`.
#[allow(dead_code)]
pub async fn spawn_recording_stub<F>(respond: F) -> RecordingStub
where
    F: Fn(&Method, &str) -> (StatusCode, Value) + Clone + Send + Sync + 'static,
{
    let requests = Arc::new(Mutex::new(Vec::new()));
    let sink = requests.clone();

    let router = axum::Router::new().fallback(move |request: Request| {
        let sink = sink.clone();
        let respond = respond.clone();
        async move {
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, 16 * 1024 * 1024)
                .await
                .map(|b| b.to_vec())
                .unwrap_or_default();
            let uri = parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_default();

            let (status, reply) = respond(&parts.method, &uri);
            sink.lock().unwrap().push(Recorded {
                method: parts.method,
                uri,
                headers: parts.headers,
                body,
            });
            (status, Json(reply)).into_response()
        }
    });

    RecordingStub {
        base_url: spawn_stub(router).await,
        requests,
    }
}
