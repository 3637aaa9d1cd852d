//! Shared fixtures: an in-process stub of the search engine's HTTP API,
//! a stub CAPTCHA endpoint, and a recording mailer.
//!
//! The stub engine keeps collections as in-memory maps and answers with
//! Typesense-shaped JSON. A countdown of forced 503 responses makes the
//! retry scenarios deterministic.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use ossfinder::config::{CaptchaConfig, Config, ServerConfig, SmtpConfig, TypesenseConfig};
use ossfinder::mailer::Mailer;

// ============ Stub search engine ============

#[derive(Default)]
pub struct EngineState {
    /// collection name → document id → document body.
    pub collections: Mutex<HashMap<String, HashMap<String, Value>>>,
    /// While > 0, collection and document routes answer 503 and count down.
    pub fail_remaining: AtomicUsize,
    /// Total collection/document requests observed (healthy or not).
    pub requests: AtomicUsize,
}

impl EngineState {
    pub fn set_unavailable_for(&self, responses: usize) {
        self.fail_remaining.store(responses, Ordering::SeqCst);
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map_or(0, |docs| docs.len())
    }

    pub fn insert_document(&self, collection: &str, id: &str, document: Value) {
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    fn gate(&self) -> Option<Response> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut remaining = self.fail_remaining.load(Ordering::SeqCst);
        while remaining > 0 {
            match self.fail_remaining.compare_exchange(
                remaining,
                remaining - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    return Some(
                        (
                            StatusCode::SERVICE_UNAVAILABLE,
                            Json(json!({ "message": "Not Ready" })),
                        )
                            .into_response(),
                    )
                }
                Err(current) => remaining = current,
            }
        }
        None
    }
}

pub struct StubEngine {
    pub addr: SocketAddr,
    pub state: Arc<EngineState>,
}

pub async fn spawn_engine() -> StubEngine {
    let state = Arc::new(EngineState::default());

    let app = Router::new()
        .route("/health", get(engine_health))
        .route("/collections", post(create_collection))
        .route("/collections/{name}", get(get_collection))
        .route("/collections/{name}/documents", post(create_document))
        .route("/collections/{name}/documents/search", get(search_documents))
        .route("/collections/{name}/documents/{id}", get(get_document))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubEngine { addr, state }
}

async fn engine_health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn get_collection(
    State(state): State<Arc<EngineState>>,
    Path(name): Path<String>,
) -> Response {
    if let Some(unavailable) = state.gate() {
        return unavailable;
    }
    let collections = state.collections.lock().unwrap();
    match collections.get(&name) {
        Some(docs) => Json(json!({ "name": name, "num_documents": docs.len() })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Not Found" })),
        )
            .into_response(),
    }
}

async fn create_collection(
    State(state): State<Arc<EngineState>>,
    Json(schema): Json<Value>,
) -> Response {
    if let Some(unavailable) = state.gate() {
        return unavailable;
    }
    let name = match schema["name"].as_str() {
        Some(name) => name.to_string(),
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "missing name" })),
            )
                .into_response()
        }
    };

    let mut collections = state.collections.lock().unwrap();
    if collections.contains_key(&name) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": format!("A collection with name `{}` already exists.", name) })),
        )
            .into_response();
    }
    collections.insert(name, HashMap::new());
    (StatusCode::CREATED, Json(schema)).into_response()
}

async fn get_document(
    State(state): State<Arc<EngineState>>,
    Path((name, id)): Path<(String, String)>,
) -> Response {
    if let Some(unavailable) = state.gate() {
        return unavailable;
    }
    let collections = state.collections.lock().unwrap();
    match collections.get(&name).and_then(|docs| docs.get(&id)) {
        Some(document) => Json(document.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": format!("Could not find a document with id: {}", id) })),
        )
            .into_response(),
    }
}

async fn create_document(
    State(state): State<Arc<EngineState>>,
    Path(name): Path<String>,
    Json(document): Json<Value>,
) -> Response {
    if let Some(unavailable) = state.gate() {
        return unavailable;
    }
    let id = match document["id"].as_str() {
        Some(id) => id.to_string(),
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "document is missing an id" })),
            )
                .into_response()
        }
    };

    let mut collections = state.collections.lock().unwrap();
    let docs = match collections.get_mut(&name) {
        Some(docs) => docs,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Not Found" })),
            )
                .into_response()
        }
    };

    if docs.contains_key(&id) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": format!("A document with id {} already exists.", id) })),
        )
            .into_response();
    }
    docs.insert(id, document.clone());
    (StatusCode::CREATED, Json(document)).into_response()
}

async fn search_documents(
    State(state): State<Arc<EngineState>>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Some(unavailable) = state.gate() {
        return unavailable;
    }
    let query = params.get("q").cloned().unwrap_or_default().to_lowercase();

    let collections = state.collections.lock().unwrap();
    let docs = collections.get(&name).cloned().unwrap_or_default();

    let matches_query = |doc: &Value| {
        if query.is_empty() {
            return true;
        }
        ["name", "description", "organisation"].iter().any(|field| {
            doc[field]
                .as_str()
                .map_or(false, |text| text.to_lowercase().contains(&query))
        })
    };

    let hits: Vec<Value> = docs
        .values()
        .filter(|doc| matches_query(doc))
        .map(|doc| json!({ "document": doc, "highlight": {}, "text_match": 12345 }))
        .collect();

    Json(json!({
        "facet_counts": [],
        "found": hits.len(),
        "hits": hits,
        "out_of": docs.len(),
        "page": 1,
        "search_time_ms": 1
    }))
    .into_response()
}

// ============ Stub CAPTCHA endpoint ============

/// Serve a verification endpoint that always answers `success`.
/// Returns the full verify URL.
pub async fn spawn_captcha(success: bool) -> String {
    let app = Router::new().route(
        "/api/v1/siteverify",
        post(move || async move { Json(json!({ "success": success, "errors": [] })) }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/api/v1/siteverify", addr)
}

// ============ Recording mailer ============

/// Mailer double that records sends instead of talking SMTP.
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.sent.lock().unwrap().push((
            to.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

// ============ Config helpers ============

/// Gateway config pointed at the stub engine, with test-friendly timings.
pub fn engine_config(addr: SocketAddr) -> TypesenseConfig {
    TypesenseConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        protocol: "http".to_string(),
        api_key: "test-key".to_string(),
        collection: "ossfinder".to_string(),
        connect_retries: 10,
        connect_retry_delay_secs: 0,
        op_deadline_secs: 2,
        op_backoff_secs: 1,
        request_timeout_secs: 2,
    }
}

/// Full portal config over the stub engine. The CAPTCHA URL points at a
/// closed port until a test swaps in a stub endpoint.
pub fn portal_config(engine_addr: SocketAddr) -> Config {
    Config {
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
        typesense: engine_config(engine_addr),
        smtp: SmtpConfig {
            recipient: "team@example.org".to_string(),
            from: "portal@example.org".to_string(),
            ..SmtpConfig::default()
        },
        captcha: CaptchaConfig {
            verify_url: "http://127.0.0.1:9/api/v1/siteverify".to_string(),
            site_key: "test-site".to_string(),
            secret: "test-secret".to_string(),
            timeout_secs: 1,
        },
    }
}
