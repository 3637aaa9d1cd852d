//! HTTP edge service.
//!
//! Exposes the portal's public API and delegates to the search gateway,
//! the CAPTCHA verifier, and the SMTP mailer. Every handler is stateless;
//! shared collaborators live in [`AppState`], built once at startup and
//! injected through axum's `State` extractor.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/search?q=<text>` | Free-text search, engine result passed through |
//! | `POST` | `/upload` | Index a JSON array of documents |
//! | `POST` | `/contact` | Validate and forward a contact submission |
//! | `GET`  | `/health` | Liveness plus last-known engine connectivity |
//!
//! # Error Contract
//!
//! Failures are always a JSON object with an appropriate status code —
//! never a raw stack trace, never a silent 200:
//!
//! ```json
//! { "error": "Invalid JSON" }
//! { "status": "error", "missing_fields": ["email"] }
//! ```
//!
//! Gateway failures map 404 → not found, 503 → engine unavailable,
//! deadline exhaustion → 504, anything else → 500.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; the HTML frontend is
//! served from a different origin.

use axum::{
    body::Bytes,
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::captcha::verify_captcha;
use crate::config::Config;
use crate::contact::ContactForm;
use crate::error::GatewayError;
use crate::gateway::SearchGateway;
use crate::mailer::Mailer;
use crate::models::RepoDocument;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<SearchGateway>,
    pub mailer: Arc<dyn Mailer>,
}

/// Build the portal router over the given state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", get(handle_search))
        .route("/upload", post(handle_upload))
        .route("/contact", post(handle_contact))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve until the process terminates.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.server.bind.clone();
    let app = router(state);

    tracing::info!(%bind_addr, "portal listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// Error that converts into a `{"error": <message>}` JSON response.
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

/// Map a gateway failure onto the HTTP surface without leaking internals.
fn classify_gateway_error(err: GatewayError) -> AppError {
    let status = match &err {
        GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    AppError {
        status,
        message: err.to_string(),
    }
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

/// Handler for `GET /search`.
///
/// The query parameter defaults to the empty string; the engine's result
/// object is returned verbatim.
async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let results = state
        .gateway
        .search(&params.q)
        .await
        .map_err(classify_gateway_error)?;
    Ok(Json(results))
}

// ============ POST /upload ============

/// Handler for `POST /upload`.
///
/// The body must be a JSON array of documents. Malformed JSON and
/// non-array bodies are client errors; per-document problems inside a
/// well-formed batch are logged and skipped by the gateway, and the
/// endpoint still reports success for the batch.
async fn handle_upload(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let data: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| bad_request("Invalid JSON"))?;

    let items = data
        .as_array()
        .ok_or_else(|| bad_request("Expected a list of documents"))?;

    let mut documents = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<RepoDocument>(item.clone()) {
            Ok(document) => documents.push(document),
            Err(err) => {
                tracing::error!(error = %err, "rejecting malformed document in batch");
            }
        }
    }

    state.gateway.index_batch(&documents).await;

    Ok(Json(json!({ "status": "success" })))
}

// ============ POST /contact ============

/// Handler for `POST /contact`.
///
/// Validation order: required fields, email shape, consent, CAPTCHA
/// (fail closed), then the SMTP send. Every failure path returns a
/// structured `status: error` body.
async fn handle_contact(
    State(state): State<AppState>,
    Form(form): Form<ContactForm>,
) -> (StatusCode, Json<serde_json::Value>) {
    let missing = form.missing_fields();
    if !missing.is_empty() {
        tracing::warn!(?missing, "contact submission missing fields");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "missing_fields": missing })),
        );
    }

    if !form.email_is_valid() {
        return contact_error(StatusCode::BAD_REQUEST, "Invalid email address");
    }

    if !form.consent_given() {
        return contact_error(StatusCode::BAD_REQUEST, "Consent required");
    }

    let solution = form.captcha_solution.as_deref().unwrap_or_default();
    if !verify_captcha(&state.config.captcha, solution).await {
        tracing::warn!("contact submission failed CAPTCHA verification");
        return contact_error(StatusCode::BAD_REQUEST, "Captcha verification failed");
    }

    let (subject, body) = form.render_email();
    if let Err(err) = state
        .mailer
        .send(&state.config.smtp.recipient, &subject, &body)
        .await
    {
        tracing::error!(error = %err, "contact email send failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "error", "detail": err.to_string() })),
        );
    }

    (StatusCode::OK, Json(json!({ "status": "success" })))
}

fn contact_error(status: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "status": "error", "error": message })))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    /// The gateway's last-known engine connectivity; no outbound call is
    /// made to answer a health probe.
    search_engine_reachable: bool,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        search_engine_reachable: state.gateway.is_available(),
    })
}
