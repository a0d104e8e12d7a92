//! Blueprint HTTP API
//!
//! Axum server exposing the blueprint conversation to the web front end.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum
//! dispatch machinery.
//!
//! Endpoints:
//! - GET  /health         : liveness plus open session count
//! - GET  /version        : server version info
//! - POST /agent/start    : first blueprint for an idea
//! - POST /agent/message  : revise the blueprint
//! - POST /agent/finalize : render, email, close the session
//!
//! Anything else falls through to `http.static_dir` when configured.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use blueprint_core::{BlueprintConfig, ConversationError};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::subsystems::conversation::ConversationController;

/// Shared state for all HTTP handlers
pub struct HttpState {
    pub controller: ConversationController,
    pub config: BlueprintConfig,
}

/// Build the Axum router with all endpoints and layers
pub fn build_router(state: Arc<HttpState>) -> Router {
    let cors = cors_layer(&state.config.http.allowed_origins);
    let static_dir = state.config.http.static_dir.clone();

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/agent/start", post(start_handler))
        .route("/agent/message", post(message_handler))
        .route("/agent/finalize", post(finalize_handler))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => {
            tracing::info!("Serving static files from: {}", dir);
            router.fallback_service(ServeDir::new(dir))
        }
        None => router,
    };

    router.layer(TraceLayer::new_for_http()).layer(cors)
}

/// `*` or no origins at all means any origin may call the API.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o.trim() == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Blueprint HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub idea: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub session_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub session_id: Option<String>,
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

/// Map a lifecycle error to its HTTP status and JSON body.
pub fn error_response(err: &ConversationError) -> (StatusCode, serde_json::Value) {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        serde_json::json!({
            "error": err.to_string(),
            "kind": err.kind(),
            "status": "error",
        }),
    )
}

/// Unreadable request bodies (bad JSON, wrong field types, missing
/// content type) are validation failures like any other.
pub fn rejection_response(rejection: &JsonRejection) -> (StatusCode, serde_json::Value) {
    tracing::debug!(error = %rejection.body_text(), "Rejected request body");
    error_response(&ConversationError::Validation(rejection.body_text()))
}

pub fn health_inner(controller: &ConversationController) -> serde_json::Value {
    serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": controller.store().len(),
        "completion": controller.completion_backend(),
    })
}

/// Version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "blueprint/1",
    })
}

pub async fn start_inner(
    controller: &ConversationController,
    req: StartRequest,
) -> (StatusCode, serde_json::Value) {
    let idea = req.idea.unwrap_or_default();
    let email = req.email.unwrap_or_default();

    match controller.start(&idea, &email).await {
        Ok(out) => (
            StatusCode::OK,
            serde_json::json!({
                "sessionId": out.session_id.to_string(),
                "blueprint": out.blueprint,
            }),
        ),
        Err(e) => error_response(&e),
    }
}

pub async fn message_inner(
    controller: &ConversationController,
    req: MessageRequest,
) -> (StatusCode, serde_json::Value) {
    let session_id = req.session_id.unwrap_or_default();
    let message = req.message.unwrap_or_default();

    match controller.continue_session(&session_id, &message).await {
        Ok(out) => (
            StatusCode::OK,
            serde_json::json!({
                "reply": out.reply,
                "blueprint": out.blueprint,
            }),
        ),
        Err(e) => error_response(&e),
    }
}

pub async fn finalize_inner(
    controller: &ConversationController,
    req: FinalizeRequest,
) -> (StatusCode, serde_json::Value) {
    let session_id = req.session_id.unwrap_or_default();

    match controller.finalize(&session_id).await {
        Ok(out) => (StatusCode::OK, serde_json::json!({ "message": out.message })),
        Err(e) => error_response(&e),
    }
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(health_inner(&state.controller)))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn start_handler(
    State(state): State<Arc<HttpState>>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match body {
        Ok(Json(req)) => start_inner(&state.controller, req).await,
        Err(rejection) => rejection_response(&rejection),
    };
    (status, Json(body))
}

pub async fn message_handler(
    State(state): State<Arc<HttpState>>,
    body: Result<Json<MessageRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match body {
        Ok(Json(req)) => message_inner(&state.controller, req).await,
        Err(rejection) => rejection_response(&rejection),
    };
    (status, Json(body))
}

pub async fn finalize_handler(
    State(state): State<Arc<HttpState>>,
    body: Result<Json<FinalizeRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match body {
        Ok(Json(req)) => finalize_inner(&state.controller, req).await,
        Err(rejection) => rejection_response(&rejection),
    };
    (status, Json(body))
}

// ============================================================================
// Unit Tests (inner functions called directly)
// ============================================================================
