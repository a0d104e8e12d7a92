//! HTTP integration tests for the blueprint REST API
//!
//! Full handler dispatch through the Axum router via `oneshot`, with stub
//! completion, renderer and mailer collaborators.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use blueprint_core::document::ArtifactRenderer;
use blueprint_core::mailer::{Delivery, MailError, Mailer};
use blueprint_core::{BlueprintConfig, ChatMessage, CompletionBackend, DocumentRenderer};
use blueprint_server::http::{build_router, HttpState};
use blueprint_server::subsystems::conversation::ConversationController;
use blueprint_server::subsystems::sessions::SessionStore;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Echoes the latest user turn back as the blueprint.
struct EchoBackend;

#[async_trait]
impl CompletionBackend for EchoBackend {
    async fn complete(&self, history: &[ChatMessage]) -> Option<String> {
        let last = history.last()?;
        if last.content.contains("FAIL") {
            return None;
        }
        Some(format!("# Blueprint\n- {}", last.content))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

#[derive(Default)]
struct InboxMailer {
    inbox: Mutex<Vec<Delivery>>,
}

#[async_trait]
impl Mailer for InboxMailer {
    async fn send(&self, delivery: Delivery) -> Result<(), MailError> {
        if delivery.recipient.ends_with("@bounce.test") {
            return Err(MailError::Transport("550 mailbox unavailable".to_string()));
        }
        self.inbox.lock().unwrap().push(delivery);
        Ok(())
    }

    fn name(&self) -> &str {
        "inbox"
    }
}

fn make_app(config: BlueprintConfig) -> (axum::Router, Arc<InboxMailer>) {
    let mailer = Arc::new(InboxMailer::default());
    let renderer: Arc<dyn ArtifactRenderer> = Arc::new(DocumentRenderer::default());
    let controller = ConversationController::new(
        Arc::new(SessionStore::new()),
        Arc::new(EchoBackend),
        renderer,
        mailer.clone(),
    );
    let state = Arc::new(HttpState { controller, config });
    (build_router(state), mailer)
}

async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ===========================================================================
// TEST 1: full start -> message -> finalize round through the router
// ===========================================================================
#[tokio::test]
async fn test_full_conversation_over_http() {
    let (app, mailer) = make_app(BlueprintConfig::default());

    let (status, body) = post_json(
        &app,
        "/agent/start",
        json!({"idea": "bakery site", "email": "a@b.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "start failed: {:?}", body);
    let session_id = body["sessionId"].as_str().expect("sessionId").to_string();
    assert!(body["blueprint"].as_str().unwrap().starts_with("# Blueprint"));

    let (status, body) = post_json(
        &app,
        "/agent/message",
        json!({"sessionId": session_id, "message": "add online ordering"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "message failed: {:?}", body);
    assert_eq!(body["reply"], "# Blueprint\n- add online ordering");
    assert_eq!(body["reply"], body["blueprint"]);

    let (status, body) =
        post_json(&app, "/agent/finalize", json!({"sessionId": session_id})).await;
    assert_eq!(status, StatusCode::OK, "finalize failed: {:?}", body);
    assert!(body["message"].as_str().unwrap().contains("a@b.com"));

    let inbox = mailer.inbox.lock().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].recipient, "a@b.com");
    assert!(inbox[0].attachment.starts_with(b"%PDF"));
}

// ===========================================================================
// TEST 2: missing start fields -> 400
// ===========================================================================
#[tokio::test]
async fn test_start_missing_fields_is_400() {
    let (app, _) = make_app(BlueprintConfig::default());

    for body in [json!({}), json!({"idea": "x"}), json!({"email": "a@b.com"})] {
        let (status, resp) = post_json(&app, "/agent/start", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["status"], "error");
        assert_eq!(resp["kind"], "validation");
    }
}

// ===========================================================================
// TEST 3: generation failure -> 500
// ===========================================================================
#[tokio::test]
async fn test_start_generation_failure_is_500() {
    let (app, _) = make_app(BlueprintConfig::default());

    let (status, resp) = post_json(
        &app,
        "/agent/start",
        json!({"idea": "FAIL please", "email": "a@b.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp["kind"], "generation");
}

// ===========================================================================
// TEST 4: unknown session on message / finalize -> 400
// ===========================================================================
#[tokio::test]
async fn test_unknown_session_is_400() {
    let (app, _) = make_app(BlueprintConfig::default());
    let unknown = uuid::Uuid::new_v4().to_string();

    let (status, resp) = post_json(
        &app,
        "/agent/message",
        json!({"sessionId": unknown, "message": "hello"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["kind"], "not_found");

    let (status, resp) = post_json(&app, "/agent/finalize", json!({"sessionId": "garbage"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["kind"], "not_found");
}

// ===========================================================================
// TEST 5: mail bounce -> 500 and the session survives for a retry
// ===========================================================================
#[tokio::test]
async fn test_finalize_delivery_failure_is_500() {
    let (app, _) = make_app(BlueprintConfig::default());

    let (_, body) = post_json(
        &app,
        "/agent/start",
        json!({"idea": "florist", "email": "x@bounce.test"}),
    )
    .await;
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let (status, resp) =
        post_json(&app, "/agent/finalize", json!({"sessionId": session_id})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp["kind"], "delivery");

    let (status, _) = post_json(
        &app,
        "/agent/message",
        json!({"sessionId": session_id, "message": "still here?"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ===========================================================================
// TEST 6: health and version
// ===========================================================================
#[tokio::test]
async fn test_health_and_version_endpoints() {
    let (app, _) = make_app(BlueprintConfig::default());

    post_json(
        &app,
        "/agent/start",
        json!({"idea": "bakery", "email": "a@b.com"}),
    )
    .await;

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["sessions"], 1);
    assert_eq!(body["completion"], "echo");

    let (status, body) = get_json(&app, "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["protocol"], "blueprint/1");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

// ===========================================================================
// TEST 7: CORS preflight honours the configured origin list
// ===========================================================================
#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let mut config = BlueprintConfig::default();
    config.http.allowed_origins = vec!["https://studio.example".to_string()];
    let (app, _) = make_app(config);

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/agent/start")
        .header("origin", "https://studio.example")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("https://studio.example")
    );

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/agent/start")
        .header("origin", "https://elsewhere.example")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());
}

// ===========================================================================
// TEST 8: static directory serves the front end for unmatched paths
// ===========================================================================
#[tokio::test]
async fn test_static_dir_fallback() {
    let dir = std::env::temp_dir().join(format!("blueprint-static-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "<h1>Blueprint</h1>").unwrap();

    let mut config = BlueprintConfig::default();
    config.http.static_dir = Some(dir.to_string_lossy().to_string());
    let (app, _) = make_app(config);

    let req = Request::builder()
        .method("GET")
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"<h1>Blueprint</h1>");

    std::fs::remove_dir_all(&dir).ok();
}

async fn post_raw(
    app: &axum::Router,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header("content-type", ct);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// ===========================================================================
// TEST 9: unreadable bodies get the structured 400 error
// ===========================================================================
#[tokio::test]
async fn test_malformed_bodies_are_structured_400() {
    let (app, _) = make_app(BlueprintConfig::default());

    let cases = [
        (
            "/agent/start",
            Some("application/json"),
            r#"{"idea": 5, "email": "a@b.com"}"#,
        ),
        ("/agent/message", Some("application/json"), "{sessionId"),
        ("/agent/finalize", None, r#"{"sessionId": "abc"}"#),
    ];

    for (uri, content_type, body) in cases {
        let (status, resp) = post_raw(&app, uri, content_type, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} with {:?}", uri, body);
        assert_eq!(resp["status"], "error", "{} returned {:?}", uri, resp);
        assert_eq!(resp["kind"], "validation");
        assert!(
            resp["error"].as_str().is_some_and(|e| !e.is_empty()),
            "{} should explain the rejection",
            uri
        );
    }
}
