#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;

use roster_api::auth::jwt::{generate_access_token, JwtConfig};
use roster_api::config::ServerConfig;
use roster_api::routes;
use roster_api::state::AppState;
use roster_db::{MemoryDocumentIndex, MemoryGroupDirectory, MemoryPrincipalDirectory, MemoryProjectStore};
use roster_engine::{Collaborators, ProjectService};
use roster_registry::MemoryRegistry;

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        registry_proxy_url: None,
        collaborator_timeout_ms: 500,
    }
}

/// Handles to the in-memory collaborators behind a test app.
pub struct TestBackend {
    pub groups: Arc<MemoryGroupDirectory>,
    pub principals: Arc<MemoryPrincipalDirectory>,
    pub documents: Arc<MemoryDocumentIndex>,
}

/// Build the application router over fresh in-memory collaborators.
///
/// Mirrors the router construction in `main.rs`, minus CORS and tracing.
pub async fn build_test_app() -> (Router, TestBackend) {
    build_test_app_with_registry(MemoryRegistry::new()).await
}

/// Like [`build_test_app`], serving repository listings from `registry`.
/// The default project exists, as it does after start-up.
pub async fn build_test_app_with_registry(registry: MemoryRegistry) -> (Router, TestBackend) {
    let config = test_config();
    let backend = TestBackend {
        groups: Arc::new(MemoryGroupDirectory::new()),
        principals: Arc::new(MemoryPrincipalDirectory::new()),
        documents: Arc::new(MemoryDocumentIndex::new()),
    };
    let collaborators = Collaborators {
        projects: Arc::new(MemoryProjectStore::new()),
        groups: backend.groups.clone(),
        principals: backend.principals.clone(),
        documents: backend.documents.clone(),
        registry: Arc::new(registry),
    };

    let projects = Arc::new(ProjectService::new(collaborators, config.engine_config()));
    projects.ensure_default_project().await.unwrap();

    let state = AppState {
        projects,
        config: Arc::new(config),
    };

    let request_id_header = HeaderName::from_static("x-request-id");
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state);

    (app, backend)
}

pub fn admin_token() -> String {
    generate_access_token("admin-1", "admin", &test_config().jwt).unwrap()
}

pub fn user_token() -> String {
    generate_access_token("user-1", "user", &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: &Router, uri: &str, token: &str) -> Response {
    send(app, "GET", uri, Some(token), None).await
}

pub async fn post_json(app: &Router, uri: &str, token: &str, body: serde_json::Value) -> Response {
    send(app, "POST", uri, Some(token), Some(body)).await
}

pub async fn put_json(app: &Router, uri: &str, token: &str, body: serde_json::Value) -> Response {
    send(app, "PUT", uri, Some(token), Some(body)).await
}

pub async fn patch_json(app: &Router, uri: &str, token: &str, body: serde_json::Value) -> Response {
    send(app, "PATCH", uri, Some(token), Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: &str) -> Response {
    send(app, "DELETE", uri, Some(token), None).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
