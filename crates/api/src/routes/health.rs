use axum::extract::State;
use axum::{routing::get, Json, Router};
use roster_core::project::DEFAULT_PROJECT_ID;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the project store cannot be read.
    pub status: &'static str,
    pub version: &'static str,
    pub registry_enabled: bool,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_healthy = match state.projects.get(DEFAULT_PROJECT_ID).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not read the default project");
            false
        }
    };

    Json(HealthResponse {
        status: if store_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        registry_enabled: state.config.registry_proxy_url.is_some(),
    })
}

/// Mount health check routes (root level, not under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
