use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use roster_core::error::CoreError;
use roster_db::RepoError;
use roster_engine::{EngineError, ExpansionError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Produces `{"error": msg, "code": CODE}` bodies; an in-use refusal also
/// carries `"count"`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A required expansion branch failed.
    #[error(transparent)]
    Expansion(#[from] ExpansionError),

    /// A collaborator failed outside of an expansion.
    #[error(transparent)]
    Repository(#[from] RepoError),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(e) => AppError::Core(e),
            EngineError::Expansion(e) => AppError::Expansion(e),
            EngineError::Repository(e) => AppError::Repository(e),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::InUse { .. } => (StatusCode::CONFLICT, "IN_USE", core.to_string()),
                CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            },

            AppError::Expansion(err) => {
                tracing::warn!(error = %err, cause = %err.root_cause(), "Expansion failed");
                match err.root_cause() {
                    RepoError::Timeout { .. } => (
                        StatusCode::GATEWAY_TIMEOUT,
                        "GATEWAY_TIMEOUT",
                        err.to_string(),
                    ),
                    _ => (StatusCode::BAD_GATEWAY, "EXPANSION_FAILED", err.to_string()),
                }
            }

            AppError::Repository(err) => classify_repo_error(err),
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let AppError::Core(CoreError::InUse { count }) = &self {
            body["count"] = json!(count);
        }

        (status, axum::Json(body)).into_response()
    }
}

/// Map a collaborator failure to a status, error code and message.
fn classify_repo_error(err: &RepoError) -> (StatusCode, &'static str, String) {
    match err {
        RepoError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        RepoError::AlreadyExists { .. } | RepoError::Stale { .. } => {
            (StatusCode::CONFLICT, "CONFLICT", err.to_string())
        }
        RepoError::Transport(_) => {
            tracing::error!(error = %err, "Collaborator unavailable");
            (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", "A backing service is unavailable".to_string())
        }
        RepoError::Timeout { .. } => {
            tracing::error!(error = %err, "Collaborator timed out");
            (StatusCode::GATEWAY_TIMEOUT, "GATEWAY_TIMEOUT", err.to_string())
        }
    }
}
