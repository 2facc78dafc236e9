//! Handlers for the `/projects` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use roster_core::project::{ProjectRecord, ProjectUpdate};
use roster_engine::{ProjectRead, UpdateOutcome};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Comma-separated group links; restricts the listing to projects
    /// that grant a role to any of them.
    pub group_links: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReadParams {
    #[serde(default)]
    pub expand: bool,
}

/// GET /api/v1/projects
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<ProjectRecord>>>> {
    let projects = match params.group_links {
        Some(raw) => {
            let links: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            state.projects.projects_for_groups(&links).await?
        }
        None => state.projects.list().await?,
    };
    Ok(Json(DataResponse { data: projects }))
}

/// POST /api/v1/projects
pub async fn create(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(input): Json<ProjectRecord>,
) -> AppResult<(StatusCode, Json<DataResponse<ProjectRecord>>)> {
    let project = state.projects.create(&caller, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects/{id}?expand=true
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Query(params): Query<ReadParams>,
) -> AppResult<Json<DataResponse<ProjectRead>>> {
    let project = state.projects.read(&id, params.expand).await?;
    Ok(Json(DataResponse { data: project }))
}

/// PUT /api/v1/projects/{id}
pub async fn replace(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<ProjectRecord>,
) -> AppResult<Response> {
    let outcome = state.projects.replace(&caller, &id, input).await?;
    Ok(outcome_response(outcome))
}

/// PATCH /api/v1/projects/{id}
///
/// A body naming `administrators`, `members` or `viewers` is a roles update;
/// anything else is a field patch.
pub async fn update(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<Response> {
    let update = ProjectUpdate::from_value(body)?;
    let outcome = state.projects.update(&caller, &id, update).await?;
    Ok(outcome_response(outcome))
}

/// DELETE /api/v1/projects/{id}
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.projects.delete(&caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn outcome_response(outcome: UpdateOutcome) -> Response {
    match outcome {
        UpdateOutcome::Updated(project) => Json(DataResponse { data: project }).into_response(),
        UpdateOutcome::NotModified(_) => StatusCode::NOT_MODIFIED.into_response(),
    }
}
