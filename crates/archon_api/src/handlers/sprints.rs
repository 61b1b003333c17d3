//! Sprint endpoints (spec §4.10): create, list, start, complete, cancel.

use std::sync::Arc;

use archon_db::model::Sprint;
use archon_protocol::{ProjectId, SprintId};
use archon_rbac::Principal;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiResult;
use crate::state::ApiState;

#[derive(Deserialize)]
pub struct CreateSprintRequest {
    pub name: String,
    #[serde(default)]
    pub goal: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
}

pub async fn create(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
    Json(body): Json<CreateSprintRequest>,
) -> ApiResult<Json<Sprint>> {
    let sprint = Sprint {
        id: SprintId::new(),
        project_id,
        name: body.name,
        goal: body.goal,
        start_date: body.start_date,
        end_date: body.end_date,
        status: archon_db::model::SprintStatus::Planned,
        velocity: None,
    };
    Ok(Json(state.sprints.create(&principal, sprint).await?))
}

pub async fn list(State(state): State<Arc<ApiState>>, Path(project_id): Path<ProjectId>) -> ApiResult<Json<Vec<Sprint>>> {
    Ok(Json(state.sprints.list(project_id).await?))
}

pub async fn start(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path((project_id, sprint_id)): Path<(ProjectId, SprintId)>,
) -> ApiResult<Json<Value>> {
    state.sprints.start(&principal, project_id, sprint_id).await?;
    Ok(Json(serde_json::json!({ "status": "active" })))
}

#[derive(Deserialize)]
pub struct CompleteSprintRequest {
    pub done_stage: uuid::Uuid,
}

pub async fn complete(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path((project_id, sprint_id)): Path<(ProjectId, SprintId)>,
    Json(body): Json<CompleteSprintRequest>,
) -> ApiResult<Json<Value>> {
    let velocity = state.sprints.complete(&principal, project_id, sprint_id, body.done_stage).await?;
    Ok(Json(serde_json::json!({ "status": "completed", "velocity": velocity })))
}

pub async fn cancel(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path((project_id, sprint_id)): Path<(ProjectId, SprintId)>,
) -> ApiResult<Json<Value>> {
    state.sprints.cancel(&principal, project_id, sprint_id).await?;
    Ok(Json(serde_json::json!({ "status": "cancelled" })))
}
