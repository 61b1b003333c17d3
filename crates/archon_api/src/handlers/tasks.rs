//! Task endpoints (spec §4.10): create, list, assign, transition, reorder.

use std::sync::Arc;

use archon_db::model::{Priority, Task};
use archon_protocol::{ProjectId, SubjectId, TaskId};
use archon_rbac::Principal;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiResult;
use crate::state::ApiState;

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub workflow_stage_id: uuid::Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assignee: Option<SubjectId>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub feature: Option<String>,
    #[serde(default)]
    pub order: f64,
}

pub async fn create(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
    Json(body): Json<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = state
        .tasks
        .create(
            &principal,
            project_id,
            body.workflow_stage_id,
            body.title,
            body.description,
            body.assignee,
            body.priority.unwrap_or(Priority::Medium),
            body.estimated_hours,
            body.feature,
            body.order,
        )
        .await?;
    Ok(Json(task))
}

pub async fn get(State(state): State<Arc<ApiState>>, Path(task_id): Path<TaskId>) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.get(task_id).await?))
}

pub async fn list(State(state): State<Arc<ApiState>>, Path(project_id): Path<ProjectId>) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.tasks.list(project_id).await?))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub assignee: Option<SubjectId>,
}

pub async fn assign(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<TaskId>,
    Json(body): Json<AssignRequest>,
) -> ApiResult<Json<Task>> {
    let task = state.tasks.get(task_id).await?;
    Ok(Json(state.tasks.assign(&principal, task, body.assignee).await?))
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub new_stage: uuid::Uuid,
}

pub async fn transition(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path((project_id, task_id)): Path<(ProjectId, TaskId)>,
    Json(body): Json<TransitionRequest>,
) -> ApiResult<Json<Value>> {
    state.tasks.transition(&principal, project_id, task_id, body.new_stage).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct ReorderRequest {
    pub stage_id: uuid::Uuid,
    #[serde(default)]
    pub before: Option<f64>,
    #[serde(default)]
    pub after: Option<f64>,
}

pub async fn reorder(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path((project_id, task_id)): Path<(ProjectId, TaskId)>,
    Json(body): Json<ReorderRequest>,
) -> ApiResult<Json<Value>> {
    let order = state
        .tasks
        .reorder(&principal, project_id, body.stage_id, task_id, body.before, body.after)
        .await?;
    Ok(Json(serde_json::json!({ "order": order })))
}
