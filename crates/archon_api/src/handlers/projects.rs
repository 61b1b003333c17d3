//! Project tree endpoints (spec §4.10): create/list/reparent/archive,
//! workflow CRUD and reassignment. All enforce RBAC via §4.9 inside
//! `ProjectService`.

use std::collections::HashMap;
use std::sync::Arc;

use archon_db::model::{Project, ProjectType, Workflow};
use archon_protocol::{ProjectId, WorkflowId};
use archon_rbac::Principal;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiResult;
use crate::principal_ext::subject_id;
use crate::state::ApiState;

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_id: Option<ProjectId>,
    pub workflow_id: WorkflowId,
    pub project_type: ProjectType,
}

pub async fn create(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateProjectRequest>,
) -> ApiResult<Json<Project>> {
    let owner = subject_id(&principal);
    let project = state
        .projects
        .create(&principal, owner, body.title, body.description, body.parent_id, body.workflow_id, body.project_type)
        .await?;
    Ok(Json(project))
}

pub async fn get(State(state): State<Arc<ApiState>>, Path(project_id): Path<ProjectId>) -> ApiResult<Json<Project>> {
    Ok(Json(state.projects.get(project_id).await?))
}

#[derive(Deserialize)]
pub struct ListProjectsQuery {
    pub parent_id: Option<ProjectId>,
    #[serde(default)]
    pub include_archived: bool,
}

pub async fn list(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<ListProjectsQuery>,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.projects.list(q.parent_id, q.include_archived).await?))
}

#[derive(Deserialize)]
pub struct ReparentRequest {
    pub new_parent: Option<ProjectId>,
}

pub async fn reparent(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
    Json(body): Json<ReparentRequest>,
) -> ApiResult<Json<Value>> {
    state.projects.reparent(&principal, project_id, body.new_parent).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

pub async fn archive(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<Json<Value>> {
    state.projects.archive(&principal, project_id).await?;
    Ok(Json(serde_json::json!({ "archived": true })))
}

pub async fn unarchive(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<Json<Value>> {
    state.projects.unarchive(&principal, project_id).await?;
    Ok(Json(serde_json::json!({ "archived": false })))
}

pub async fn get_workflow(
    State(state): State<Arc<ApiState>>,
    Path(workflow_id): Path<WorkflowId>,
) -> ApiResult<Json<Workflow>> {
    Ok(Json(state.projects.get_workflow(workflow_id).await?))
}

pub async fn put_workflow(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Json(workflow): Json<Workflow>,
) -> ApiResult<Json<Value>> {
    state.projects.put_workflow(&principal, &workflow).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct ReassignWorkflowRequest {
    pub new_workflow_id: WorkflowId,
    pub stage_mapping: HashMap<uuid::Uuid, uuid::Uuid>,
}

pub async fn reassign_workflow(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
    Json(body): Json<ReassignWorkflowRequest>,
) -> ApiResult<Json<Value>> {
    state.projects.reassign_workflow(&principal, project_id, body.new_workflow_id, body.stage_mapping).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
