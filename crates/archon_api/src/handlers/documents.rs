//! Project-scoped document/source catalog endpoints (spec §4.11).

use std::sync::Arc;

use archon_db::model::Source;
use archon_protocol::{ProjectId, SourceId};
use archon_rbac::Principal;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiResult;
use crate::principal_ext::subject_id;
use crate::state::ApiState;

#[derive(Deserialize)]
pub struct ListDocumentsQuery {
    #[serde(default)]
    pub include_private: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
    Query(q): Query<ListDocumentsQuery>,
) -> ApiResult<Json<Vec<Source>>> {
    Ok(Json(state.documents.list(&principal, project_id, q.include_private, q.limit, q.offset).await?))
}

pub async fn promote(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path((_project_id, source_id)): Path<(ProjectId, SourceId)>,
) -> ApiResult<Json<Source>> {
    let promoted_by = subject_id(&principal);
    Ok(Json(state.documents.promote(&principal, source_id, promoted_by).await?))
}

pub async fn delete(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path((project_id, source_id)): Path<(ProjectId, SourceId)>,
) -> ApiResult<Json<Value>> {
    state.documents.delete(&principal, project_id, source_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
