//! Knowledge-link endpoints (spec §3/§4.11): associate a project, task, or
//! sprint with a page, code example, or source.

use std::sync::Arc;

use archon_db::model::{KnowledgeEntity, KnowledgeItem, KnowledgeLink};
use archon_protocol::{ProjectId, SprintId, TaskId};
use archon_rbac::Principal;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

#[derive(Deserialize)]
pub struct CreateKnowledgeLinkRequest {
    pub entity: KnowledgeEntity,
    pub item: KnowledgeItem,
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

pub async fn create(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateKnowledgeLinkRequest>,
) -> ApiResult<Json<KnowledgeLink>> {
    Ok(Json(state.knowledge_links.link(&principal, body.entity, body.item, body.relevance_score).await?))
}

#[derive(Deserialize)]
pub struct EntityQuery {
    pub entity_type: String,
    pub entity_id: uuid::Uuid,
}

fn parse_entity(query: EntityQuery) -> ApiResult<KnowledgeEntity> {
    match query.entity_type.as_str() {
        "project" => Ok(KnowledgeEntity::Project(ProjectId::from(query.entity_id))),
        "task" => Ok(KnowledgeEntity::Task(TaskId::from(query.entity_id))),
        "sprint" => Ok(KnowledgeEntity::Sprint(SprintId::from(query.entity_id))),
        other => Err(ApiError::new(
            archon_protocol::ErrorKind::Validation,
            format!("unknown entity_type {other}"),
        )),
    }
}

pub async fn list_for_entity(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<EntityQuery>,
) -> ApiResult<Json<Vec<KnowledgeLink>>> {
    let entity = parse_entity(query)?;
    Ok(Json(state.knowledge_links.list_for_entity(&principal, entity).await?))
}

pub async fn delete(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(link_id): Path<uuid::Uuid>,
) -> ApiResult<Json<Value>> {
    state.knowledge_links.unlink(&principal, link_id).await?;
    Ok(Json(serde_json::json!({ "unlinked": true })))
}
