//! Knowledge & ingestion endpoints (spec §6): crawl, upload, progress,
//! cancel, and search.

use std::sync::Arc;

use archon_db::model::KnowledgeType;
use archon_ingest::{CrawlRequest, ProgressId, UploadRequest};
use archon_db::search::SearchFilters;
use archon_protocol::ProjectId;
use archon_rbac::Principal;
use axum::extract::{Multipart, Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::error::{ApiError, ApiResult};
use crate::principal_ext::subject_id;
use crate::state::ApiState;

#[derive(Serialize)]
pub struct ProgressIdResponse {
    pub progress_id: ProgressId,
}

pub async fn crawl(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CrawlRequest>,
) -> ApiResult<Json<ProgressIdResponse>> {
    let subject = subject_id(&principal);
    let progress_id = state.orchestrator.start_crawl(request, subject)?;
    Ok(Json(ProgressIdResponse { progress_id }))
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub progress_id: ProgressId,
    pub filename: String,
}

/// Multipart fields: `file`, plus the `UploadRequest` fields as separate
/// text parts (`display_name`, `knowledge_type`, `tags` as a
/// comma-separated list, `extract_code_examples`, `project_id`,
/// `is_project_private`, `send_to_kb`).
pub async fn upload(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut request = UploadRequest::default();
    let mut filename = String::new();
    let mut file_bytes = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::validation(e.to_string()))? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().unwrap_or("upload").to_string();
                file_bytes = field.bytes().await.map_err(|e| ApiError::validation(e.to_string()))?.to_vec();
            }
            "display_name" => request.display_name = text(field).await?,
            "knowledge_type" => {
                request.knowledge_type = match text(field).await?.as_str() {
                    "business" => KnowledgeType::Business,
                    _ => KnowledgeType::Technical,
                }
            }
            "tags" => request.tags = text(field).await?.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect(),
            "extract_code_examples" => request.extract_code_examples = text(field).await?.parse().unwrap_or(false),
            "project_id" => request.project_id = text(field).await?.parse().ok(),
            "is_project_private" => request.is_project_private = text(field).await?.parse().unwrap_or(false),
            "send_to_kb" => request.send_to_kb = text(field).await?.parse().unwrap_or(true),
            _ => {}
        }
    }

    if request.display_name.is_empty() {
        request.display_name = filename.clone();
    }

    let subject = subject_id(&principal);
    let progress_id = state.orchestrator.start_upload(request, file_bytes, subject)?;
    Ok(Json(UploadResponse { progress_id, filename }))
}

async fn text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field.text().await.map_err(|e| ApiError::validation(e.to_string()))
}

/// Project-scoped crawl (`POST /api/projects/{project_id}/documents/crawl`):
/// delegates to `DocumentService::crawl`, which enforces `document:manage`.
pub async fn project_crawl(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
    Json(mut request): Json<CrawlRequest>,
) -> ApiResult<Json<ProgressIdResponse>> {
    request.project_id = Some(project_id);
    let subject = subject_id(&principal);
    let progress_id = state.documents.crawl(&principal, request, subject).await?;
    Ok(Json(ProgressIdResponse { progress_id }))
}

pub async fn project_upload(
    State(state): State<Arc<ApiState>>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<ProjectId>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut request = UploadRequest { project_id: Some(project_id), ..UploadRequest::default() };
    let mut filename = String::new();
    let mut file_bytes = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::validation(e.to_string()))? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().unwrap_or("upload").to_string();
                file_bytes = field.bytes().await.map_err(|e| ApiError::validation(e.to_string()))?.to_vec();
            }
            "display_name" => request.display_name = text(field).await?,
            "is_project_private" => request.is_project_private = text(field).await?.parse().unwrap_or(false),
            "send_to_kb" => request.send_to_kb = text(field).await?.parse().unwrap_or(true),
            "extract_code_examples" => request.extract_code_examples = text(field).await?.parse().unwrap_or(false),
            _ => {}
        }
    }
    if request.display_name.is_empty() {
        request.display_name = filename.clone();
    }

    let subject = subject_id(&principal);
    let progress_id = state.documents.upload(&principal, request, file_bytes, subject).await?;
    Ok(Json(UploadResponse { progress_id, filename }))
}

pub async fn get_progress(
    State(state): State<Arc<ApiState>>,
    Path(progress_id): Path<ProgressId>,
) -> ApiResult<Json<archon_ingest::ProgressSnapshot>> {
    Ok(Json(state.orchestrator.get_progress(progress_id)?))
}

pub async fn cancel_progress(State(state): State<Arc<ApiState>>, Path(progress_id): Path<ProgressId>) -> ApiResult<Json<Value>> {
    state.orchestrator.cancel(progress_id)?;
    Ok(Json(serde_json::json!({ "cancelled": true })))
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub match_count: Option<usize>,
    #[serde(default)]
    pub filters: Option<SearchFiltersDto>,
}

#[derive(Deserialize, Default)]
pub struct SearchFiltersDto {
    pub source_id: Option<archon_protocol::SourceId>,
    pub project_id: Option<ProjectId>,
    pub knowledge_type: Option<KnowledgeType>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

pub async fn search(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<archon_retrieval::SearchEnvelope>> {
    let dto = request.filters.unwrap_or_default();
    let filters = SearchFilters {
        source_id: dto.source_id,
        project_id: dto.project_id,
        knowledge_type: dto.knowledge_type,
        tags: dto.tags,
    };
    let k = request.match_count.unwrap_or(10);
    Ok(Json(state.retrieval.search(&request.query, filters, k).await?))
}
