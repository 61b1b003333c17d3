//! MCP session administration endpoints (spec §6, §4.8).

use std::sync::Arc;

use archon_db::model::{RequestStatus, Session, SessionHealth};
use archon_protocol::SessionId;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::ApiState;

/// Currently-active sessions only (`GET /api/mcp/clients`); `GET
/// /api/mcp/sessions` below returns the full roster including
/// disconnected ones.
pub async fn list_clients(State(state): State<Arc<ApiState>>) -> ApiResult<Json<Vec<Session>>> {
    let sessions = state.sessions.list_sessions().await?;
    Ok(Json(sessions.into_iter().filter(|s| s.status == archon_db::model::SessionStatus::Active).collect()))
}

pub async fn list_sessions(State(state): State<Arc<ApiState>>) -> ApiResult<Json<Vec<Session>>> {
    Ok(Json(state.sessions.list_sessions().await?))
}

#[derive(Serialize)]
pub struct SessionDetail {
    pub session: Session,
    pub requests: Vec<archon_db::model::Request>,
}

pub async fn get_session(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<SessionId>,
) -> ApiResult<Json<SessionDetail>> {
    let (session, requests) = state.sessions.session_detail(session_id).await?;
    Ok(Json(SessionDetail { session, requests }))
}

#[derive(Deserialize)]
pub struct ErrorsQuery {
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

const DEFAULT_ERROR_LIMIT: i64 = 50;

pub async fn list_errors(
    State(state): State<Arc<ApiState>>,
    Query(q): Query<ErrorsQuery>,
) -> ApiResult<Json<Vec<archon_db::model::Request>>> {
    let severity = match q.severity.as_deref() {
        Some("error") => Some(RequestStatus::Error),
        Some("timeout") => Some(RequestStatus::Timeout),
        _ => None,
    };
    let limit = q.limit.unwrap_or(DEFAULT_ERROR_LIMIT);
    Ok(Json(state.sessions.list_errors(severity, q.session_id, limit).await?))
}

pub async fn sessions_health(State(state): State<Arc<ApiState>>) -> ApiResult<Json<SessionHealth>> {
    Ok(Json(state.sessions.session_health().await?))
}

#[derive(Deserialize)]
pub struct ReconnectRequest {
    pub token: String,
}

pub async fn reconnect(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<SessionId>,
    Json(body): Json<ReconnectRequest>,
) -> ApiResult<Json<Session>> {
    Ok(Json(state.sessions.reconnect(session_id, &body.token).await?))
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

pub async fn issue_token(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<SessionId>,
) -> ApiResult<Json<TokenResponse>> {
    let token = state.sessions.issue_reconnect_token(session_id).await?;
    Ok(Json(TokenResponse { token }))
}
