//! The session manager (C8): lazy creation, request tracking, and the
//! reconnect flow, composed over `archon_db::sessions`.

use archon_db::model::{
    Request, RequestStatus, Session, SessionHealth, SessionStatus, UserContext, UserStats,
};
use archon_db::sessions::{
    get_session, list_error_requests, list_requests_for_session, list_sessions as db_list_sessions,
    mark_disconnected, put_session, record_request, session_health as db_session_health,
    user_stats as db_user_stats,
};
use archon_db::{BackendError, DbPool};
use archon_protocol::{RequestId, SessionId, SubjectId, Timestamp};

use crate::client_type::derive_client_type;
use crate::cost::CostTable;
use crate::error::SessionError;
use crate::reaper;
use crate::reconnect::{hash_token, ReconnectIssuer};

/// The client-declared identity an MCP `initialize` call carries, before
/// it's matched against the known-client table.
pub struct ClientInfo {
    pub declared_name: String,
    pub version: Option<String>,
    pub user_context: Option<UserContext>,
}

/// The outcome of one tracked tool invocation, as observed by the caller
/// (the MCP dispatcher). `model` is the model used for this call, if any,
/// for cost estimation.
pub struct RequestOutcome {
    pub method: String,
    pub tool_name: Option<String>,
    pub status: RequestStatus,
    pub duration_ms: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub model: Option<String>,
    pub error_message: Option<String>,
}

pub struct SessionManager {
    pool: DbPool,
    cost_table: CostTable,
    reconnect: ReconnectIssuer,
}

impl SessionManager {
    pub fn new(pool: DbPool, reconnect: ReconnectIssuer, cost_table: CostTable) -> Self {
        Self { pool, cost_table, reconnect }
    }

    /// Spawns the 30s idle reaper; the caller owns the returned handle and
    /// should abort it on shutdown.
    pub fn spawn_reaper(&self, idle_threshold_secs: i64) -> tokio::task::JoinHandle<()> {
        reaper::spawn(self.pool.clone(), idle_threshold_secs)
    }

    /// Attaches to `existing` if it still resolves, otherwise assigns a
    /// fresh session id and persists it (spec §4.8's lazy creation: no
    /// session exists before the first tool call arrives).
    pub async fn ensure_session(
        &self,
        existing: Option<SessionId>,
        client_info: &ClientInfo,
    ) -> Result<Session, SessionError> {
        if let Some(id) = existing {
            match get_session(&self.pool, id).await {
                Ok(session) => return Ok(session),
                Err(BackendError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let now = Timestamp::now();
        let session = Session {
            id: SessionId::new(),
            client_type: derive_client_type(&client_info.declared_name),
            client_version: client_info.version.clone(),
            connected_at: now,
            last_activity_at: now,
            status: SessionStatus::Active,
            disconnect_reason: None,
            disconnected_at: None,
            reconnect_token_hash: None,
            reconnect_expires_at: None,
            reconnect_count: 0,
            user_context: client_info.user_context.clone(),
        };
        put_session(&self.pool, &session).await?;
        Ok(session)
    }

    /// Records a completed tool invocation. Per spec §4.8's propagation
    /// policy, tracking failures never fail the underlying tool call: this
    /// returns nothing and only logs on error.
    pub async fn track_request(&self, session_id: SessionId, outcome: RequestOutcome) {
        let total_tokens = outcome.prompt_tokens + outcome.completion_tokens;
        let estimated_cost = outcome
            .model
            .as_deref()
            .map(|m| self.cost_table.estimate(m, outcome.prompt_tokens, outcome.completion_tokens))
            .unwrap_or(0.0);

        let request = Request {
            id: RequestId::new(),
            session_id,
            method: outcome.method,
            tool_name: outcome.tool_name,
            status: outcome.status,
            duration_ms: outcome.duration_ms,
            prompt_tokens: outcome.prompt_tokens,
            completion_tokens: outcome.completion_tokens,
            total_tokens,
            estimated_cost,
            error_message: outcome.error_message,
            created_at: Timestamp::now(),
        };

        if let Err(e) = record_request(&self.pool, &request).await {
            tracing::warn!(%session_id, error = %e, "failed to record request");
            return;
        }

        if let Err(e) = self.touch_activity(session_id).await {
            tracing::warn!(%session_id, error = %e, "failed to update session activity");
        }
    }

    async fn touch_activity(&self, session_id: SessionId) -> Result<(), SessionError> {
        let mut session = get_session(&self.pool, session_id).await?;
        session.last_activity_at = Timestamp::now();
        put_session(&self.pool, &session).await?;
        Ok(())
    }

    /// Explicit close: marks the session disconnected with a caller-chosen
    /// reason (as opposed to the reaper's `idle_timeout`).
    pub async fn close(&self, session_id: SessionId, reason: &str) -> Result<(), SessionError> {
        mark_disconnected(&self.pool, session_id, reason).await?;
        Ok(())
    }

    /// Issues a fresh reconnection token for `session_id` (spec §4.8,
    /// `GET /api/mcp/sessions/{id}/token`). Multiple reconnects may share
    /// one active token until it expires; issuing a new one supersedes it.
    pub async fn issue_reconnect_token(&self, session_id: SessionId) -> Result<String, SessionError> {
        let mut session = get_session(&self.pool, session_id).await?;
        let issued = self.reconnect.issue(session_id)?;
        session.reconnect_token_hash = Some(issued.token_hash);
        session.reconnect_expires_at = Some(issued.expires_at);
        put_session(&self.pool, &session).await?;
        Ok(issued.token)
    }

    /// Validates `token` and, on success, reactivates the session: clears
    /// its disconnected state, bumps `last_activity_at`, and increments
    /// `reconnect_count`. Distinguishes the five failure reasons spec
    /// §4.8 names.
    pub async fn reconnect(&self, session_id: SessionId, token: &str) -> Result<Session, SessionError> {
        let mut session = match get_session(&self.pool, session_id).await {
            Ok(s) => s,
            Err(BackendError::NotFound(_)) => return Err(SessionError::NotFound(session_id)),
            Err(e) => return Err(e.into()),
        };

        if session.status == SessionStatus::Disconnected {
            if let Some(reason) = &session.disconnect_reason {
                if reason == "revoked" || reason == "replaced" {
                    return Err(SessionError::AlreadyDisconnected);
                }
            }
        }

        self.reconnect.decode(token, session_id)?;

        let stored_hash = session.reconnect_token_hash.as_deref();
        if stored_hash != Some(hash_token(token).as_str()) {
            return Err(SessionError::InvalidToken);
        }

        session.status = SessionStatus::Active;
        session.disconnect_reason = None;
        session.disconnected_at = None;
        session.last_activity_at = Timestamp::now();
        session.reconnect_count += 1;
        put_session(&self.pool, &session).await?;
        Ok(session)
    }

    pub async fn user_stats(&self, subject_id: SubjectId) -> Result<UserStats, SessionError> {
        Ok(db_user_stats(&self.pool, subject_id).await?)
    }

    pub async fn session_health(&self) -> Result<SessionHealth, SessionError> {
        Ok(db_session_health(&self.pool).await?)
    }

    /// All known sessions (`GET /api/mcp/clients`, `GET /api/mcp/sessions`).
    pub async fn list_sessions(&self) -> Result<Vec<Session>, SessionError> {
        Ok(db_list_sessions(&self.pool).await?)
    }

    /// A session plus its full request history (`GET /api/mcp/sessions/{id}`).
    pub async fn session_detail(&self, session_id: SessionId) -> Result<(Session, Vec<Request>), SessionError> {
        let session = get_session(&self.pool, session_id).await?;
        let requests = list_requests_for_session(&self.pool, session_id).await?;
        Ok((session, requests))
    }

    /// Recent failures across sessions, optionally narrowed to one
    /// severity or session (`GET /api/mcp/errors`).
    pub async fn list_errors(
        &self,
        severity: Option<RequestStatus>,
        session_id: Option<SessionId>,
        limit: i64,
    ) -> Result<Vec<Request>, SessionError> {
        Ok(list_error_requests(&self.pool, severity, session_id, limit).await?)
    }
}
