//! Liveness and metrics endpoints (ambient observability, carried
//! regardless of spec.md's non-goals).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde_json::Value;
use axum::Json;

use crate::state::ApiState;

pub async fn healthz() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Prometheus text exposition format, hand-rolled since the ambient
/// surface here is tiny (session counts); a full `metrics`/`prometheus`
/// crate would be overkill for three gauges.
pub async fn metrics(State(state): State<Arc<ApiState>>) -> (StatusCode, String) {
    let health = match state.sessions.session_health().await {
        Ok(h) => h,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "# failed to collect metrics\n".to_string());
        }
    };
    let body = format!(
        "# HELP archon_mcp_sessions_active Active MCP sessions\n\
         # TYPE archon_mcp_sessions_active gauge\n\
         archon_mcp_sessions_active {}\n\
         # HELP archon_mcp_sessions_disconnected Disconnected MCP sessions\n\
         # TYPE archon_mcp_sessions_disconnected gauge\n\
         archon_mcp_sessions_disconnected {}\n\
         # HELP archon_mcp_sessions_last_24h Sessions connected in the last 24 hours\n\
         # TYPE archon_mcp_sessions_last_24h gauge\n\
         archon_mcp_sessions_last_24h {}\n",
        health.active_count, health.disconnected_count, health.sessions_last_24h,
    );
    (StatusCode::OK, body)
}
