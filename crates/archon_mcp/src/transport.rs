//! Streamable-HTTP transport (spec §6): clients POST a JSON-RPC envelope
//! to `/mcp` and get back a single SSE event carrying the response. The
//! session is carried across calls via an `Mcp-Session-Id` response/
//! request header, not a persisted connection.

use std::convert::Infallible;
use std::sync::Arc;

use archon_protocol::SessionId;
use archon_rbac::Principal;
use archon_sessions::ClientInfo;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use futures_util::stream;

use crate::dispatch::McpDispatcher;
use crate::protocol::JsonRpcRequest;

pub const MCP_SESSION_HEADER: &str = "mcp-session-id";
const MCP_CLIENT_NAME_HEADER: &str = "mcp-client-name";
const MCP_CLIENT_VERSION_HEADER: &str = "mcp-client-version";

pub fn router(dispatcher: Arc<McpDispatcher>) -> Router {
    Router::new().route("/mcp", post(mcp_handler)).with_state(dispatcher)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn mcp_handler(
    State(dispatcher): State<Arc<McpDispatcher>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    let accepts_event_stream = header_str(&headers, axum::http::header::ACCEPT.as_str())
        .map(|a| a.contains("text/event-stream"))
        .unwrap_or(false);
    if !accepts_event_stream {
        return (
            StatusCode::NOT_ACCEPTABLE,
            "client must send Accept: application/json, text/event-stream",
        )
            .into_response();
    }

    let session_id: Option<SessionId> = header_str(&headers, MCP_SESSION_HEADER).and_then(|s| s.parse().ok());
    let client_info = ClientInfo {
        declared_name: header_str(&headers, MCP_CLIENT_NAME_HEADER).unwrap_or("unknown-client").to_string(),
        version: header_str(&headers, MCP_CLIENT_VERSION_HEADER).map(str::to_string),
        user_context: None,
    };

    let (response, new_session_id) = dispatcher.handle(request, principal, session_id, client_info).await;

    let mut response_headers = HeaderMap::new();
    if let Some(id) = new_session_id {
        if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
            response_headers.insert(MCP_SESSION_HEADER, value);
        }
    }

    let event = Event::default().json_data(&response).unwrap_or_else(|_| Event::default().data("{}"));
    let body = Sse::new(stream::once(async move { Ok::<_, Infallible>(event) }));
    (response_headers, body).into_response()
}
