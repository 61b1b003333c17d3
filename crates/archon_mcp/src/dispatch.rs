//! Wraps every `tools/call` through the session manager (spec §4.8):
//! lazy session creation, timing, and request tracking, the same shape as
//! the teacher's `handle_tools_call` but async and audited as a `Request`
//! row instead of an append-only log file.

use std::sync::Arc;
use std::time::Instant;

use archon_db::model::RequestStatus;
use archon_protocol::SessionId;
use archon_rbac::Principal;
use archon_sessions::{ClientInfo, RequestOutcome};

use crate::error::McpError;
use crate::protocol::{
    methods, ContentBlock, ErrorCode, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ServerCapabilities, ServerInfo, ToolCallParams, ToolCallResult, ToolsCapability, ToolsListResult,
    JSONRPC_VERSION, MCP_PROTOCOL_VERSION,
};
use crate::tools::{AppServices, ToolContext, ToolRegistry};

pub struct McpDispatcher {
    tools: ToolRegistry,
    services: Arc<AppServices>,
    server_name: String,
    server_version: String,
}

impl McpDispatcher {
    pub fn new(services: Arc<AppServices>, server_name: impl Into<String>) -> Self {
        Self {
            tools: ToolRegistry::new(),
            services,
            server_name: server_name.into(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// `session_id` is the caller's current `Mcp-Session-Id` header, if
    /// any. Returns the response plus the session id the caller should
    /// use from now on (only `tools/call` touches the session manager;
    /// other methods echo the id they were given).
    pub async fn handle(
        &self,
        request: JsonRpcRequest,
        principal: Principal,
        session_id: Option<SessionId>,
        client_info: ClientInfo,
    ) -> (JsonRpcResponse, Option<SessionId>) {
        if request.jsonrpc != JSONRPC_VERSION {
            let id = request.id.clone();
            return (
                JsonRpcResponse::error(
                    id,
                    JsonRpcError::new(ErrorCode::InvalidRequest, format!("invalid jsonrpc version: {}", request.jsonrpc)),
                ),
                session_id,
            );
        }

        match request.method.as_str() {
            methods::INITIALIZE => (self.handle_initialize(request), session_id),
            methods::INITIALIZED | methods::PING => {
                (JsonRpcResponse::success(request.id, serde_json::Value::Null), session_id)
            }
            methods::TOOLS_LIST => (self.handle_tools_list(request), session_id),
            methods::TOOLS_CALL => self.handle_tools_call(request, principal, session_id, client_info).await,
            other => {
                let message = format!("unknown method: {other}");
                (JsonRpcResponse::error(request.id, JsonRpcError::new(ErrorCode::MethodNotFound, message)), session_id)
            }
        }
    }

    fn handle_initialize(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities { tools: Some(ToolsCapability { list_changed: false }) },
            server_info: ServerInfo { name: self.server_name.clone(), version: self.server_version.clone() },
        };
        JsonRpcResponse::success(request.id, serde_json::to_value(result).expect("InitializeResult always serializes"))
    }

    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let result = ToolsListResult { tools: self.tools.list_tools() };
        JsonRpcResponse::success(request.id, serde_json::to_value(result).expect("ToolsListResult always serializes"))
    }

    async fn handle_tools_call(
        &self,
        request: JsonRpcRequest,
        principal: Principal,
        session_id: Option<SessionId>,
        client_info: ClientInfo,
    ) -> (JsonRpcResponse, Option<SessionId>) {
        let params: ToolCallParams = match request.params.clone().map(serde_json::from_value).transpose() {
            Ok(Some(p)) => p,
            Ok(None) => {
                let err = JsonRpcError::new(ErrorCode::InvalidParams, "missing tool call params");
                return (JsonRpcResponse::error(request.id, err), session_id);
            }
            Err(e) => {
                let err = JsonRpcError::new(ErrorCode::InvalidParams, format!("invalid tool call params: {e}"));
                return (JsonRpcResponse::error(request.id, err), session_id);
            }
        };

        let session = match self.services.sessions.ensure_session(session_id, &client_info).await {
            Ok(s) => s,
            Err(e) => {
                let mcp_err: McpError = e.into();
                return (JsonRpcResponse::error(request.id, mcp_err.into_jsonrpc()), session_id);
            }
        };

        let ctx = ToolContext { services: self.services.clone(), principal };
        let started = Instant::now();
        let outcome = self.tools.call_tool(&params.name, &ctx, params.arguments).await;
        let duration_ms = started.elapsed().as_millis() as i64;

        let (status, error_message, response, usage) = match outcome {
            Ok(tool_outcome) => {
                let content = ContentBlock::text(tool_outcome.value.to_string());
                let tool_result = ToolCallResult { content: vec![content], is_error: false };
                let value = serde_json::to_value(tool_result).expect("ToolCallResult always serializes");
                (RequestStatus::Success, None, JsonRpcResponse::success(request.id, value), tool_outcome.usage)
            }
            Err(e) => {
                let message = e.to_string();
                let tool_result = ToolCallResult { content: vec![ContentBlock::text(message.clone())], is_error: true };
                let value = serde_json::to_value(tool_result).expect("ToolCallResult always serializes");
                (RequestStatus::Error, Some(message), JsonRpcResponse::success(request.id, value), Default::default())
            }
        };

        self.services
            .sessions
            .track_request(
                session.id,
                RequestOutcome {
                    method: methods::TOOLS_CALL.to_string(),
                    tool_name: Some(params.name),
                    status,
                    duration_ms,
                    prompt_tokens: usage.prompt_tokens,
                    completion_tokens: usage.completion_tokens,
                    model: usage.model,
                    error_message,
                },
            )
            .await;

        (response, Some(session.id))
    }
}
