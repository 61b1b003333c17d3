//! MCP-surface error mapping: every tool failure converges on
//! `archon_protocol::ErrorKind` (spec §7) via this local wrapper.

use archon_protocol::ErrorKind;

use crate::protocol::{ErrorCode, JsonRpcError};

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct McpError {
    pub kind: ErrorKind,
    pub message: String,
}

impl McpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Maps the error kind onto a JSON-RPC server-error code in the
    /// reserved -32000..-32099 band, preserving `kind` in `data` so a
    /// client can branch on the same taxonomy HTTP callers see.
    pub fn into_jsonrpc(self) -> JsonRpcError {
        let code = match self.kind {
            ErrorKind::Validation => ErrorCode::InvalidParams,
            _ => ErrorCode::ServerError(-32000 - jsonrpc_offset(self.kind)),
        };
        JsonRpcError::with_data(code, self.message, serde_json::json!({ "kind": self.kind }))
    }
}

fn jsonrpc_offset(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Validation => 0,
        ErrorKind::Unauthenticated => 1,
        ErrorKind::Forbidden => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Conflict => 4,
        ErrorKind::StorageUnavailable => 5,
        ErrorKind::ProviderUnavailable => 6,
        ErrorKind::ProviderTimeout => 7,
        ErrorKind::RateLimited => 8,
        ErrorKind::Internal => 9,
        ErrorKind::AlreadyGlobal => 10,
        ErrorKind::SessionAlreadyDisconnected => 11,
        ErrorKind::TokenExpired => 12,
        ErrorKind::InvalidToken => 13,
        ErrorKind::SessionIdMismatch => 14,
    }
}

impl From<archon_projects::ProjectsError> for McpError {
    fn from(e: archon_projects::ProjectsError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<archon_retrieval::RetrievalError> for McpError {
    fn from(e: archon_retrieval::RetrievalError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<archon_sessions::SessionError> for McpError {
    fn from(e: archon_sessions::SessionError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<archon_rbac::RbacError> for McpError {
    fn from(e: archon_rbac::RbacError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<serde_json::Error> for McpError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_params(format!("invalid arguments: {e}"))
    }
}
