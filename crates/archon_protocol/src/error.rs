//! The error-kind taxonomy every component maps its failures onto.

use serde::{Deserialize, Serialize};

/// Stable, HTTP/MCP-visible error classification.
///
/// Every crate-local error type exposes a `fn kind(&self) -> ErrorKind` so
/// `archon_api` and `archon_mcp` can match on this enum instead of on
/// crate-specific error variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    StorageUnavailable,
    ProviderUnavailable,
    ProviderTimeout,
    RateLimited,
    Internal,
    AlreadyGlobal,
    SessionAlreadyDisconnected,
    TokenExpired,
    InvalidToken,
    SessionIdMismatch,
}

impl ErrorKind {
    /// The HTTP status this error kind maps to.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::InvalidToken => 401,
            ErrorKind::TokenExpired => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::AlreadyGlobal => 409,
            ErrorKind::SessionAlreadyDisconnected => 409,
            ErrorKind::SessionIdMismatch => 409,
            ErrorKind::RateLimited => 429,
            ErrorKind::StorageUnavailable => 503,
            ErrorKind::ProviderUnavailable => 503,
            ErrorKind::ProviderTimeout => 503,
            ErrorKind::Internal => 500,
        }
    }
}

/// A boundary error carrying a kind plus a human-readable message.
///
/// This is the shape returned by `archon_api` and `archon_mcp` error
/// responses; crate-local errors convert into it via `From`.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ProtocolError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ProtocolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
