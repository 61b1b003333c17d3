//! The `{kind, message, details?}` envelope every HTTP error response
//! carries (spec §7), plus `From` conversions from every service crate's
//! error type.

use archon_protocol::{ErrorKind, ProtocolError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }
}

impl From<ProtocolError> for ApiError {
    fn from(e: ProtocolError) -> Self {
        Self::new(e.kind, e.message)
    }
}

impl From<archon_db::BackendError> for ApiError {
    fn from(e: archon_db::BackendError) -> Self {
        let kind = e.kind();
        Self::new(kind, e.to_string())
    }
}

impl From<archon_rbac::RbacError> for ApiError {
    fn from(e: archon_rbac::RbacError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<archon_projects::ProjectsError> for ApiError {
    fn from(e: archon_projects::ProjectsError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<archon_ingest::IngestError> for ApiError {
    fn from(e: archon_ingest::IngestError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<archon_retrieval::RetrievalError> for ApiError {
    fn from(e: archon_retrieval::RetrievalError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<archon_sessions::SessionError> for ApiError {
    fn from(e: archon_sessions::SessionError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
