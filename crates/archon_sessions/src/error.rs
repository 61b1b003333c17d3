use archon_protocol::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(archon_protocol::SessionId),

    #[error("session is already disconnected")]
    AlreadyDisconnected,

    #[error("reconnection token expired")]
    TokenExpired,

    #[error("reconnection token is invalid")]
    InvalidToken,

    #[error("reconnection token does not belong to this session")]
    SessionIdMismatch,

    #[error("storage error: {0}")]
    Storage(#[from] archon_db::BackendError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NotFound(_) => ErrorKind::NotFound,
            SessionError::AlreadyDisconnected => ErrorKind::SessionAlreadyDisconnected,
            SessionError::TokenExpired => ErrorKind::TokenExpired,
            SessionError::InvalidToken => ErrorKind::InvalidToken,
            SessionError::SessionIdMismatch => ErrorKind::SessionIdMismatch,
            SessionError::Storage(e) => e.kind(),
        }
    }

    /// The stable failure-reason string spec §4.8 requires reconnection
    /// failures to be distinguished by.
    pub fn reason(&self) -> &'static str {
        match self {
            SessionError::NotFound(_) => "session_not_found",
            SessionError::AlreadyDisconnected => "session_already_disconnected",
            SessionError::TokenExpired => "token_expired",
            SessionError::InvalidToken => "invalid_token",
            SessionError::SessionIdMismatch => "session_id_mismatch",
            SessionError::Storage(_) => "storage_unavailable",
        }
    }
}
