use archon_protocol::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum RbacError {
    #[error("storage error: {0}")]
    Storage(#[from] archon_db::BackendError),

    #[error("invitation token is invalid")]
    InvalidToken,

    #[error("invitation has expired")]
    InvitationExpired,
}

impl RbacError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RbacError::Storage(e) => e.kind(),
            RbacError::InvalidToken => ErrorKind::Validation,
            RbacError::InvitationExpired => ErrorKind::Conflict,
        }
    }
}
