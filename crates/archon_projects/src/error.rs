use archon_protocol::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum ProjectsError {
    #[error("forbidden")]
    Forbidden,

    #[error("storage error: {0}")]
    Storage(#[from] archon_db::BackendError),

    #[error("rbac error: {0}")]
    Rbac(#[from] archon_rbac::RbacError),

    #[error("ingestion error: {0}")]
    Ingest(#[from] archon_ingest::IngestError),

    #[error("source {0} is already global")]
    AlreadyGlobal(archon_protocol::SourceId),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProjectsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProjectsError::Forbidden => ErrorKind::Forbidden,
            ProjectsError::Storage(e) => e.kind(),
            ProjectsError::Rbac(e) => e.kind(),
            ProjectsError::Ingest(e) => e.kind(),
            ProjectsError::AlreadyGlobal(_) => ErrorKind::AlreadyGlobal,
            ProjectsError::InvalidRequest(_) => ErrorKind::Validation,
        }
    }
}
