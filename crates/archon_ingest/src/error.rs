use archon_protocol::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("no pages were successfully fetched")]
    EmptyResult,

    #[error("progress {0} not found")]
    ProgressNotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] archon_db::BackendError),

    #[error("provider error: {0}")]
    Provider(#[from] archon_providers::ProviderError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::EmptyResult => ErrorKind::Conflict,
            IngestError::ProgressNotFound(_) => ErrorKind::NotFound,
            IngestError::Storage(e) => e.kind(),
            IngestError::Provider(e) => e.kind(),
            IngestError::InvalidRequest(_) => ErrorKind::Validation,
        }
    }
}
