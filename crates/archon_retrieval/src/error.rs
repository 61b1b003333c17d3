use archon_protocol::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("storage error: {0}")]
    Storage(#[from] archon_db::BackendError),

    #[error("vector and lexical backends are both unavailable")]
    BothBackendsUnavailable,

    #[error("short query requires the vector backend, which is unavailable")]
    VectorRequiredForShortQuery,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::Storage(e) => e.kind(),
            RetrievalError::BothBackendsUnavailable | RetrievalError::VectorRequiredForShortQuery => {
                ErrorKind::StorageUnavailable
            }
            RetrievalError::InvalidRequest(_) => ErrorKind::Validation,
        }
    }
}
