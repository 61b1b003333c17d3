use archon_protocol::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("unknown provider {0}")]
    UnknownProvider(String),

    #[error("provider {provider} does not support {capability}")]
    UnsupportedCapability {
        provider: String,
        capability: &'static str,
    },

    #[error("no api key configured for provider {0}")]
    MissingApiKey(String),

    #[error("provider rate limited: {0}")]
    RateLimited(String),

    #[error("provider request timed out after {0} attempts")]
    Timeout(u32),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("batch of {requested} exceeds provider limit {limit}")]
    BatchTooLarge { requested: usize, limit: usize },
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::RateLimited(_) => ErrorKind::RateLimited,
            ProviderError::Timeout(_) => ErrorKind::ProviderTimeout,
            ProviderError::Unavailable(_) => ErrorKind::ProviderUnavailable,
            ProviderError::UnknownProvider(_)
            | ProviderError::UnsupportedCapability { .. }
            | ProviderError::MissingApiKey(_)
            | ProviderError::BatchTooLarge { .. } => ErrorKind::Validation,
        }
    }
}
