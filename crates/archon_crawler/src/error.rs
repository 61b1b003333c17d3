use archon_protocol::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("invalid url {0}")]
    InvalidUrl(String),

    #[error("fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("media type {0} is not in the allow-list")]
    UnsupportedMediaType(String),

    #[error("response was not valid utf-8: {0}")]
    NotUtf8(String),

    #[error("disallowed by robots.txt: {0}")]
    RobotsDisallowed(String),

    #[error("text extraction failed: {0}")]
    ExtractionFailed(String),
}

impl CrawlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrawlError::InvalidUrl(_) => ErrorKind::Validation,
            CrawlError::Fetch { .. } => ErrorKind::ProviderUnavailable,
            CrawlError::Timeout { .. } => ErrorKind::ProviderTimeout,
            CrawlError::UnsupportedMediaType(_) => ErrorKind::Validation,
            CrawlError::NotUtf8(_) => ErrorKind::Validation,
            CrawlError::RobotsDisallowed(_) => ErrorKind::Forbidden,
            CrawlError::ExtractionFailed(_) => ErrorKind::Validation,
        }
    }
}
