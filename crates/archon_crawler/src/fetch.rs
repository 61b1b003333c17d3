//! Fetching with per-host concurrency caps, a politeness delay, and a
//! per-request timeout (spec §4.5, §5).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use crate::error::CrawlError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POLITENESS: Duration = Duration::from_millis(500);
const DEFAULT_PER_HOST_CONCURRENCY: usize = 2;

/// Media types the pipeline accepts from an HTML-adjacent fetch, per
/// spec §4.5's allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Html,
    Pdf,
    Doc,
    Docx,
    Txt,
    Md,
}

impl MediaType {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let base = content_type.split(';').next().unwrap_or("").trim();
        match base {
            "text/html" | "application/xhtml+xml" => Some(Self::Html),
            "application/pdf" => Some(Self::Pdf),
            "application/msword" => Some(Self::Doc),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "text/plain" => Some(Self::Txt),
            "text/markdown" => Some(Self::Md),
            _ => None,
        }
    }
}

pub struct FetchedPage {
    pub url: String,
    pub media_type: MediaType,
    pub body: Vec<u8>,
}

pub struct Fetcher {
    http: reqwest::Client,
    per_host: Mutex<HashMap<String, Arc<Semaphore>>>,
    last_request: Mutex<HashMap<String, Instant>>,
    per_host_concurrency: usize,
    politeness: Duration,
    timeout: Duration,
}

impl Fetcher {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent("ArchonBot/1.0")
            .build()
            .expect("reqwest client config is static and valid");
        Self {
            http,
            per_host: Mutex::new(HashMap::new()),
            last_request: Mutex::new(HashMap::new()),
            per_host_concurrency: DEFAULT_PER_HOST_CONCURRENCY,
            politeness: DEFAULT_POLITENESS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn http_client(&self) -> reqwest::Client {
        self.http.clone()
    }

    fn semaphore_for(&self, host: &str) -> Arc<Semaphore> {
        self.per_host
            .lock()
            .unwrap()
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_concurrency)))
            .clone()
    }

    async fn respect_politeness(&self, host: &str) {
        let wait = {
            let mut last = self.last_request.lock().unwrap();
            let now = Instant::now();
            let wait = last
                .get(host)
                .and_then(|prev| self.politeness.checked_sub(now.duration_since(*prev)));
            last.insert(host.to_string(), now);
            wait
        };
        if let Some(wait) = wait {
            tokio::time::sleep(wait).await;
        }
    }

    /// Fetches `url`, enforcing per-host concurrency and politeness,
    /// UTF-8 validity, and the media-type allow-list. Returns `Ok(None)`
    /// for a successfully-fetched-but-rejected media type so the caller
    /// can log and skip without treating it as a hard error.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        let parsed = url::Url::parse(url).map_err(|_| CrawlError::InvalidUrl(url.to_string()))?;
        let host = parsed.host_str().unwrap_or_default().to_string();

        let permit = self
            .semaphore_for(&host)
            .acquire_owned()
            .await
            .expect("semaphore is never closed");
        self.respect_politeness(&host).await;

        let response = tokio::time::timeout(self.timeout, self.http.get(url).send())
            .await
            .map_err(|_| CrawlError::Timeout {
                url: url.to_string(),
            })?
            .map_err(|source| CrawlError::Fetch {
                url: url.to_string(),
                source,
            })?;
        drop(permit);

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();
        let media_type = MediaType::from_content_type(&content_type)
            .ok_or_else(|| CrawlError::UnsupportedMediaType(content_type.clone()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|source| CrawlError::Fetch {
                url: url.to_string(),
                source,
            })?;

        if matches!(media_type, MediaType::Html | MediaType::Txt | MediaType::Md) {
            std::str::from_utf8(&bytes)
                .map_err(|_| CrawlError::NotUtf8(url.to_string()))?;
        }

        Ok(FetchedPage {
            url: url.to_string(),
            media_type,
            body: bytes.to_vec(),
        })
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_recognizes_allow_listed_types() {
        assert_eq!(MediaType::from_content_type("text/html; charset=utf-8"), Some(MediaType::Html));
        assert_eq!(MediaType::from_content_type("application/pdf"), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_content_type("application/octet-stream"), None);
    }
}
