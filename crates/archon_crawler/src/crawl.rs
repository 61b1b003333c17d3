//! Strategy selection and the recursive same-origin crawl (spec §4.5).

use std::collections::HashSet;
use std::sync::Arc;

use tokio_stream::wrappers::ReceiverStream;

use crate::error::CrawlError;
use crate::fetch::{Fetcher, MediaType};
use crate::html::to_markdown;
use crate::robots::RobotsCache;
use crate::sitemap;

pub const HARD_DEPTH_CEILING: u32 = 5;
pub const DEFAULT_MAX_DEPTH: u32 = 2;

#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub url: String,
    pub markdown: String,
    pub links: Vec<String>,
    pub media_type: MediaType,
}

#[derive(Debug, Clone)]
pub enum Strategy {
    /// URLs discovered from a sitemap; crawled shallowly (no further
    /// recursion through their own links).
    Sitemap(Vec<String>),
    /// A specialized `llms.txt`/`llms-full.txt` body was found at
    /// `source_url`; ingest it directly instead of crawling HTML.
    LlmsTxt { source_url: String, body: String },
    /// Neither matched; do a recursive same-origin crawl from the root.
    Recursive,
}

/// Discovery (spec §4.5): sitemap by URL shape, else probe
/// `llms-full.txt`/`llms.txt`/`.well-known/llms.txt`, else recursive.
/// Discovery failures are non-fatal — on any probe error this falls
/// through to [`Strategy::Recursive`].
pub async fn detect_strategy(fetcher: &Fetcher, root_url: &str) -> Strategy {
    if sitemap::looks_like_sitemap(root_url) {
        if let Ok(page) = fetcher.fetch(root_url).await {
            if let Ok(text) = String::from_utf8(page.body) {
                let urls = sitemap::parse_urls(&text);
                if !urls.is_empty() {
                    return Strategy::Sitemap(urls);
                }
            }
        }
    }

    if let Ok(base) = url::Url::parse(root_url) {
        let origin = base.origin().ascii_serialization();
        for candidate in [
            format!("{origin}/.well-known/llms.txt"),
            format!("{origin}/llms-full.txt"),
            format!("{origin}/llms.txt"),
        ] {
            if let Ok(page) = fetcher.fetch(&candidate).await {
                if let Ok(body) = String::from_utf8(page.body) {
                    return Strategy::LlmsTxt {
                        source_url: candidate,
                        body,
                    };
                }
            }
        }
    }

    Strategy::Recursive
}

/// Recursive same-origin crawl from `root_url`, bounded by `max_depth`
/// (clamped to [`HARD_DEPTH_CEILING`]). Returns a lazy stream so the
/// ingestion pipeline can start chunking the first page while later
/// pages are still being fetched.
pub fn crawl(
    fetcher: Arc<Fetcher>,
    robots: Arc<RobotsCache>,
    root_url: String,
    max_depth: u32,
) -> ReceiverStream<Result<CrawlResult, CrawlError>> {
    let (tx, rx) = tokio::sync::mpsc::channel(16);
    let max_depth = max_depth.min(HARD_DEPTH_CEILING);

    tokio::spawn(async move {
        let Ok(root) = url::Url::parse(&root_url) else {
            let _ = tx
                .send(Err(CrawlError::InvalidUrl(root_url.clone())))
                .await;
            return;
        };
        let origin = root.origin();

        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: Vec<(String, u32)> = vec![(root_url.clone(), 0)];

        while let Some((url, depth)) = frontier.pop() {
            if !visited.insert(url.clone()) {
                continue;
            }
            if depth > max_depth {
                continue;
            }

            let allowed = robots
                .allowed(&origin.ascii_serialization(), &url)
                .await;
            if !allowed {
                let _ = tx.send(Err(CrawlError::RobotsDisallowed(url.clone()))).await;
                continue;
            }

            let fetched = match fetcher.fetch(&url).await {
                Ok(f) => f,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    continue;
                }
            };

            let (markdown, links) = match fetched.media_type {
                MediaType::Html => {
                    let body = String::from_utf8_lossy(&fetched.body).into_owned();
                    to_markdown(&body)
                }
                MediaType::Txt | MediaType::Md => {
                    (String::from_utf8_lossy(&fetched.body).into_owned(), Vec::new())
                }
                MediaType::Pdf | MediaType::Doc | MediaType::Docx => {
                    // Binary formats carry no extractable links.
                    match crate::extract::extract_text(fetched.media_type, &fetched.body) {
                        Ok(text) => (text, Vec::new()),
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            continue;
                        }
                    }
                }
            };

            if depth < max_depth {
                for link in &links {
                    if let Ok(resolved) = root.join(link) {
                        if resolved.origin() == origin && !visited.contains(resolved.as_str()) {
                            frontier.push((resolved.to_string(), depth + 1));
                        }
                    }
                }
            }

            let result = CrawlResult {
                url: fetched.url,
                markdown,
                links,
                media_type: fetched.media_type,
            };
            if tx.send(Ok(result)).await.is_err() {
                return;
            }
        }
    });

    ReceiverStream::new(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_is_clamped_to_hard_ceiling() {
        assert_eq!(DEFAULT_MAX_DEPTH.min(HARD_DEPTH_CEILING), 2);
        assert_eq!(10u32.min(HARD_DEPTH_CEILING), HARD_DEPTH_CEILING);
    }
}
