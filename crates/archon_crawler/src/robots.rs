//! robots.txt: fetched once per origin and cached for the crawl's
//! lifetime (spec §4.5).

use std::collections::HashMap;
use std::sync::Mutex;

use robotstxt::DefaultMatcher;

const USER_AGENT: &str = "ArchonBot";

pub struct RobotsCache {
    http: reqwest::Client,
    bodies: Mutex<HashMap<String, Option<String>>>,
}

impl RobotsCache {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            bodies: Mutex::new(HashMap::new()),
        }
    }

    /// Fetches (and caches) `origin`'s `/robots.txt`. `None` means the
    /// fetch failed or returned non-2xx, treated as "no restrictions".
    pub async fn body_for(&self, origin: &str) -> Option<String> {
        if let Some(cached) = self.bodies.lock().unwrap().get(origin).cloned() {
            return cached;
        }
        let url = format!("{origin}/robots.txt");
        let body = match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.ok(),
            _ => None,
        };
        self.bodies
            .lock()
            .unwrap()
            .insert(origin.to_string(), body.clone());
        body
    }

    /// Checks whether `url` is allowed for `ArchonBot`, per the origin's
    /// cached robots.txt. No robots.txt (or an unfetchable one) means
    /// everything is allowed.
    pub async fn allowed(&self, origin: &str, url: &str) -> bool {
        match self.body_for(origin).await {
            Some(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(&body, USER_AGENT, url)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_robots_allows_everything() {
        let cache = RobotsCache::new(reqwest::Client::new());
        assert!(cache.allowed("https://no-such-origin.invalid", "https://no-such-origin.invalid/x").await);
    }
}
