//! Crawler (C5): URL fetching, sitemap/`llms.txt` discovery, and
//! recursive same-origin crawl with depth/concurrency caps.

pub mod crawl;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod robots;
pub mod sitemap;

pub use crawl::{crawl, detect_strategy, CrawlResult, Strategy, DEFAULT_MAX_DEPTH, HARD_DEPTH_CEILING};
pub use error::CrawlError;
pub use extract::extract_text;
pub use fetch::{FetchedPage, Fetcher, MediaType};
pub use robots::RobotsCache;
