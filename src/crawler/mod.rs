//! Crawler module for page fetching and breadth-first expansion
//!
//! This module contains the fetching and crawling logic, including:
//! - HTTP fetching with retry, validation and size capping
//! - Batch scheduling under a per-crawl concurrency limit
//! - Crawl coordination (frontier, budgets, merging)

mod coordinator;
mod fetcher;
mod scheduler;

pub use coordinator::{CrawlFailure, CrawlOptions, CrawlOutcome, CrawlSummary, Crawler};
pub use fetcher::{
    backoff_delay, build_http_client, is_allowed_content_type, media_type, FetchResult, Fetcher,
    ALLOWED_CONTENT_TYPES,
};
pub use scheduler::{content_digest, fetch_and_extract, FetchedPage, Scheduler};
