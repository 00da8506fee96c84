//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: Where a crawl is in its lifecycle (idle, fetching root, expanding, draining, done)
//! - `CrawlState`: Visited set, frontier queue, byte counter and per-origin robots.txt cache
//!   for one crawl

mod crawl_state;
mod phase;

// Re-export main types
pub use crawl_state::{CrawlState, FrontierEntry};
pub use phase::CrawlPhase;
