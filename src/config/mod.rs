//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so running without a file is equivalent to loading an
//! empty one.
//!
//! # Example
//!
//! ```no_run
//! use web_content_analyzer::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("analyzer.toml")).unwrap();
//! println!("Crawl concurrency: {}", config.crawl.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AnalysisConfig, Config, CrawlConfig, FetchConfig, NormalizeConfig, DEFAULT_ACCEPT,
    DEFAULT_MAX_PAGE_BYTES, DEFAULT_MAX_TOTAL_BYTES, DEFAULT_USER_AGENTS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
