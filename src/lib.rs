//! Web Content Analyzer: fetch, crawl, extract, normalize and analyze web content
//!
//! This crate implements a scraping pipeline that fetches a URL, optionally crawls
//! linked pages breadth-first under depth, page and byte budgets, extracts
//! structured content from HTML or RSS/Atom payloads, normalizes the text and
//! optionally asks a language model for a structured JSON analysis.

pub mod analysis;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for fetch, crawl and scrape operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Unsupported content type '{content_type}' for {url}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("Response from {url} exceeds {limit} bytes")]
    TooLarge {
        url: String,
        limit: usize,
        size: Option<u64>,
    },

    #[error("Fetch failed for {url} after {attempts} attempt(s): {message}")]
    Fetch {
        url: String,
        attempts: u32,
        status: Option<u16>,
        message: String,
    },

    #[error("Scrape of {url} exceeded its deadline")]
    Timeout { url: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Returns the HTTP status that ended the fetch, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch { status, .. } => *status,
            _ => None,
        }
    }
}

/// Errors raised by the analysis stage
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analysis timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Analysis upstream returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Analysis response is malformed: {0}")]
    Malformed(String),

    #[error("Analysis API key not set (expected in ${env_var})")]
    MissingApiKey { env_var: String },

    #[error("Analysis transport error: {0}")]
    Transport(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),

    #[error("Refusing non-public address: {0}")]
    Blocked(String),
}

/// Result type alias for scrape operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use analysis::{AnalysisReport, Analyzer, LlmAnalyzer};
pub use config::Config;
pub use crawler::{Crawler, FetchResult, Fetcher};
pub use extract::{extract, ExtractedContent};
pub use normalize::{normalize, NormalizedText};
pub use pipeline::{Pipeline, ScrapeRequest, ScrapeStatus, ScrapedContent};
pub use state::{CrawlPhase, CrawlState};
pub use url::{extract_domain, normalize_url, registrable_domain};
