use crate::analysis::AnalysisReport;
use crate::crawler::{CrawlOptions, CrawlSummary};
use crate::extract::ExtractedContent;
use crate::normalize::NormalizedText;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scrape request
///
/// Deserializes from the inbound request shape; omitted fields take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeRequest {
    pub url: String,
    /// Link depth to crawl; 0 scrapes the root only
    pub depth: u32,
    pub same_domain_only: bool,
    /// Pages fetched in addition to the root
    pub max_pages: usize,
    pub run_analysis: bool,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn crawl_options(&self) -> CrawlOptions {
        CrawlOptions {
            max_depth: self.depth,
            same_domain_only: self.same_domain_only,
            max_pages: self.max_pages,
        }
    }
}

impl Default for ScrapeRequest {
    fn default() -> Self {
        Self {
            url: String::new(),
            depth: 0,
            same_domain_only: true,
            max_pages: 5,
            run_analysis: false,
        }
    }
}

/// Whether the scrape delivered everything it was asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    Complete,
    /// Analysis was omitted, or the crawl lost pages or was cut short
    Partial,
}

/// Result of one scrape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedContent {
    /// URL as requested
    pub url: String,
    /// Root URL after redirects
    pub final_url: String,
    pub content_type: String,
    pub status: ScrapeStatus,
    /// Root content with every merged child page folded in
    pub content: ExtractedContent,
    pub normalized: NormalizedText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisReport>,
    pub crawl: CrawlSummary,
    /// Side-channel notes on degraded results
    pub warnings: Vec<String>,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapedContent {
    pub fn is_complete(&self) -> bool {
        self.status == ScrapeStatus::Complete
    }
}
