//! Pipeline orchestrator
//!
//! [`Pipeline::scrape`] is the single entry point. It sequences:
//!
//! 1. validate the input URL
//! 2. fetch and extract the root page (failure here fails the call)
//! 3. expand breadth-first when `depth > 0`, merging child pages
//! 4. normalize the merged main text
//! 5. analyze, when requested (failure here only degrades the result)

mod types;

pub use crate::crawler::{CrawlFailure, CrawlSummary};
pub use types::{ScrapeRequest, ScrapeStatus, ScrapedContent};

use crate::analysis::{build_system_prompt, build_user_prompt, AnalysisReport, Analyzer, LlmAnalyzer};
use crate::config::{validate, Config};
use crate::crawler::{Crawler, Fetcher};
use crate::extract::{extract, ExtractedContent};
use crate::normalize::{build_stopwords, normalize};
use crate::{AnalysisError, Result, ScrapeError, UrlError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Fetch → crawl → extract → normalize → analyze
///
/// A pipeline can serve many concurrent scrapes; each call gets its own crawl
/// state and concurrency budget. Only the HTTP connection pool is shared.
pub struct Pipeline {
    config: Config,
    fetcher: Arc<Fetcher>,
    crawler: Crawler,
    analyzer: Option<Arc<dyn Analyzer>>,
    stopwords: HashSet<String>,
}

impl Pipeline {
    /// Builds a pipeline from validated configuration
    ///
    /// The default analyzer is an [`LlmAnalyzer`] built from `[analysis]`; replace
    /// it with [`Pipeline::with_analyzer`].
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;

        let fetcher = Arc::new(Fetcher::new(config.fetch.clone())?);
        let crawler = Crawler::new(Arc::clone(&fetcher), config.crawl.clone());
        let stopwords = build_stopwords(
            config.normalize.use_default_stopwords,
            &config.normalize.extra_stopwords,
        );

        let analyzer: Option<Arc<dyn Analyzer>> = match LlmAnalyzer::from_config(&config.analysis)
        {
            Ok(analyzer) => {
                if !analyzer.has_api_key() {
                    tracing::debug!(
                        "${} is not set; requested analyses will be omitted",
                        config.analysis.api_key_env
                    );
                }
                Some(Arc::new(analyzer))
            }
            Err(e) => {
                tracing::warn!("Analysis disabled: {}", e);
                None
            }
        };

        Ok(Self {
            config,
            fetcher,
            crawler,
            analyzer,
            stopwords,
        })
    }

    /// Replaces the analyzer used when a request asks for analysis
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Runs one scrape
    ///
    /// # Returns
    ///
    /// * `Ok(ScrapedContent)` - Possibly `Partial`, see `warnings`
    /// * `Err(ScrapeError)` - The input URL is invalid or the root page failed
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapedContent> {
        let url = parse_request_url(&request.url)?;
        let deadline = self
            .config
            .crawl
            .max_duration_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));

        tracing::info!(
            "Scraping {} (depth {}, max pages {}, same domain only: {})",
            url,
            request.depth,
            request.max_pages,
            request.same_domain_only
        );

        let root = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, self.fetcher.fetch(&url))
                .await
                .map_err(|_| ScrapeError::Timeout {
                    url: url.to_string(),
                })??,
            None => self.fetcher.fetch(&url).await?,
        };

        let root_content = extract(&root.body, &root.final_url, &root.content_type);
        if root_content.is_empty() {
            tracing::info!("Root page {} has no title or text", root.final_url);
        }

        let outcome = self
            .crawler
            .expand_until(&url, &root, root_content, request.crawl_options(), deadline)
            .await;
        let content = outcome.content;
        let crawl = outcome.summary;
        let mut warnings = crawl_warnings(&crawl);

        let normalized = normalize(
            &content.main_text,
            Some(&self.stopwords),
            self.config.normalize.remove_stopwords,
        );

        let analysis = if request.run_analysis {
            match self.analyze(root.final_url.as_str(), &content).await {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::warn!("Analysis of {} failed: {}", root.final_url, e);
                    warnings.push(format!("analysis omitted: {}", e));
                    None
                }
            }
        } else {
            None
        };

        let analysis_missing = request.run_analysis && analysis.is_none();
        let status = if crawl.is_partial() || analysis_missing {
            ScrapeStatus::Partial
        } else {
            ScrapeStatus::Complete
        };

        Ok(ScrapedContent {
            url: request.url.clone(),
            final_url: root.final_url.to_string(),
            content_type: root.content_type,
            status,
            content,
            normalized,
            analysis,
            crawl,
            warnings,
            scraped_at: chrono::Utc::now(),
        })
    }

    async fn analyze(
        &self,
        url: &str,
        content: &ExtractedContent,
    ) -> std::result::Result<AnalysisReport, AnalysisError> {
        let analyzer = self.analyzer.as_ref().ok_or_else(|| {
            AnalysisError::Transport("no analyzer is configured".to_string())
        })?;

        let system_prompt = build_system_prompt(&self.config.analysis);
        let user_prompt = build_user_prompt(url, content);
        analyzer.analyze(&system_prompt, &user_prompt).await
    }
}

/// Parses the requested URL, assuming `https://` when no scheme is given
pub fn parse_request_url(input: &str) -> std::result::Result<Url, UrlError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let url = match Url::parse(input) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", input))
            .map_err(|e| UrlError::Parse(e.to_string()))?,
        Err(e) => return Err(UrlError::Parse(e.to_string())),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Side-channel notes for a crawl that lost pages or stopped early
fn crawl_warnings(summary: &CrawlSummary) -> Vec<String> {
    let mut warnings = Vec::new();

    if !summary.failures.is_empty() {
        warnings.push(format!(
            "{} linked page(s) could not be fetched",
            summary.failures.len()
        ));
    }
    if summary.byte_budget_exhausted {
        warnings.push(format!(
            "crawl stopped at the byte budget after {} bytes",
            summary.total_bytes
        ));
    }
    if summary.frontier_exhausted {
        warnings.push(format!(
            "ran out of links to follow after {} linked page(s)",
            summary.children_visited()
        ));
    }
    if summary.deadline_reached {
        warnings.push(format!(
            "crawl deadline reached; {} in-flight fetch(es) aborted",
            summary.pages_aborted
        ));
    }

    warnings
}
