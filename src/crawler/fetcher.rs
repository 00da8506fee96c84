//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipeline, including:
//! - Building the HTTP client (timeouts, compression, redirect policy)
//! - Rotating User-Agent strings across attempts
//! - Retry with exponential backoff on 403/429 and transient network errors
//! - Content-Type validation against an allow-list
//! - Enforcing the per-page byte ceiling while the body streams in
//! - Refusing internal network targets, including via redirects

use crate::config::FetchConfig;
use crate::url::{ensure_public_target, literal_target_blocked, BlockedTarget, PublicResolver};
use crate::{Result, ScrapeError, UrlError};
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Media types the extractor knows how to handle
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "application/xhtml+xml",
    "application/xml",
    "text/xml",
    "text/plain",
    "application/rss+xml",
    "application/atom+xml",
    "application/rdf+xml",
    "application/feed+xml",
];

/// Content-Type assumed when the server sends none
const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Content-Type header value (or the default when absent)
    pub content_type: String,
    /// Raw body, never longer than the per-page ceiling
    pub body: Vec<u8>,
    /// URL after following redirects
    pub final_url: Url,
}

/// Issues GET requests with retry, validation and size capping
///
/// Each fetcher owns its own connection pool; dropping it releases the pool.
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    next_agent: AtomicUsize,
}

impl Fetcher {
    /// Creates a fetcher and its HTTP client
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = build_http_client(&config)?;
        Ok(Self {
            client,
            config,
            next_agent: AtomicUsize::new(0),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Returns the next User-Agent from the rotation pool
    pub fn next_user_agent(&self) -> &str {
        let agents = &self.config.user_agents;
        if agents.is_empty() {
            return crate::config::DEFAULT_USER_AGENTS[0];
        }
        let index = self.next_agent.fetch_add(1, Ordering::Relaxed) % agents.len();
        &agents[index]
    }

    /// Fetches a URL with full error handling and retry logic
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Validate Content-Type and size, return |
    /// | HTTP 403 / 429 | Back off (base, doubling, capped) and retry |
    /// | Timeout / connect error | Back off and retry |
    /// | Other HTTP status | Fail immediately |
    /// | Redirect into a non-public address | Fail immediately (`InvalidUrl`) |
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - Body, content type and final URL
    /// * `Err(ScrapeError)` - `InvalidUrl`, `UnsupportedContentType`, `TooLarge` or `Fetch`
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult> {
        self.fetch_with_attempts(url, self.config.max_attempts).await
    }

    /// Fetches a URL with a single attempt and no backoff
    ///
    /// For auxiliary documents (robots.txt) where a failure has a cheap fallback.
    pub async fn fetch_once(&self, url: &Url) -> Result<FetchResult> {
        self.fetch_with_attempts(url, 1).await
    }

    async fn fetch_with_attempts(&self, url: &Url, max_attempts: u32) -> Result<FetchResult> {
        ensure_public_target(url, self.config.allow_private_addresses).await?;

        let max_attempts = max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let agent = self.next_user_agent();
            tracing::debug!("Fetching {} (attempt {}/{})", url, attempt, max_attempts);

            let sent = self
                .client
                .get(url.clone())
                .header(USER_AGENT, agent)
                .header(ACCEPT, self.config.accept.as_str())
                .send()
                .await;

            let retry_reason = match sent {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return self.read_response(url, response, attempt).await;
                    }
                    if !is_retryable_status(status) || attempt == max_attempts {
                        return Err(ScrapeError::Fetch {
                            url: url.to_string(),
                            attempts: attempt,
                            status: Some(status.as_u16()),
                            message: format!("HTTP {}", status),
                        });
                    }
                    format!("HTTP {}", status)
                }
                Err(e) => {
                    if let Some(host) = blocked_target(&e) {
                        return Err(UrlError::Blocked(host).into());
                    }
                    let transient = e.is_timeout() || e.is_connect();
                    if !transient || attempt == max_attempts {
                        return Err(ScrapeError::Fetch {
                            url: url.to_string(),
                            attempts: attempt,
                            status: None,
                            message: describe_error(&e),
                        });
                    }
                    describe_error(&e)
                }
            };

            let delay = backoff_delay(
                attempt,
                self.config.retry_base_delay_ms,
                self.config.retry_max_delay_ms,
            );
            tracing::warn!(
                "Fetch of {} failed ({}), retrying in {}ms",
                url,
                retry_reason,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        Err(ScrapeError::Fetch {
            url: url.to_string(),
            attempts: max_attempts,
            status: None,
            message: "retries exhausted".to_string(),
        })
    }

    /// Validates and reads a successful response
    async fn read_response(
        &self,
        url: &Url,
        mut response: Response,
        attempt: u32,
    ) -> Result<FetchResult> {
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        if !is_allowed_content_type(&content_type) {
            return Err(ScrapeError::UnsupportedContentType {
                url: final_url.to_string(),
                content_type,
            });
        }

        let limit = self.config.max_page_bytes;
        if let Some(length) = response.content_length() {
            if length > limit as u64 {
                return Err(ScrapeError::TooLarge {
                    url: final_url.to_string(),
                    limit,
                    size: Some(length),
                });
            }
        }

        let mut body = Vec::new();
        loop {
            let chunk = response.chunk().await.map_err(|e| ScrapeError::Fetch {
                url: url.to_string(),
                attempts: attempt,
                status: None,
                message: format!("failed reading body: {}", describe_error(&e)),
            })?;
            let Some(chunk) = chunk else { break };

            if body.len() + chunk.len() > limit {
                return Err(ScrapeError::TooLarge {
                    url: final_url.to_string(),
                    limit,
                    size: None,
                });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            "Fetched {} ({} bytes, {})",
            final_url,
            body.len(),
            content_type
        );

        Ok(FetchResult {
            content_type,
            body,
            final_url,
        })
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed up to `max-redirects` hops. Unless private addresses
/// are allowed, a hop whose host is an internal name or non-public IP literal
/// aborts the request with [`BlockedTarget`], and hostnames are resolved through
/// [`PublicResolver`] so no connection reaches a non-public address.
///
/// # Example
///
/// ```no_run
/// use web_content_analyzer::config::FetchConfig;
/// use web_content_analyzer::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> std::result::Result<Client, reqwest::Error> {
    let max_redirects = config.max_redirects;
    let allow_private = config.allow_private_addresses;

    let policy = Policy::custom(move |attempt| {
        if attempt.previous().len() >= max_redirects {
            return attempt.error(format!("more than {} redirects", max_redirects));
        }
        if !allow_private {
            if let Some(host) = literal_target_blocked(attempt.url()) {
                return attempt.error(BlockedTarget(host));
            }
        }
        attempt.follow()
    });

    let builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(policy)
        .gzip(true)
        .brotli(true);

    let builder = if allow_private {
        builder
    } else {
        builder.dns_resolver(Arc::new(PublicResolver))
    };

    builder.build()
}

/// Exponential backoff: `base * 2^(attempt - 1)`, capped at `cap`
pub fn backoff_delay(attempt: u32, base_ms: u64, cap_ms: u64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let delay = base_ms.saturating_mul(1u64 << exponent);
    Duration::from_millis(delay.min(cap_ms))
}

/// Lowercased media type without parameters
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

pub fn is_allowed_content_type(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&media_type(content_type).as_str())
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS
}

/// Finds a [`BlockedTarget`] raised by the redirect policy or resolver in the error chain
fn blocked_target(error: &reqwest::Error) -> Option<String> {
    let mut source = std::error::Error::source(error);
    while let Some(err) = source {
        if let Some(blocked) = err.downcast_ref::<BlockedTarget>() {
            return Some(blocked.0.clone());
        }
        source = err.source();
    }
    None
}

fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else if error.is_redirect() {
        format!("redirect error: {}", error)
    } else {
        error.to_string()
    }
}
