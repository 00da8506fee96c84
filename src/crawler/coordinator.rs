//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that expands a root page breadth-first:
//! - Seeding the visited set and frontier from the root page
//! - Pulling same-depth batches from the frontier under the page budget
//! - Dispatching batches through the scheduler and folding results back in
//! - Enforcing the byte budget, robots.txt and the optional deadline
//! - Producing the merged content and a crawl summary

use crate::config::CrawlConfig;
use crate::crawler::scheduler::{content_digest, PageOutcome, Scheduler};
use crate::crawler::{FetchResult, Fetcher};
use crate::extract::{extract, ExtractedContent};
use crate::robots::{fetch_robots, origin_key};
use crate::state::{CrawlPhase, CrawlState, FrontierEntry};
use crate::url::{extract_domain, is_excluded, literal_target_blocked, same_site};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Limits for one crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Deepest link level to fetch; 0 fetches the root only
    pub max_depth: u32,
    /// Restrict expansion to the root's registrable domain
    pub same_domain_only: bool,
    /// Pages fetched in addition to the root
    pub max_pages: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_depth: 0,
            same_domain_only: true,
            max_pages: 5,
        }
    }
}

/// A child page that could not be merged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlFailure {
    pub url: String,
    pub reason: String,
}

/// What a crawl did and why it stopped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlSummary {
    /// Canonical URLs dispatched for fetching, root first
    pub visited: Vec<String>,
    /// Pages whose content made it into the merged record (root included)
    pub pages_merged: usize,
    pub failures: Vec<CrawlFailure>,
    /// Pages with a body identical to one already merged
    pub duplicates_skipped: usize,
    /// Frontier entries skipped because robots.txt disallows them
    pub robots_denied: usize,
    /// Fetches cut off by the deadline
    pub pages_aborted: usize,
    pub total_bytes: u64,
    /// Deepest level at which a page was fetched
    pub max_depth_reached: u32,
    pub byte_budget_exhausted: bool,
    pub page_budget_exhausted: bool,
    pub deadline_reached: bool,
    /// Expansion ran out of eligible links before fetching `max_pages` children
    pub frontier_exhausted: bool,
}

impl CrawlSummary {
    /// True when the crawl returned fewer pages than asked for or lost pages
    ///
    /// Reaching the page budget is the one way to stop early and still be complete.
    pub fn is_partial(&self) -> bool {
        self.byte_budget_exhausted
            || self.deadline_reached
            || self.frontier_exhausted
            || !self.failures.is_empty()
    }

    /// Child pages dispatched for fetching (the root excluded)
    pub fn children_visited(&self) -> usize {
        self.visited.len().saturating_sub(1)
    }
}

/// Merged content plus the summary of how it was gathered
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub content: ExtractedContent,
    pub summary: CrawlSummary,
    pub phase: CrawlPhase,
}

/// Breadth-first crawler
///
/// Holds no per-crawl state: every call to [`Crawler::crawl`] or
/// [`Crawler::expand`] builds its own [`CrawlState`] and [`Scheduler`].
pub struct Crawler {
    fetcher: Arc<Fetcher>,
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(fetcher: Arc<Fetcher>, config: CrawlConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetches the root URL and expands from it
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - Merged content, even if every child failed
    /// * `Err(ScrapeError)` - The root itself could not be fetched
    pub async fn crawl(&self, root_url: &Url, options: CrawlOptions) -> Result<CrawlOutcome> {
        let root = self.fetcher.fetch(root_url).await?;
        let content = extract(&root.body, &root.final_url, &root.content_type);
        Ok(self.expand(root_url, &root, content, options).await)
    }

    /// Expands an already fetched root page
    ///
    /// `requested` is the URL the root was requested as; `root` carries its final
    /// (post-redirect) URL. Child failures never surface as errors.
    pub async fn expand(
        &self,
        requested: &Url,
        root: &FetchResult,
        root_content: ExtractedContent,
        options: CrawlOptions,
    ) -> CrawlOutcome {
        let deadline = self
            .config
            .max_duration_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        self.expand_until(requested, root, root_content, options, deadline)
            .await
    }

    /// Same as [`Crawler::expand`], with an externally chosen deadline
    ///
    /// Once `deadline` passes no new batch starts, in-flight fetches are aborted
    /// and the content merged so far is returned.
    pub async fn expand_until(
        &self,
        requested: &Url,
        root: &FetchResult,
        root_content: ExtractedContent,
        options: CrawlOptions,
        deadline: Option<Instant>,
    ) -> CrawlOutcome {
        let mut state = CrawlState::new();
        let mut summary = CrawlSummary::default();
        state.transition_to(CrawlPhase::FetchingRoot);

        let root_url = root.final_url.clone();
        state.mark_visited(&root_url);
        state.note_alias(requested);

        let max_total = self.config.max_total_bytes;
        let total = state.add_bytes(root.body.len() as u64);
        if self.config.dedupe_content {
            state.record_content(content_digest(&root.body));
        }
        let mut merged = root_content;
        summary.pages_merged = 1;
        summary.byte_budget_exhausted = total > max_total;

        if !summary.byte_budget_exhausted {
            let links = merged.links.clone();
            self.harvest(&mut state, &root_url, &links, 1, options);
        }

        if state.frontier_is_empty() {
            state.transition_to(CrawlPhase::Draining);
        } else {
            state.transition_to(CrawlPhase::Expanding);
            tracing::info!(
                "Expanding {} (max depth {}, max pages {}, {} link(s) queued)",
                root_url,
                options.max_depth,
                options.max_pages,
                state.frontier_len()
            );
            self.run_expansion(
                &mut state,
                &mut summary,
                &mut merged,
                &root_url,
                options,
                deadline,
            )
            .await;
            state.transition_to(CrawlPhase::Draining);
        }

        let dead_end = state.frontier_is_empty()
            && !summary.byte_budget_exhausted
            && !summary.deadline_reached;
        let discarded = state.clear_frontier();
        if discarded > 0 {
            tracing::debug!("Discarded {} unvisited frontier entries", discarded);
        }

        summary.visited = state.visited_urls().to_vec();
        summary.total_bytes = state.total_bytes();
        summary.frontier_exhausted = dead_end
            && options.max_depth > 0
            && summary.children_visited() < options.max_pages;
        if summary.frontier_exhausted {
            tracing::info!(
                "No more links to follow from {} after {} of {} page(s)",
                root_url,
                summary.children_visited(),
                options.max_pages
            );
        }
        state.transition_to(CrawlPhase::Done);

        tracing::info!(
            "Crawl of {} done: {} visited, {} merged, {} failed, {} bytes",
            root_url,
            summary.visited.len(),
            summary.pages_merged,
            summary.failures.len(),
            summary.total_bytes
        );

        CrawlOutcome {
            content: merged,
            summary,
            phase: state.phase(),
        }
    }

    /// Runs batches until the frontier empties or a limit is reached
    async fn run_expansion(
        &self,
        state: &mut CrawlState,
        summary: &mut CrawlSummary,
        merged: &mut ExtractedContent,
        root_url: &Url,
        options: CrawlOptions,
        deadline: Option<Instant>,
    ) {
        let scheduler = Scheduler::new(self.config.concurrency);
        let page_limit = options.max_pages.saturating_add(1);

        while state.phase().accepts_fetches() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                summary.deadline_reached = true;
                break;
            }
            if state.frontier_is_empty() {
                break;
            }
            if state.visited_count() >= page_limit {
                summary.page_budget_exhausted = true;
                tracing::info!("Page budget of {} reached", options.max_pages);
                break;
            }

            let room = (page_limit - state.visited_count()).min(scheduler.concurrency());
            let batch = self.next_batch(state, summary, room).await;
            if batch.is_empty() {
                continue;
            }

            let depth = batch[0].depth;
            let dispatched = batch.len();
            tracing::debug!("Dispatching {} fetch(es) at depth {}", dispatched, depth);
            summary.max_depth_reached = summary.max_depth_reached.max(depth);

            let mut set = scheduler.spawn_batch(Arc::clone(&self.fetcher), batch);
            let collected = Scheduler::collect(&mut set, deadline).await;
            drop(set);

            let arrived = collected.outcomes.len();
            if collected.timed_out {
                summary.deadline_reached = true;
                summary.pages_aborted += dispatched - arrived;
            } else if arrived < dispatched {
                summary.failures.push(CrawlFailure {
                    url: format!("{} page(s) at depth {}", dispatched - arrived, depth),
                    reason: "worker task aborted".to_string(),
                });
            }

            for outcome in collected.outcomes {
                self.fold(state, summary, merged, root_url, outcome, options);
            }

            if summary.deadline_reached || summary.byte_budget_exhausted {
                break;
            }
        }
    }

    /// Pops the next same-depth batch, applying robots.txt and marking entries visited
    async fn next_batch(
        &self,
        state: &mut CrawlState,
        summary: &mut CrawlSummary,
        room: usize,
    ) -> Vec<FrontierEntry> {
        let mut batch = Vec::new();

        for entry in state.pop_batch(room) {
            if self.config.respect_robots_txt && !self.robots_allow(state, &entry.url).await {
                tracing::debug!("robots.txt disallows {}", entry.url);
                summary.robots_denied += 1;
                continue;
            }
            if state.mark_visited(&entry.url) {
                batch.push(entry);
            }
        }

        batch
    }

    async fn robots_allow(&self, state: &mut CrawlState, url: &Url) -> bool {
        let origin = origin_key(url);
        if let Some(robots) = state.cached_robots(&origin) {
            return robots.allows(url);
        }

        let robots = fetch_robots(&self.fetcher, url).await;
        let allowed = robots.allows(url);
        state.cache_robots(origin, robots);
        allowed
    }

    /// Folds one batch outcome into the crawl
    ///
    /// Outcomes arrive in frontier order. The page that pushes the byte total past
    /// the ceiling, and every later page of the same batch, is still counted and
    /// merged, but their links are not harvested; no further batch starts.
    fn fold(
        &self,
        state: &mut CrawlState,
        summary: &mut CrawlSummary,
        merged: &mut ExtractedContent,
        root_url: &Url,
        outcome: PageOutcome,
        options: CrawlOptions,
    ) {
        let PageOutcome { entry, result, .. } = outcome;

        let fetched = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", entry.url, e);
                summary.failures.push(CrawlFailure {
                    url: entry.url.to_string(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        state.note_alias(&fetched.page.final_url);
        let total = state.add_bytes(fetched.page.body.len() as u64);
        let over_budget = total > self.config.max_total_bytes;

        if !over_budget {
            self.harvest(
                state,
                root_url,
                &fetched.content.links,
                entry.depth + 1,
                options,
            );
        }

        let duplicate = self.config.dedupe_content && !state.record_content(fetched.digest);
        if duplicate {
            tracing::debug!("Not merging {}: duplicate content", entry.url);
            summary.duplicates_skipped += 1;
        } else {
            merged.merge(fetched.content);
            summary.pages_merged += 1;
        }

        if over_budget && !summary.byte_budget_exhausted {
            tracing::info!(
                "Byte budget of {} exceeded ({} bytes) at {}",
                self.config.max_total_bytes,
                total,
                entry.url
            );
            summary.byte_budget_exhausted = true;
        }
    }

    /// Enqueues the eligible links of a page at `depth`
    ///
    /// A link is eligible when it is within the depth limit, not already known,
    /// on the root's registrable domain (if required), not on an excluded domain
    /// and not an obviously internal address.
    fn harvest(
        &self,
        state: &mut CrawlState,
        root_url: &Url,
        links: &[String],
        depth: u32,
        options: CrawlOptions,
    ) -> usize {
        if depth > options.max_depth {
            return 0;
        }

        let allow_private = self.fetcher.config().allow_private_addresses;
        let mut added = 0;

        for link in links {
            let Ok(url) = Url::parse(link) else {
                continue;
            };
            if state.is_known(&url) {
                continue;
            }
            if options.same_domain_only && !same_site(root_url, &url) {
                continue;
            }
            let excluded = extract_domain(&url)
                .is_some_and(|domain| is_excluded(&domain, &self.config.exclude_domains));
            if excluded {
                tracing::trace!("Not enqueuing {}: excluded domain", url);
                continue;
            }
            if !allow_private && literal_target_blocked(&url).is_some() {
                continue;
            }
            if state.enqueue(url, depth) {
                added += 1;
            }
        }

        tracing::debug!("Enqueued {} link(s) at depth {}", added, depth);
        added
    }
}
