//! Batch scheduler for crawl expansion
//!
//! This module handles:
//! - Per-crawl concurrency limiting via a semaphore
//! - Spawning one fetch+extract task per frontier entry of a batch
//! - Collecting a batch, optionally under a deadline, back into frontier order

use crate::crawler::{FetchResult, Fetcher};
use crate::extract::{extract, ExtractedContent};
use crate::state::FrontierEntry;
use crate::ScrapeError;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// A fetched and extracted page, ready to be folded into the crawl
#[derive(Debug)]
pub struct FetchedPage {
    pub page: FetchResult,
    pub content: ExtractedContent,
    /// SHA-256 of the body, hex encoded
    pub digest: String,
}

/// What one worker task reports back
#[derive(Debug)]
pub struct PageOutcome {
    /// Position of the entry in its batch
    pub index: usize,
    pub entry: FrontierEntry,
    pub result: Result<FetchedPage, ScrapeError>,
}

/// Outcomes of one batch, sorted by batch position
#[derive(Debug, Default)]
pub struct CollectedBatch {
    pub outcomes: Vec<PageOutcome>,
    /// True if the deadline expired and unfinished tasks were aborted
    pub timed_out: bool,
}

/// Dispatches frontier batches under a concurrency limit
///
/// Each crawl builds its own scheduler, so concurrent crawls never share permits.
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl Scheduler {
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Maximum simultaneous in-flight fetches
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Spawns a fetch+extract task for every entry of the batch
    ///
    /// Tasks wait for a semaphore permit before fetching. Dropping the returned
    /// set aborts every task still running.
    pub fn spawn_batch(
        &self,
        fetcher: Arc<Fetcher>,
        batch: Vec<FrontierEntry>,
    ) -> JoinSet<PageOutcome> {
        let mut set = JoinSet::new();

        for (index, entry) in batch.into_iter().enumerate() {
            let fetcher = Arc::clone(&fetcher);
            let semaphore = Arc::clone(&self.semaphore);

            set.spawn(async move {
                // A closed semaphore never happens here; fetch unthrottled if it does
                let _permit = semaphore.acquire_owned().await.ok();
                let result = fetch_and_extract(&fetcher, &entry).await;
                PageOutcome {
                    index,
                    entry,
                    result,
                }
            });
        }

        set
    }

    /// Waits for every task of a batch, or until `deadline`
    ///
    /// Tasks that panic are logged and left out of the outcomes.
    pub async fn collect(
        set: &mut JoinSet<PageOutcome>,
        deadline: Option<Instant>,
    ) -> CollectedBatch {
        let mut collected = CollectedBatch::default();

        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, set.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::warn!(
                            "Crawl deadline reached, aborting {} in-flight fetch(es)",
                            set.len()
                        );
                        set.abort_all();
                        collected.timed_out = true;
                        break;
                    }
                },
                None => set.join_next().await,
            };

            match next {
                Some(Ok(outcome)) => collected.outcomes.push(outcome),
                Some(Err(e)) => tracing::warn!("Crawl worker task failed: {}", e),
                None => break,
            }
        }

        collected.outcomes.sort_by_key(|outcome| outcome.index);
        collected
    }
}

/// Fetches one frontier entry and extracts its content
///
/// Parsing happens synchronously after the body is in hand, so no parser state
/// is held across an await point.
pub async fn fetch_and_extract(
    fetcher: &Fetcher,
    entry: &FrontierEntry,
) -> Result<FetchedPage, ScrapeError> {
    let page = fetcher.fetch(&entry.url).await?;
    let content = extract(&page.body, &page.final_url, &page.content_type);
    let digest = content_digest(&page.body);

    Ok(FetchedPage {
        page,
        content,
        digest,
    })
}

/// Hex-encoded SHA-256 of a body
pub fn content_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}
