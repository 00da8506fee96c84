use super::CrawlPhase;
use crate::robots::ParsedRobots;
use crate::url::visit_key;
use std::collections::{HashMap, HashSet, VecDeque};
use url::Url;

/// A discovered link waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: u32,
}

/// Mutable state of one crawl
///
/// Owned by the task driving the crawl loop and never shared; worker tasks only
/// fetch and extract, their results are folded back in here after each batch.
///
/// URLs are keyed by their canonical form (see [`crate::url::normalize_url`]), so
/// `https://Example.com/a/` and `https://example.com/a#top` are the same page.
#[derive(Debug)]
pub struct CrawlState {
    phase: CrawlPhase,

    /// Canonical URLs that were dispatched for fetching
    visited: HashSet<String>,

    /// Same as `visited`, in dispatch order
    visit_order: Vec<String>,

    /// Everything visited, queued or reached through a redirect
    seen: HashSet<String>,

    frontier: VecDeque<FrontierEntry>,

    total_bytes: u64,

    /// SHA-256 digests of merged bodies
    content_hashes: HashSet<String>,

    /// robots.txt per origin, fetched lazily
    robots: HashMap<String, ParsedRobots>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self {
            phase: CrawlPhase::Idle,
            visited: HashSet::new(),
            visit_order: Vec::new(),
            seen: HashSet::new(),
            frontier: VecDeque::new(),
            total_bytes: 0,
            content_hashes: HashSet::new(),
            robots: HashMap::new(),
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Moves to the next phase
    ///
    /// Illegal transitions are ignored and reported as `false`.
    pub fn transition_to(&mut self, next: CrawlPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            tracing::warn!("Ignoring illegal crawl transition {} -> {}", self.phase, next);
            return false;
        }
        tracing::debug!("Crawl phase {} -> {}", self.phase, next);
        self.phase = next;
        true
    }

    /// Records a URL as visited
    ///
    /// Returns false (and changes nothing) if it was already visited.
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        let key = visit_key(url);
        if !self.visited.insert(key.clone()) {
            return false;
        }
        self.seen.insert(key.clone());
        self.visit_order.push(key);
        true
    }

    /// Records a URL that was reached without being dispatched (a redirect target)
    ///
    /// It will never be enqueued, but does not count as a visit.
    pub fn note_alias(&mut self, url: &Url) {
        self.seen.insert(visit_key(url));
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(&visit_key(url))
    }

    /// True if the URL was visited, queued or reached through a redirect
    pub fn is_known(&self, url: &Url) -> bool {
        self.seen.contains(&visit_key(url))
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Canonical visited URLs in dispatch order
    pub fn visited_urls(&self) -> &[String] {
        &self.visit_order
    }

    /// Appends a link to the frontier unless it is already known
    pub fn enqueue(&mut self, url: Url, depth: u32) -> bool {
        if !self.seen.insert(visit_key(&url)) {
            return false;
        }
        self.frontier.push_back(FrontierEntry { url, depth });
        true
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn frontier_is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Depth of the entry at the head of the frontier
    pub fn frontier_depth(&self) -> Option<u32> {
        self.frontier.front().map(|entry| entry.depth)
    }

    /// Pops the next frontier entry if it sits at `depth`
    pub fn pop_at_depth(&mut self, depth: u32) -> Option<FrontierEntry> {
        match self.frontier.front() {
            Some(entry) if entry.depth == depth => self.frontier.pop_front(),
            _ => None,
        }
    }

    /// Pops up to `max` entries, all at the depth of the current head
    ///
    /// Never mixes depths, which keeps expansion strictly breadth-first.
    pub fn pop_batch(&mut self, max: usize) -> Vec<FrontierEntry> {
        let Some(depth) = self.frontier_depth() else {
            return Vec::new();
        };

        let mut batch = Vec::new();
        while batch.len() < max {
            match self.pop_at_depth(depth) {
                Some(entry) => batch.push(entry),
                None => break,
            }
        }
        batch
    }

    /// Drops every pending frontier entry, returning how many were discarded
    pub fn clear_frontier(&mut self) -> usize {
        let discarded = self.frontier.len();
        self.frontier.clear();
        discarded
    }

    /// Adds fetched bytes to the running total and returns the new total
    pub fn add_bytes(&mut self, bytes: u64) -> u64 {
        self.total_bytes = self.total_bytes.saturating_add(bytes);
        self.total_bytes
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Remembers a body digest; returns false if it was already recorded
    pub fn record_content(&mut self, digest: String) -> bool {
        self.content_hashes.insert(digest)
    }

    pub fn cached_robots(&self, origin: &str) -> Option<&ParsedRobots> {
        self.robots.get(origin)
    }

    pub fn cache_robots(&mut self, origin: String, robots: ParsedRobots) {
        self.robots.insert(origin, robots);
    }
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}
