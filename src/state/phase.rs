/// Crawl phase definitions
///
/// A crawl moves strictly forward through these phases; it never revisits one.
use serde::Serialize;
use std::fmt;

/// Represents where a single crawl currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    /// Created, nothing fetched yet
    Idle,

    /// Fetching and extracting the root URL
    FetchingRoot,

    /// Dispatching frontier batches
    Expanding,

    /// Limits reached or frontier empty; no new fetches are issued
    Draining,

    /// Terminal; merged content is ready
    Done,
}

impl CrawlPhase {
    /// Returns true once the crawl has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if new fetches may still be dispatched
    pub fn accepts_fetches(&self) -> bool {
        matches!(self, Self::FetchingRoot | Self::Expanding)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    ///
    /// `FetchingRoot -> Draining` covers crawls that never expand (no eligible
    /// links, zero depth or an exhausted budget).
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::FetchingRoot)
                | (Self::FetchingRoot, Self::Expanding)
                | (Self::FetchingRoot, Self::Draining)
                | (Self::Expanding, Self::Draining)
                | (Self::Draining, Self::Done)
        )
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::FetchingRoot => "fetching_root",
            Self::Expanding => "expanding",
            Self::Draining => "draining",
            Self::Done => "done",
        };
        write!(f, "{}", name)
    }
}
