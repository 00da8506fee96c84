//! Robots.txt handling module
//!
//! Fetches and parses robots.txt once per origin. Any failure to obtain the file
//! (missing, blocked, wrong type, too large) is treated as allow-all.

mod parser;

pub use parser::{ParsedRobots, ROBOTS_AGENT};

use crate::crawler::Fetcher;
use url::Url;

/// Returns the `scheme://host[:port]` key robots.txt is scoped to
pub fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Location of the robots.txt governing `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    url.join("/robots.txt").ok()
}

/// Fetches robots.txt for the origin of `url`
///
/// A single attempt is made; rate limiting or a 403 here is not worth a backoff.
///
/// # Returns
///
/// The parsed file, or [`ParsedRobots::allow_all`] if it could not be fetched
pub async fn fetch_robots(fetcher: &Fetcher, url: &Url) -> ParsedRobots {
    let Some(location) = robots_url(url) else {
        return ParsedRobots::allow_all();
    };

    match fetcher.fetch_once(&location).await {
        Ok(page) => {
            tracing::debug!("Loaded robots.txt from {}", location);
            ParsedRobots::from_content(&String::from_utf8_lossy(&page.body))
        }
        Err(e) => {
            tracing::debug!("No usable robots.txt at {} ({}), allowing all", location, e);
            ParsedRobots::allow_all()
        }
    }
}
