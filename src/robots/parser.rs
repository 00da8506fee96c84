//! Robots.txt parser implementation
//!
//! Wraps the robotstxt crate's matcher behind a small owned type.

use robotstxt::DefaultMatcher;
use url::Url;

/// Product token matched against `User-agent` groups
///
/// Fetches rotate browser-like User-Agent strings, so robots groups are matched
/// against this stable token instead (plus the `*` group, as usual).
pub const ROBOTS_AGENT: &str = "web-content-analyzer";

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when robots.txt is missing or cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
        }
    }

    pub fn is_allow_all(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks if a URL may be fetched under [`ROBOTS_AGENT`]
    pub fn allows(&self, url: &Url) -> bool {
        self.allows_agent(url.as_str(), ROBOTS_AGENT)
    }

    /// Checks if a URL (or bare path) is allowed for the given user agent
    pub fn allows_agent(&self, url: &str, user_agent: &str) -> bool {
        if self.is_allow_all() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }
}
