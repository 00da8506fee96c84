//! URL handling module
//!
//! This module provides URL canonicalisation for the visited set, domain and
//! registrable-domain extraction, wildcard domain matching and the guard that keeps
//! fetches away from internal network ranges.

mod domain;
mod guard;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, registrable_domain};
pub use guard::{
    ensure_public_target, is_public_ip, literal_target_blocked, public_addrs, resolve_public,
    BlockedTarget, PublicResolver,
};
pub use matcher::matches_wildcard;
pub use normalize::normalize_url;

use url::Url;

/// Returns true when `domain` matches any of the configured exclusion patterns
///
/// # Examples
///
/// ```
/// use web_content_analyzer::url::is_excluded;
///
/// let patterns = vec!["*.ads.example.com".to_string()];
/// assert!(is_excluded("tracker.ads.example.com", &patterns));
/// assert!(!is_excluded("example.com", &patterns));
/// ```
pub fn is_excluded(domain: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .any(|pattern| matches_wildcard(pattern, domain))
}

/// Returns true when both URLs share a registrable domain
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (registrable_domain(a), registrable_domain(b)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Returns the canonical visited-set key for a URL, falling back to the raw form
pub fn visit_key(url: &Url) -> String {
    normalize_url(url.as_str())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}
