/// Checks if a domain matches an exclusion pattern
///
/// `"example.com"` matches only that host; `"*.example.com"` matches the bare
/// domain and any subdomain depth beneath it. Comparison is case-insensitive.
///
/// # Examples
///
/// ```
/// use web_content_analyzer::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// assert!(!matches_wildcard("example.com", "blog.example.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let candidate = candidate.to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}
