use url::{Host, Url};

/// Second-level labels that act as public suffixes under two-letter country codes
/// (`co.uk`, `com.au`, `ac.jp`, ...)
const SECOND_LEVEL_SUFFIXES: &[&str] = &["co", "com", "net", "org", "gov", "edu", "ac", "or", "ne"];

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use web_content_analyzer::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the registrable domain ("site") of a URL
///
/// This is the last two labels of the host, or the last three when the
/// second-level label is a common public suffix under a two-letter country code.
/// IP hosts are their own registrable domain.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use web_content_analyzer::url::registrable_domain;
///
/// let url = Url::parse("https://news.bbc.co.uk/world").unwrap();
/// assert_eq!(registrable_domain(&url), Some("bbc.co.uk".to_string()));
///
/// let url = Url::parse("https://docs.rs/tokio").unwrap();
/// assert_eq!(registrable_domain(&url), Some("docs.rs".to_string()));
/// ```
pub fn registrable_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
        Host::Domain(domain) => Some(site_of(&domain.to_lowercase())),
    }
}

fn site_of(host: &str) -> String {
    let host = host.trim_end_matches('.');
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host.to_string();
    }

    let n = labels.len();
    let tld = labels[n - 1];
    let second = labels[n - 2];
    let keep = if tld.len() == 2 && SECOND_LEVEL_SUFFIXES.contains(&second) {
        3
    } else {
        2
    };

    labels[n - keep..].join(".")
}
