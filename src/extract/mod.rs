//! Content extraction
//!
//! Turns a fetched payload into an [`ExtractedContent`] record. The payload is
//! classified once into a [`Document`] (HTML or RSS/Atom feed) and each variant is
//! handled by its own extractor. Extraction never fails: malformed markup degrades
//! to whatever could be recovered, possibly an empty record.

mod feed;
mod html;

pub use feed::{parse_feed, FeedDocument, FeedEntry};
pub use html::extract_html;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use url::Url;

/// How many leading bytes are sniffed for feed markers
const SNIFF_BYTES: usize = 2048;

const FEED_CONTENT_TYPES: &[&str] = &[
    "application/rss+xml",
    "application/atom+xml",
    "application/rdf+xml",
    "application/feed+xml",
];

const FEED_MARKERS: &[&str] = &["<rss", "<feed", "<entry", "<rdf:rdf"];

/// Structured content extracted from one page (or merged from several)
///
/// `links` and `images` only ever hold absolute http(s) URLs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub meta: BTreeMap<String, String>,
    pub headings: Vec<String>,
    pub main_text: String,
    pub links: Vec<String>,
    pub images: Vec<String>,
}

impl ExtractedContent {
    /// True when neither a title nor any main text was found
    pub fn is_empty(&self) -> bool {
        self.title.as_deref().map_or(true, |t| t.trim().is_empty())
            && self.main_text.trim().is_empty()
    }

    /// Folds a child page into this record
    ///
    /// Child text is appended after a blank line, child headings are appended in
    /// order, and links/images are unioned keeping first-seen order. Title and
    /// meta stay those of the receiver.
    pub fn merge(&mut self, child: ExtractedContent) {
        let text = child.main_text.trim();
        if !text.is_empty() {
            if self.main_text.trim().is_empty() {
                self.main_text = text.to_string();
            } else {
                self.main_text.push_str("\n\n");
                self.main_text.push_str(text);
            }
        }

        self.headings.extend(child.headings);
        union_into(&mut self.links, child.links);
        union_into(&mut self.images, child.images);
    }
}

/// A payload classified by its format
pub enum Document {
    Html(scraper::Html),
    Feed(FeedDocument),
}

impl Document {
    /// Classifies and parses a payload
    ///
    /// Payloads that look like feeds but cannot be recovered as one are parsed as
    /// HTML instead.
    pub fn parse(text: &str, content_type: &str) -> Self {
        if is_feed(content_type, text.as_bytes()) {
            if let Some(feed) = parse_feed(text) {
                return Self::Feed(feed);
            }
            tracing::debug!("Payload looked like a feed but no feed root was found");
        }
        Self::Html(scraper::Html::parse_document(text))
    }
}

/// Extracts structured content from a fetched body
///
/// # Arguments
///
/// * `body` - Raw response bytes (decoded as UTF-8, lossily)
/// * `base_url` - Final URL of the page, used to resolve relative links
/// * `content_type` - Media type reported by the server
pub fn extract(body: &[u8], base_url: &Url, content_type: &str) -> ExtractedContent {
    let text = String::from_utf8_lossy(body);
    match Document::parse(&text, content_type) {
        Document::Html(document) => extract_html(&document, base_url),
        Document::Feed(feed) => feed.into_content(base_url),
    }
}

/// Decides whether a payload should go down the feed path
pub fn is_feed(content_type: &str, body: &[u8]) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if FEED_CONTENT_TYPES.contains(&media_type.as_str()) {
        return true;
    }

    let head = &body[..body.len().min(SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    FEED_MARKERS.iter().any(|marker| head.contains(marker))
}

/// Collapses runs of whitespace into single spaces and trims
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves a link href against a base, keeping only http(s) targets
///
/// Returns None for empty hrefs, fragment-only anchors, `javascript:`, `mailto:`,
/// `tel:` and `data:` pseudo-links, and anything that does not resolve. The
/// fragment of the resolved URL is dropped.
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute.to_string())
}

/// Appends items not already present, keeping first-seen order
pub(crate) fn union_into(target: &mut Vec<String>, items: Vec<String>) {
    let mut seen: HashSet<String> = target.iter().cloned().collect();
    for item in items {
        if seen.insert(item.clone()) {
            target.push(item);
        }
    }
}
