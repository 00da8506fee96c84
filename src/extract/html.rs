//! HTML extractor
//!
//! Pulls the title, selected meta tags, h1-h3 headings, paragraph text, links and
//! images out of a parsed document. html5ever recovers from any markup error, so
//! this path always has a document root to work with.

use super::{clean_text, resolve_link, union_into, ExtractedContent};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use url::Url;

/// Meta `name` values copied into the record (plus every `og:*` property)
const META_NAMES: &[&str] = &["description", "keywords", "author"];

/// Elements whose text is never visible
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracts structured content from a parsed HTML document
///
/// Relative URLs are resolved against `<base href>` when present, otherwise
/// against `base_url`.
///
/// # Example
///
/// ```
/// use scraper::Html;
/// use url::Url;
/// use web_content_analyzer::extract::extract_html;
///
/// let html = Html::parse_document(
///     r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#,
/// );
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let content = extract_html(&html, &base_url);
/// assert_eq!(content.title, Some("Test".to_string()));
/// assert_eq!(content.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn extract_html(document: &Html, base_url: &Url) -> ExtractedContent {
    let base = effective_base(document, base_url);
    let meta = extract_meta(document);
    let title = extract_title(document).or_else(|| meta.get("og:title").cloned());

    ExtractedContent {
        title,
        headings: extract_headings(document),
        main_text: extract_main_text(document),
        links: extract_links(document, &base),
        images: extract_images(document, &base),
        meta,
    }
}

fn effective_base(document: &Html, base_url: &Url) -> Url {
    let Ok(selector) = Selector::parse("base[href]") else {
        return base_url.clone();
    };

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| base_url.join(href.trim()).ok())
        .unwrap_or_else(|| base_url.clone())
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| clean_text(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Collects description/keywords/author and `og:*` meta tags; first occurrence wins
fn extract_meta(document: &Html) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();
    let Ok(selector) = Selector::parse("meta[content]") else {
        return meta;
    };

    for element in document.select(&selector) {
        let value = element.value();
        let key = value
            .attr("property")
            .or_else(|| value.attr("name"))
            .map(|k| k.trim().to_ascii_lowercase());
        let Some(key) = key else { continue };

        if !(META_NAMES.contains(&key.as_str()) || key.starts_with("og:")) {
            continue;
        }

        let content = clean_text(value.attr("content").unwrap_or(""));
        if !content.is_empty() {
            meta.entry(key).or_insert(content);
        }
    }

    meta
}

fn extract_headings(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("h1, h2, h3") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|element| clean_text(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Paragraph text, one paragraph per line
///
/// Documents without any non-empty paragraph fall back to the visible text of
/// `<body>`.
fn extract_main_text(document: &Html) -> String {
    let paragraphs: Vec<String> = match Selector::parse("p") {
        Ok(selector) => document
            .select(&selector)
            .map(|element| clean_text(&element.text().collect::<String>()))
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    };

    if !paragraphs.is_empty() {
        return paragraphs.join("\n");
    }

    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    document
        .select(&body_selector)
        .next()
        .map(visible_text)
        .unwrap_or_default()
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut pieces = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            pieces.push(&**text);
        }
    }
    clean_text(&pieces.join(" "))
}

/// Extracts all `<a href>` targets as absolute http(s) URLs, deduplicated
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        let resolved = document
            .select(&a_selector)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| resolve_link(href, base_url))
            .collect();
        union_into(&mut links, resolved);
    }

    links
}

/// Extracts all `<img src>` targets as absolute http(s) URLs, deduplicated
fn extract_images(document: &Html, base_url: &Url) -> Vec<String> {
    let mut images = Vec::new();

    if let Ok(img_selector) = Selector::parse("img[src]") {
        let resolved = document
            .select(&img_selector)
            .filter_map(|element| element.value().attr("src"))
            .filter_map(|src| resolve_link(src, base_url))
            .collect();
        union_into(&mut images, resolved);
    }

    images
}
