//! RSS/Atom extractor
//!
//! Reads RSS 2.0, RSS 1.0 (RDF) and Atom documents with a streaming XML reader.
//! A strict pass is tried first; if it errors out or finds no feed root the
//! document is re-read with end-tag checking disabled so that sloppy feeds still
//! yield what they can.

use super::{clean_text, resolve_link, union_into, ExtractedContent};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use url::Url;

const ROOT_ELEMENTS: &[&str] = &["rss", "feed", "RDF", "entry"];
const ENTRY_ELEMENTS: &[&str] = &["item", "entry"];
const CHANNEL_ELEMENTS: &[&str] = &["channel", "feed"];

/// Elements whose text content is captured
const TEXT_FIELDS: &[&str] = &[
    "title",
    "link",
    "description",
    "summary",
    "content",
    "encoded",
    "subtitle",
    "language",
];

/// One feed item/entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub link: Option<String>,
    pub images: Vec<String>,
}

/// A parsed RSS or Atom document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedDocument {
    pub title: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub entries: Vec<FeedEntry>,
}

impl FeedDocument {
    /// Maps the feed onto the common content record
    ///
    /// The channel title becomes the title, entry titles become headings, entry
    /// summaries (falling back to full content) are concatenated into the main
    /// text, and entry links and enclosure images are resolved against `base_url`.
    pub fn into_content(self, base_url: &Url) -> ExtractedContent {
        let mut meta = BTreeMap::new();
        if let Some(description) = self.description {
            meta.insert("description".to_string(), description);
        }
        if let Some(language) = self.language {
            meta.insert("language".to_string(), language);
        }

        let mut headings = Vec::new();
        let mut texts = Vec::new();
        let mut links = Vec::new();
        let mut images = Vec::new();

        for entry in self.entries {
            if let Some(title) = entry.title.filter(|t| !t.is_empty()) {
                headings.push(title);
            }
            if let Some(text) = entry.summary.or(entry.content) {
                let text = strip_markup(&text);
                if !text.is_empty() {
                    texts.push(text);
                }
            }
            if let Some(link) = entry.link.and_then(|l| resolve_link(&l, base_url)) {
                union_into(&mut links, vec![link]);
            }
            let resolved = entry
                .images
                .iter()
                .filter_map(|src| resolve_link(src, base_url))
                .collect();
            union_into(&mut images, resolved);
        }

        ExtractedContent {
            title: self.title.filter(|t| !t.is_empty()),
            meta,
            headings,
            main_text: texts.join("\n"),
            links,
            images,
        }
    }
}

/// Parses a feed document, strictly first and leniently second
///
/// Returns None when neither pass finds a feed root carrying a title or entries.
pub fn parse_feed(text: &str) -> Option<FeedDocument> {
    match read_feed(text, false) {
        Ok(Some(feed)) => return Some(feed),
        Ok(None) => {}
        Err(e) => tracing::debug!("Strict feed parse failed, retrying leniently: {}", e),
    }

    read_feed(text, true).ok().flatten()
}

fn read_feed(text: &str, lenient: bool) -> Result<Option<FeedDocument>, quick_xml::Error> {
    let mut reader = Reader::from_str(text);
    {
        let config = reader.config_mut();
        config.trim_text(true);
        config.check_end_names = !lenient;
        config.allow_unmatched_ends = lenient;
    }

    let mut feed = FeedDocument::default();
    let mut stack: Vec<String> = Vec::new();
    let mut entry: Option<FeedEntry> = None;
    let mut buffer = String::new();
    let mut root_seen = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) if lenient => {
                tracing::debug!("Lenient feed parse stopped early: {}", e);
                break;
            }
            Err(e) => return Err(e),
        };

        match event {
            Event::Start(start) => {
                let name = local_name(&start);
                if stack.is_empty() && ROOT_ELEMENTS.contains(&name.as_str()) {
                    root_seen = true;
                }
                if ENTRY_ELEMENTS.contains(&name.as_str()) {
                    entry = Some(FeedEntry::default());
                }
                if let Some(current) = entry.as_mut() {
                    collect_attributes(&start, &name, current);
                }
                if TEXT_FIELDS.contains(&name.as_str()) {
                    buffer.clear();
                }
                stack.push(name);
            }
            Event::Empty(start) => {
                let name = local_name(&start);
                if let Some(current) = entry.as_mut() {
                    collect_attributes(&start, &name, current);
                }
            }
            Event::Text(text) => {
                let decoded = text
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                push_text(&mut buffer, &decoded);
            }
            Event::CData(data) => {
                push_text(&mut buffer, &String::from_utf8_lossy(&data));
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.local_name().as_ref()).into_owned();
                pop_until(&mut stack, &name);
                let parent = stack.last().map(String::as_str);

                if ENTRY_ELEMENTS.contains(&name.as_str()) {
                    if let Some(finished) = entry.take() {
                        feed.entries.push(finished);
                    }
                } else if TEXT_FIELDS.contains(&name.as_str()) {
                    let value = clean_text(&buffer);
                    buffer.clear();
                    assign_field(&mut feed, entry.as_mut(), &name, parent, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let recovered = root_seen && (feed.title.is_some() || !feed.entries.is_empty());
    Ok(recovered.then_some(feed))
}

fn assign_field(
    feed: &mut FeedDocument,
    entry: Option<&mut FeedEntry>,
    name: &str,
    parent: Option<&str>,
    value: String,
) {
    if value.is_empty() {
        return;
    }

    if let Some(entry) = entry {
        let slot = match name {
            "title" => &mut entry.title,
            "link" => &mut entry.link,
            "description" | "summary" => &mut entry.summary,
            "content" | "encoded" => &mut entry.content,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
        return;
    }

    // Channel-level fields only count when directly under the channel/feed element
    if !parent.is_some_and(|p| CHANNEL_ELEMENTS.contains(&p)) {
        return;
    }
    let slot = match name {
        "title" => &mut feed.title,
        "description" | "subtitle" => &mut feed.description,
        "language" => &mut feed.language,
        _ => return,
    };
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// Picks up attribute-carried data: Atom `<link href>`, RSS `<enclosure>` and
/// Media RSS images
fn collect_attributes(start: &BytesStart<'_>, name: &str, entry: &mut FeedEntry) {
    let attr = |key: &str| -> Option<String> {
        start
            .attributes()
            .flatten()
            .find(|a| a.key.local_name().as_ref() == key.as_bytes())
            .and_then(|a| a.unescape_value().ok().map(|v| v.trim().to_string()))
    };

    match name {
        "link" => {
            let rel = attr("rel");
            if rel.as_deref().map_or(true, |r| r == "alternate") && entry.link.is_none() {
                entry.link = attr("href");
            }
        }
        "enclosure" => {
            let is_image = attr("type").is_some_and(|t| t.starts_with("image/"));
            if let (true, Some(url)) = (is_image, attr("url")) {
                entry.images.push(url);
            }
        }
        "thumbnail" => {
            if let Some(url) = attr("url") {
                entry.images.push(url);
            }
        }
        "content" => {
            let is_image = attr("medium").is_some_and(|m| m == "image")
                || attr("type").is_some_and(|t| t.starts_with("image/"));
            if let (true, Some(url)) = (is_image, attr("url")) {
                entry.images.push(url);
            }
        }
        _ => {}
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn push_text(buffer: &mut String, text: &str) {
    if !buffer.is_empty() {
        buffer.push(' ');
    }
    buffer.push_str(text);
}

/// Pops the stack down to (and including) the innermost `name`; an end tag with
/// no matching open element leaves the stack untouched
fn pop_until(stack: &mut Vec<String>, name: &str) {
    if let Some(pos) = stack.iter().rposition(|open| open == name) {
        stack.truncate(pos);
    }
}

/// Reduces HTML-bearing summaries to their text
fn strip_markup(text: &str) -> String {
    if !text.contains('<') {
        return clean_text(text);
    }
    let fragment = scraper::Html::parse_fragment(text);
    let pieces: Vec<&str> = fragment.root_element().text().collect();
    clean_text(&pieces.join(" "))
}
