//! Output module for rendering scrape results
//!
//! This module handles:
//! - JSON rendering (pretty or compact) of the full result record
//! - Markdown reports for terminal reading
//! - Writing a rendered report to a file

mod markdown;

pub use markdown::render_markdown;

use crate::pipeline::ScrapedContent;
use crate::Result;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!(
                "unknown output format '{}' (expected json or markdown)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Markdown => write!(f, "markdown"),
        }
    }
}

/// Serializes a scrape result as JSON
pub fn render_json(scraped: &ScrapedContent, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(scraped)?
    } else {
        serde_json::to_string(scraped)?
    };
    Ok(json)
}

/// Renders a scrape result in the requested format
pub fn render(scraped: &ScrapedContent, format: OutputFormat, pretty: bool) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(scraped, pretty),
        OutputFormat::Markdown => Ok(render_markdown(scraped)),
    }
}

/// Writes a rendered report to `path`, replacing any existing file
pub fn write_report(path: &Path, rendered: &str) -> Result<()> {
    std::fs::write(path, rendered)?;
    tracing::info!("Wrote report to {}", path.display());
    Ok(())
}
