//! Markdown report generation
//!
//! Renders a [`ScrapedContent`] as a human-readable report: metadata, crawl
//! statistics, warnings, extracted structure and the analysis, if any.

use crate::pipeline::{ScrapeStatus, ScrapedContent};

/// Links and images listed before the report switches to a count
const MAX_LISTED_URLS: usize = 50;

/// Formats a scrape result as markdown
///
/// # Arguments
///
/// * `scraped` - The scrape result
///
/// # Returns
///
/// A formatted markdown string
pub fn render_markdown(scraped: &ScrapedContent) -> String {
    let mut md = String::new();
    let content = &scraped.content;

    // Title
    let title = content.title.as_deref().unwrap_or("Untitled page");
    md.push_str(&format!("# {}\n\n", escape_inline(title)));

    // Scrape metadata
    md.push_str("## Scrape Information\n\n");
    md.push_str(&format!("- **URL**: {}\n", scraped.url));
    if scraped.final_url != scraped.url {
        md.push_str(&format!("- **Final URL**: {}\n", scraped.final_url));
    }
    md.push_str(&format!("- **Content Type**: {}\n", scraped.content_type));
    let status = match scraped.status {
        ScrapeStatus::Complete => "complete",
        ScrapeStatus::Partial => "partial",
    };
    md.push_str(&format!("- **Status**: {}\n", status));
    md.push_str(&format!(
        "- **Scraped At**: {}\n\n",
        scraped.scraped_at.to_rfc3339()
    ));

    if !scraped.warnings.is_empty() {
        md.push_str("## Warnings\n\n");
        for warning in &scraped.warnings {
            md.push_str(&format!("- {}\n", warning));
        }
        md.push('\n');
    }

    // Crawl statistics
    let crawl = &scraped.crawl;
    md.push_str("## Crawl Statistics\n\n");
    md.push_str(&format!("- **Pages Visited**: {}\n", crawl.visited.len()));
    md.push_str(&format!("- **Pages Merged**: {}\n", crawl.pages_merged));
    md.push_str(&format!("- **Pages Failed**: {}\n", crawl.failures.len()));
    if crawl.duplicates_skipped > 0 {
        md.push_str(&format!(
            "- **Duplicates Skipped**: {}\n",
            crawl.duplicates_skipped
        ));
    }
    if crawl.robots_denied > 0 {
        md.push_str(&format!("- **Denied by robots.txt**: {}\n", crawl.robots_denied));
    }
    md.push_str(&format!("- **Bytes Fetched**: {}\n", crawl.total_bytes));
    md.push_str(&format!("- **Deepest Level**: {}\n\n", crawl.max_depth_reached));

    if crawl.visited.len() > 1 {
        md.push_str("### Visited Pages\n\n");
        for url in &crawl.visited {
            md.push_str(&format!("- {}\n", url));
        }
        md.push('\n');
    }

    if !crawl.failures.is_empty() {
        md.push_str("### Failed Pages\n\n");
        md.push_str("| URL | Reason |\n");
        md.push_str("|-----|--------|\n");
        for failure in &crawl.failures {
            md.push_str(&format!(
                "| {} | {} |\n",
                escape_cell(&failure.url),
                escape_cell(&failure.reason)
            ));
        }
        md.push('\n');
    }

    if !content.meta.is_empty() {
        md.push_str("## Metadata\n\n");
        md.push_str("| Key | Value |\n");
        md.push_str("|-----|-------|\n");
        for (key, value) in &content.meta {
            md.push_str(&format!("| {} | {} |\n", escape_cell(key), escape_cell(value)));
        }
        md.push('\n');
    }

    if !content.headings.is_empty() {
        md.push_str("## Headings\n\n");
        for heading in &content.headings {
            md.push_str(&format!("- {}\n", escape_inline(heading)));
        }
        md.push('\n');
    }

    if let Some(analysis) = &scraped.analysis {
        md.push_str("## Analysis\n\n");
        let json = serde_json::to_string_pretty(analysis).unwrap_or_else(|_| "{}".to_string());
        md.push_str(&format!("```json\n{}\n```\n\n", json));
    }

    md.push_str("## Content\n\n");
    if content.main_text.trim().is_empty() {
        md.push_str("_No text content found._\n\n");
    } else {
        for paragraph in content.main_text.split('\n').filter(|p| !p.trim().is_empty()) {
            md.push_str(paragraph.trim());
            md.push_str("\n\n");
        }
    }

    push_url_list(&mut md, "Links", &content.links);
    push_url_list(&mut md, "Images", &content.images);

    md
}

fn push_url_list(md: &mut String, heading: &str, urls: &[String]) {
    if urls.is_empty() {
        return;
    }

    md.push_str(&format!("## {} ({})\n\n", heading, urls.len()));
    for url in urls.iter().take(MAX_LISTED_URLS) {
        md.push_str(&format!("- <{}>\n", url));
    }
    if urls.len() > MAX_LISTED_URLS {
        md.push_str(&format!("- … {} more\n", urls.len() - MAX_LISTED_URLS));
    }
    md.push('\n');
}

fn escape_inline(text: &str) -> String {
    text.replace('\n', " ")
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
