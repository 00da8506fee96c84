//! Prompt construction and input budgeting

use crate::config::AnalysisConfig;
use crate::extract::ExtractedContent;
use serde_json::Value;

/// Rough characters-per-token ratio used for budgeting
const CHARS_PER_TOKEN: usize = 4;

/// Headings included in the user prompt
const MAX_PROMPT_HEADINGS: usize = 30;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You analyze web page content. Respond with a single JSON \
object and nothing else. Include a short \"summary\", a list of \"topics\", the overall \
\"sentiment\" (positive, neutral or negative) and a \"content_type\" classification \
(article, product, listing, documentation, forum, feed or other).";

/// Estimated token count of a text
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Longest prefix of `text` estimated to fit `tokens`, cut at a char boundary
pub fn truncate_to_tokens(text: &str, tokens: usize) -> &str {
    let max_chars = tokens.saturating_mul(CHARS_PER_TOKEN);
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Cuts the user prompt so that system + user fit `max_input_tokens`
///
/// The system prompt is never cut; if it alone exceeds the budget the user
/// prompt is emptied.
pub fn fit_to_budget<'a>(system: &str, user: &'a str, max_input_tokens: usize) -> &'a str {
    let remaining = max_input_tokens.saturating_sub(estimate_tokens(system));
    let fitted = truncate_to_tokens(user, remaining);
    if fitted.len() < user.len() {
        tracing::debug!(
            "Truncated analysis input from ~{} to ~{} tokens",
            estimate_tokens(user),
            estimate_tokens(fitted)
        );
    }
    fitted
}

/// Builds the system prompt: the configured override or the default, plus the schema
pub fn build_system_prompt(config: &AnalysisConfig) -> String {
    let base = config
        .system_prompt
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    match config.schema.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(schema) => format!(
            "{}\n\nThe JSON object must conform to this JSON schema:\n{}",
            base, schema
        ),
        None => base.to_string(),
    }
}

/// Builds the user prompt from the page URL and its extracted content
pub fn build_user_prompt(url: &str, content: &ExtractedContent) -> String {
    let mut prompt = format!("URL: {}\n", url);

    if let Some(title) = &content.title {
        prompt.push_str(&format!("Title: {}\n", title));
    }
    if let Some(description) = content.meta.get("description") {
        prompt.push_str(&format!("Description: {}\n", description));
    }
    if !content.headings.is_empty() {
        prompt.push_str("Headings:\n");
        for heading in content.headings.iter().take(MAX_PROMPT_HEADINGS) {
            prompt.push_str(&format!("- {}\n", heading));
        }
    }

    prompt.push_str("\nContent:\n");
    prompt.push_str(&content.main_text);
    prompt
}

/// Keys listed in the schema's top-level `required` array
pub fn required_keys(schema: &Value) -> Vec<String> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|keys| {
            keys.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
