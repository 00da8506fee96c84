//! Text normalization
//!
//! A fixed, pure pipeline applied to extracted main text:
//!
//! 1. lowercase
//! 2. strip every character that is neither a word character nor whitespace
//! 3. collapse whitespace runs to single spaces and trim
//! 4. optionally drop stopwords by whitespace-token filtering
//!
//! Steps 1-3 form a fixed point: normalizing already-normalized text returns it
//! unchanged.

mod stopwords;

pub use stopwords::{build_stopwords, DEFAULT_STOPWORDS};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("hardcoded regex pattern is valid"));

/// Both variants of a normalized text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedText {
    pub with_stopwords: String,

    /// Present only when stopword removal was requested and a set was supplied
    pub without_stopwords: Option<String>,
}

/// Normalizes text
///
/// # Arguments
///
/// * `text` - Raw text, usually `ExtractedContent::main_text`
/// * `stopwords` - Lowercase stopword set used for the second variant
/// * `remove_stopwords` - Whether to produce the stopword-free variant
///
/// # Example
///
/// ```
/// use web_content_analyzer::normalize::normalize;
///
/// let out = normalize("Hello,   World!", None, false);
/// assert_eq!(out.with_stopwords, "hello world");
/// assert!(out.without_stopwords.is_none());
/// ```
pub fn normalize(
    text: &str,
    stopwords: Option<&HashSet<String>>,
    remove_stopwords: bool,
) -> NormalizedText {
    let with_stopwords = canonical_form(text);

    let without_stopwords = match (remove_stopwords, stopwords) {
        (true, Some(set)) => Some(remove_stopword_tokens(&with_stopwords, set)),
        _ => None,
    };

    NormalizedText {
        with_stopwords,
        without_stopwords,
    }
}

/// Lowercase, strip punctuation, collapse whitespace
pub(crate) fn canonical_form(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn remove_stopword_tokens(text: &str, stopwords: &HashSet<String>) -> String {
    text.split_whitespace()
        .filter(|token| !stopwords.contains(*token))
        .collect::<Vec<_>>()
        .join(" ")
}
