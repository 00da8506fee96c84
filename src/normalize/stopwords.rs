use super::canonical_form;
use std::collections::HashSet;

/// Built-in English stopwords, already in normalized form
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "dont", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "there", "these", "they", "this", "those", "through", "to",
    "too", "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Builds the stopword set used by [`super::normalize`]
///
/// Extra words go through the same canonical form as the text they are matched
/// against, so `"Don't"` filters the token `dont`. Entries that normalize to
/// nothing are dropped.
pub fn build_stopwords(use_defaults: bool, extra: &[String]) -> HashSet<String> {
    let defaults = DEFAULT_STOPWORDS
        .iter()
        .filter(|_| use_defaults)
        .map(|w| w.to_string());

    let extras = extra
        .iter()
        .map(|w| canonical_form(w))
        .filter(|w| !w.is_empty());

    defaults.chain(extras).collect()
}
