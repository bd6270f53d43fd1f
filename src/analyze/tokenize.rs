//! Tokenizer / normalizer shared by every analyzer.
//!
//! Normalization: HTML entities decoded, typographic quotes folded to ASCII,
//! Unicode lower-case, whitespace collapsed. Tokens keep inner apostrophes and
//! hyphens so `can't` and `well-organized` survive as one token.

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:['-][\p{L}\p{N}]+)*").expect("tokenizer regex")
});

/// Lower-cased, whitespace-collapsed form used for phrase matching.
pub fn normalize(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);
    let folded = decoded
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"");
    folded
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered, lower-cased tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    tokenize_normalized(&normalize(text))
}

/// Tokenize text that already went through [`normalize`].
pub fn tokenize_normalized(normalized: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Cache key: trimmed + lower-cased input, before tokenization.
pub fn cache_key(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Split on sentence punctuation, dropping blank pieces.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Byte spans of `phrase` inside `text` that sit on word boundaries.
pub fn phrase_spans(text: &str, phrase: &str) -> Vec<(usize, usize)> {
    if phrase.is_empty() {
        return Vec::new();
    }
    text.match_indices(phrase)
        .filter_map(|(start, m)| {
            let end = start + m.len();
            let before_ok = text[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
            let after_ok = text[end..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric());
            (before_ok && after_ok).then_some((start, end))
        })
        .collect()
}

/// Word-boundary aware containment.
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    !phrase_spans(text, phrase).is_empty()
}

/// Short anonymized id for log lines; raw comment text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
