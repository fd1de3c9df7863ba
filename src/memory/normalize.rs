//! Text normalization for memory deduplication
//!
//! The same exchange can arrive with different markdown decoration, spacing,
//! casing, or a trailing "Sources:" section. Normalization collapses those
//! variants to one canonical form so the derived memory key is stable.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

static SOURCES_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)sources?:").expect("valid sources regex"));

static MARKDOWN_MARKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_`~#>\\\-]+").expect("valid markdown regex"));

static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,!?;:])").expect("valid punctuation regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Drop everything from the first "Sources:" marker (case-insensitive)
/// onwards. Citation lists vary between otherwise identical responses.
pub fn strip_sources(text: &str) -> &str {
    match SOURCES_SECTION.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    }
}

/// Canonical form of a question or response: sources stripped, markdown
/// marks removed, whitespace collapsed, punctuation reattached, lowercased.
pub fn normalize_text(text: &str) -> String {
    let text = strip_sources(text);
    let text = MARKDOWN_MARKS.replace_all(text, "");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    text.trim().to_lowercase()
}

/// Deterministic identity of an exchange: SHA-256 over the normalized
/// question and response joined by a separator that cannot occur in either.
pub fn memory_key(question: &str, response: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(question).as_bytes());
    hasher.update(b"|||");
    hasher.update(normalize_text(response).as_bytes());
    hex::encode(hasher.finalize())
}
