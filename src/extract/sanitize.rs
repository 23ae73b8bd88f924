//! Text cleanup for extracted content
//!
//! Cleans text pulled out of feed entries and page markup: entity
//! decoding, whitespace normalization, and the hard length cut applied
//! to every excerpt.

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

static MULTI_NEWLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Sanitize extracted text content
///
/// Decodes HTML entities, normalizes horizontal whitespace, trims each
/// line, and collapses runs of blank lines.
pub fn sanitize_text(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);
    let normalized = normalize_whitespace(&decoded);
    let trimmed = trim_lines(&normalized);
    collapse_newlines(&trimmed).trim().to_string()
}

/// Normalize runs of spaces/tabs to a single space
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").to_string()
}

/// Trim whitespace from each line, preserving line structure
pub fn trim_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse 3+ consecutive newlines to 2
pub fn collapse_newlines(text: &str) -> String {
    MULTI_NEWLINE_REGEX.replace_all(text, "\n\n").to_string()
}

/// Check if text contains meaningful content
pub fn has_content(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Hard cut at `max_chars` characters
///
/// No ellipsis, no summarizing; the clipped excerpt is raw material for
/// the summarization stage.
pub fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
