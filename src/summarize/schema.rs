//! Structured summary payload and validation
//!
//! The provider is asked for strict JSON with six named keys, of which
//! `key_quotes` may be absent. Validation is the engine's job; the store
//! persists the payload opaquely.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Structured summary attached to a summarized item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub eli5: String,
    pub eli16: String,
    pub why_this_matters: String,
    pub what_changed: String,

    /// Notable quotes; optional and may be absent entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_quotes: Option<Vec<String>>,

    pub confidence_unknowns: String,
}

impl Summary {
    /// All required fields populated with non-empty values
    pub fn is_complete(&self) -> bool {
        !self.eli5.trim().is_empty()
            && !self.eli16.trim().is_empty()
            && !self.why_this_matters.trim().is_empty()
            && !self.what_changed.trim().is_empty()
            && !self.confidence_unknowns.trim().is_empty()
    }
}

/// Closing suffixes tried when a completion looks like truncated JSON
const REPAIR_SUFFIXES: &[&str] = &["\"}", "\"\n}", "\"]}", "\"]\n}", "]}", "\n}", "}"];

/// Parse a model completion as a validated summary
///
/// Strips markdown code fences, then tries a direct parse, then retries
/// with each truncation-closing suffix. Returns None when nothing
/// validates; the caller decides whether to issue the corrective
/// re-prompt.
pub fn parse_summary(text: &str) -> Option<Summary> {
    let text = strip_code_fences(text.trim());

    if let Some(summary) = try_parse(&text) {
        return Some(summary);
    }

    for suffix in REPAIR_SUFFIXES {
        if let Some(summary) = try_parse(&format!("{text}{suffix}")) {
            debug!("Repaired truncated summary JSON");
            return Some(summary);
        }
    }

    None
}

fn try_parse(text: &str) -> Option<Summary> {
    let summary: Summary = serde_json::from_str(text).ok()?;
    summary.is_complete().then_some(summary)
}

/// Drop markdown fence lines, keeping whatever is between them
fn strip_code_fences(text: &str) -> String {
    if !text.contains("```") {
        return text.to_string();
    }

    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
