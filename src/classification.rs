//! Classification tag extraction
//!
//! The AI model is instructed to lead its analysis with a structured
//! `[CLASSIFICATION: green|yellow|red]` tag. This module implements the
//! prefix protocol: the tag is recognized at the start of the string only,
//! and anything after it is preserved verbatim for downstream formatting.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::Classification;

/// Result of parsing raw AI output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnalysis {
    /// Analysis text with a recognized tag stripped, otherwise the
    /// original input unchanged
    pub text: String,
    pub classification: Option<Classification>,
}

/// Leading tag shape: optional leading whitespace, `[CLASSIFICATION: <word>]`
/// with flexible internal whitespace, then an optional single newline.
/// Case-insensitive on both the keyword and the value.
fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*\[\s*classification\s*:\s*(\w+)\s*\]\r?\n?")
            .expect("classification tag pattern is valid")
    })
}

/// Extract a leading classification tag from raw AI output.
///
/// - Empty input parses to empty text and no classification.
/// - A tag anywhere other than the start of the string is not recognized;
///   the full original text comes back unchanged with no classification.
/// - A syntactically valid tag with an unknown value (anything outside
///   green/yellow/red) is also "no match" - the original text comes back
///   unchanged rather than partially stripped.
/// - On match the tag and one trailing newline are stripped, the remaining
///   leading whitespace is trimmed, and the classification is normalized
///   to lowercase.
pub fn parse_classification(raw: &str) -> ParsedAnalysis {
    if raw.is_empty() {
        return ParsedAnalysis {
            text: String::new(),
            classification: None,
        };
    }

    if let Some(caps) = tag_regex().captures(raw) {
        let word = &caps[1];
        if let Ok(classification) = word.parse::<Classification>() {
            let tag_end = caps.get(0).map_or(0, |m| m.end());
            let remainder = raw[tag_end..].trim_start();
            return ParsedAnalysis {
                text: remainder.to_string(),
                classification: Some(classification),
            };
        }
    }

    ParsedAnalysis {
        text: raw.to_string(),
        classification: None,
    }
}
