//! Analysis pipeline types
//!
//! Classification tags, append-only history and usage records, and the
//! structured AI completion request/result pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EventStats;

/// Severity classification emitted by the AI model for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Green,
    Yellow,
    Red,
}

impl Classification {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Classification::Green => "green",
            Classification::Yellow => "yellow",
            Classification::Red => "red",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Classification {
    type Err = ();

    /// Case-insensitive. Anything outside green/yellow/red is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "green" => Ok(Classification::Green),
            "yellow" => Ok(Classification::Yellow),
            "red" => Ok(Classification::Red),
            _ => Err(()),
        }
    }
}

/// Append-only record of one successful or empty AI invocation tied to an
/// event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisHistoryRecord {
    pub event_id: i64,
    pub analysis: String,
    pub classification: Option<Classification>,
    pub created_at_utc: DateTime<Utc>,
    pub period_start_utc: DateTime<Utc>,
    pub period_end_utc: DateTime<Utc>,
    /// Why this invocation ran (e.g. "scheduled", "manual reprocess")
    pub reason: String,
    /// Stats snapshot at the moment of analysis
    pub stats: EventStats,
}

/// Append-only record of one AI call attempt, regardless of outcome.
///
/// Cost is deliberately not stored; it is recomputed on read from the
/// pricing table so that price corrections retroactively affect reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLogRecord {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub success: bool,
    pub http_status: u16,
    pub finish_reason: Option<String>,
    pub duration_ms: u64,
    pub created_at_utc: DateTime<Utc>,
    pub event_id: Option<i64>,
}

/// Outcome of one analysis run.
///
/// `NotConfigured` and `Empty` are normal outcomes, not errors, so callers
/// cannot mistake "no analysis produced" for "an error occurred". Failures
/// surface separately as `AnalysisError`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// Analysis produced, event updated and persisted
    Completed {
        analysis: String,
        classification: Option<Classification>,
    },
    /// The AI call succeeded but returned no usable content
    Empty,
    /// No API key configured; nothing was called or logged
    NotConfigured,
}

impl AnalysisOutcome {
    /// The cleaned analysis text, when one was produced.
    pub fn analysis_text(&self) -> Option<&str> {
        match self {
            AnalysisOutcome::Completed { analysis, .. } => Some(analysis),
            _ => None,
        }
    }
}

/// Parameters for one AI completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub max_tokens: u32,
}

/// Structured result of one AI completion call.
///
/// Non-2xx responses come back as a value with `success = false` rather
/// than an error, so the caller can still account for the attempt.
/// Transport failures (connection refused, timeout) are errors instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub content: Option<String>,
    /// Model identifier reported by the service (falls back to the
    /// requested model when the response carries none)
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub finish_reason: Option<String>,
    pub http_status: u16,
    pub success: bool,
    pub duration_ms: u64,
    pub error_message: Option<String>,
}

impl CompletionOutcome {
    /// Content with empty / whitespace-only responses normalized to `None`.
    pub fn usable_content(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
