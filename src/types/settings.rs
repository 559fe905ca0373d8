//! Analysis settings snapshot

use serde::{Deserialize, Serialize};

/// Read-only snapshot of the analysis configuration.
///
/// Taken fresh at the start of every analysis run; never cached across
/// invocations, so settings changes apply to the next run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// API key for the AI completion service. Absent or empty means the
    /// pipeline is not configured and analysis is a silent no-op.
    pub api_key: Option<String>,
    /// Model identifier submitted with each call
    pub model: String,
    /// Token budget per completion
    pub token_budget: u32,
    /// IANA time zone for user-facing formatting in the outer layers
    pub time_zone: String,
    /// Lower bound of the clinical target band (mg/dL)
    pub target_low: f64,
    /// Upper bound of the clinical target band (mg/dL)
    pub target_high: f64,
}

impl AnalysisSettings {
    /// Whether an AI call can be made at all.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            token_budget: 800,
            time_zone: "UTC".to_string(),
            target_low: 70.0,
            target_high: 180.0,
        }
    }
}
