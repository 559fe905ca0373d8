//! Prompt construction for event analysis
//!
//! Builds the system and user prompts submitted with each AI call. The
//! model is instructed to lead with the classification tag so the prefix
//! protocol in `classification` can extract it.

use crate::types::{Event, EventStats};

/// System prompt: role, output contract, tag protocol.
pub const SYSTEM_PROMPT: &str = "You are a glucose analysis assistant reviewing continuous glucose \
monitor data around a single logged event (a meal or activity). \
Assess the glycemic response and give the user practical, encouraging feedback.

Reply format:
Start your reply with exactly one tag on its own line:
[CLASSIFICATION: green] - stable response, stayed near range
[CLASSIFICATION: yellow] - moderate rise or time above range
[CLASSIFICATION: red] - large spike or sustained high/low glucose
Then 2-4 short sentences of analysis. No other preamble.";

fn fmt_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"))
}

/// Build the user prompt from the event content and its fresh stats.
pub fn build_user_prompt(event: &Event, stats: &EventStats) -> String {
    let window_minutes = (event.period_end_utc - event.period_start_utc).num_minutes();

    format!(
        r#"Event: {}
Logged at: {} (UTC)
Observation window: {} minutes ({} readings)

Glucose data (mg/dL):
- At event: {}
- Min: {}  Max: {}  Avg: {}
- Rise to post-event peak: {}
- Peak at: {}

Analyze this event's glycemic response."#,
        event.description,
        event.event_timestamp_utc.format("%Y-%m-%d %H:%M"),
        window_minutes,
        stats.reading_count,
        fmt_stat(stats.glucose_at_event),
        fmt_stat(stats.min),
        fmt_stat(stats.max),
        fmt_stat(stats.avg),
        fmt_stat(stats.spike),
        stats
            .peak_time_utc
            .map_or_else(|| "n/a".to_string(), |t| t.format("%H:%M").to_string()),
    )
}
