//! Analysis orchestration state machine
//!
//! Runs one event through the full lifecycle: settings snapshot → windowed
//! readings → stats → AI call → usage accounting → tag parsing → event
//! update + history append → notifications. Usage accounting is never lost
//! once the AI client returns a structured result, even when the analysis
//! itself yields nothing.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::locks::EventLockMap;
use super::prompts;
use super::traits::{AiClient, EventStore, Notifier, ReadingStore, SettingsProvider, UsageStore};
use crate::classification::{parse_classification, ParsedAnalysis};
use crate::notify::NotifyTopic;
use crate::stats::compute_event_stats;
use crate::types::{
    AnalysisHistoryRecord, AnalysisOutcome, CompletionOutcome, CompletionRequest, Event,
    EventStats, UsageLogRecord,
};

// ============================================================================
// Errors
// ============================================================================

/// Failures surfaced to the caller. Retry/backoff policy is the caller's
/// responsibility; this component never retries.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("event {0} not found")]
    EventNotFound(i64),
    /// Transport-level AI failure: no structured result, so no usage row
    /// was written for the attempt.
    #[error("AI request failed: {0}")]
    Upstream(#[source] anyhow::Error),
    /// Structured AI failure (non-2xx). The attempt was usage-logged
    /// before this was raised.
    #[error("AI service returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },
    /// Storage failure. Token spend already logged is not rolled back;
    /// the cost was real regardless of the local write.
    #[error("storage operation failed: {0}")]
    Persistence(#[source] anyhow::Error),
    #[error("analysis cancelled")]
    Cancelled,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Orchestrates the analysis lifecycle for one event at a time.
///
/// Concurrent invocations for the same event id are serialized internally
/// (single flight per id); invocations for different ids proceed in
/// parallel.
pub struct AnalysisOrchestrator {
    readings: Arc<dyn ReadingStore>,
    events: Arc<dyn EventStore>,
    usage: Arc<dyn UsageStore>,
    ai: Arc<dyn AiClient>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<dyn SettingsProvider>,
    locks: EventLockMap,
}

impl AnalysisOrchestrator {
    pub fn new(
        readings: Arc<dyn ReadingStore>,
        events: Arc<dyn EventStore>,
        usage: Arc<dyn UsageStore>,
        ai: Arc<dyn AiClient>,
        notifier: Arc<dyn Notifier>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            readings,
            events,
            usage,
            ai,
            notifier,
            settings,
            locks: EventLockMap::new(),
        }
    }

    /// Run one event through the analysis lifecycle.
    ///
    /// Not configured is a zero-cost short circuit: no AI call, no usage
    /// row. An empty AI result is usage-logged but leaves the event
    /// untouched. A produced analysis updates the event (as a new value),
    /// appends a history record, and fires `events-updated` then
    /// `usage-updated`, in that order, after persistence succeeds.
    ///
    /// Cancellation is honored up to the point the event update sequence
    /// begins; from there the mutation + history + notify run to
    /// completion or not at all. A usage row already written stays.
    pub async fn analyze_event(
        &self,
        event_id: i64,
        reason: &str,
        model_override: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        // Fresh snapshot per run; settings changes apply to the next call
        let settings = self.settings.current_analysis_settings();
        if !settings.is_configured() {
            debug!(event_id, "Analysis skipped: no API key configured");
            return Ok(AnalysisOutcome::NotConfigured);
        }
        let api_key = settings.api_key.clone().unwrap_or_default();

        // Single flight: a scheduled run and a manual reprocess for the
        // same event serialize here
        let _guard = self.locks.acquire(event_id).await;

        let event = cancellable(cancel, self.events.load_event(event_id))
            .await?
            .map_err(AnalysisError::Persistence)?
            .ok_or(AnalysisError::EventNotFound(event_id))?;

        let readings = cancellable(
            cancel,
            self.readings
                .readings_in_window(event.period_start_utc, event.period_end_utc),
        )
        .await?
        .map_err(AnalysisError::Persistence)?;

        let stats = compute_event_stats(&readings, event.event_timestamp_utc);
        debug!(
            event_id,
            reading_count = stats.reading_count,
            "Event stats computed"
        );

        let model = model_override.map_or_else(|| settings.model.clone(), str::to_string);
        let request = CompletionRequest {
            system_prompt: prompts::SYSTEM_PROMPT.to_string(),
            user_prompt: prompts::build_user_prompt(&event, &stats),
            model,
            max_tokens: settings.token_budget,
        };

        let outcome = cancellable(cancel, self.ai.analyze(&api_key, request))
            .await?
            .map_err(AnalysisError::Upstream)?;

        // A structured result exists: account for the attempt regardless
        // of what it contains
        let usage = usage_record_from(&outcome, event_id);
        self.usage
            .append_usage_log(&usage)
            .await
            .map_err(AnalysisError::Persistence)?;

        if !outcome.success {
            warn!(
                event_id,
                status = outcome.http_status,
                "AI call reported failure"
            );
            return Err(AnalysisError::UpstreamStatus {
                status: outcome.http_status,
                message: outcome
                    .error_message
                    .unwrap_or_else(|| "unknown upstream error".to_string()),
            });
        }

        let Some(content) = outcome.usable_content() else {
            info!(event_id, "AI returned empty content; event untouched");
            self.notifier.notify(NotifyTopic::UsageUpdated, 1).await;
            return Ok(AnalysisOutcome::Empty);
        };

        let parsed = parse_classification(content);

        // Last cancellation checkpoint: the update sequence below is
        // all-or-nothing
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let now = Utc::now();
        let updated = apply_analysis(&event, &stats, &parsed, now);

        let history = AnalysisHistoryRecord {
            event_id,
            analysis: parsed.text.clone(),
            classification: parsed.classification,
            created_at_utc: now,
            period_start_utc: event.period_start_utc,
            period_end_utc: event.period_end_utc,
            reason: reason.to_string(),
            stats,
        };
        self.events
            .append_history(&history)
            .await
            .map_err(AnalysisError::Persistence)?;
        self.events
            .save_event(&updated)
            .await
            .map_err(AnalysisError::Persistence)?;

        // Ordering is significant: events-updated, then usage-updated
        self.notifier.notify(NotifyTopic::EventsUpdated, 1).await;
        self.notifier.notify(NotifyTopic::UsageUpdated, 1).await;

        info!(
            event_id,
            classification = ?parsed.classification,
            "Event analysis persisted"
        );

        Ok(AnalysisOutcome::Completed {
            analysis: parsed.text,
            classification: parsed.classification,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Race a collaborator call against cancellation.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, AnalysisError> {
    tokio::select! {
        () = cancel.cancelled() => Err(AnalysisError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Produce the updated event value. Stats that could not be computed
/// (e.g. zero readings in the window) fall back to the previously stored
/// values; the period boundaries never change.
fn apply_analysis(
    event: &Event,
    stats: &EventStats,
    parsed: &ParsedAnalysis,
    now: DateTime<Utc>,
) -> Event {
    Event {
        glucose_at_event: stats.glucose_at_event.or(event.glucose_at_event),
        min: stats.min.or(event.min),
        max: stats.max.or(event.max),
        avg: stats.avg.or(event.avg),
        spike: stats.spike.or(event.spike),
        peak_time_utc: stats.peak_time_utc.or(event.peak_time_utc),
        reading_count: if stats.is_empty() {
            event.reading_count
        } else {
            stats.reading_count
        },
        ai_analysis: Some(parsed.text.clone()),
        ai_classification: parsed.classification,
        is_processed: true,
        processed_at_utc: Some(now),
        ..event.clone()
    }
}

fn usage_record_from(outcome: &CompletionOutcome, event_id: i64) -> UsageLogRecord {
    UsageLogRecord {
        model: outcome.model.clone(),
        input_tokens: outcome.input_tokens,
        output_tokens: outcome.output_tokens,
        total_tokens: outcome.total_tokens,
        success: outcome.success,
        http_status: outcome.http_status,
        finish_reason: outcome.finish_reason.clone(),
        duration_ms: outcome.duration_ms,
        created_at_utc: Utc::now(),
        event_id: Some(event_id),
    }
}
