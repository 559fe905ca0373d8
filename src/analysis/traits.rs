//! Collaborator interfaces consumed by the orchestrator
//!
//! The engine owns none of its I/O: persistence, the AI completion
//! service, notification fan-out, and settings retrieval are all supplied
//! behind these traits. Default implementations live in the `storage`,
//! `ai`, `notify`, and `config` modules; tests supply in-memory mocks.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::notify::NotifyTopic;
use crate::types::{
    AnalysisHistoryRecord, AnalysisSettings, CompletionOutcome, CompletionRequest, Event, Reading,
    UsageLogRecord,
};

/// Windowed access to the recorded reading stream.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// All readings with `start <= timestamp <= end`, in no guaranteed
    /// order.
    async fn readings_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>>;
}

/// Event persistence plus the append-only analysis history.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn load_event(&self, id: i64) -> Result<Option<Event>>;

    async fn save_event(&self, event: &Event) -> Result<()>;

    async fn append_history(&self, record: &AnalysisHistoryRecord) -> Result<()>;
}

/// Append-only usage accounting.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn append_usage_log(&self, record: &UsageLogRecord) -> Result<()>;
}

/// The external AI completion service.
///
/// A non-2xx response with a parseable body must come back as an `Ok`
/// outcome with `success = false` so the attempt can still be usage-logged;
/// only transport-level failures (no structured result at all) are errors.
#[async_trait]
pub trait AiClient: Send + Sync {
    async fn analyze(&self, api_key: &str, request: CompletionRequest)
        -> Result<CompletionOutcome>;
}

/// Fire-and-forget notification fan-out keyed by topic + count.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, topic: NotifyTopic, count: usize);
}

/// Read-only settings retrieval.
///
/// Called once per analysis run for a fresh snapshot; implementations must
/// not require the orchestrator to cache across invocations.
pub trait SettingsProvider: Send + Sync {
    fn current_analysis_settings(&self) -> Arc<AnalysisSettings>;
}
