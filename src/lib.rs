//! Glucolens: Glucose Statistics & Analysis Orchestration
//!
//! Ingests a stream of timestamped glucose readings and discrete events
//! (meals, activities), computes deterministic statistics relating the two,
//! and orchestrates an idempotent, failure-tolerant pipeline that derives
//! an AI classification/analysis per event with full usage-cost accounting.
//!
//! ## Architecture
//!
//! - **Stats Engine**: pure event-relative and period-relative statistics
//! - **Classification Parser**: leading `[CLASSIFICATION: ...]` tag protocol
//! - **Pricing**: immutable price table, cost recomputed on read
//! - **Analysis Orchestrator**: ties stats + parser + AI client + storage +
//!   notifications together, single-flight per event id
//!
//! Persistence, the AI service, notification fan-out, and settings are
//! consumed behind traits; sled/reqwest/broadcast/arc-swap adapters ship
//! in the corresponding modules.

pub mod ai;
pub mod analysis;
pub mod classification;
pub mod config;
pub mod notify;
pub mod pricing;
pub mod stats;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::{AppConfig, SwapSettingsProvider};

// Re-export commonly used types
pub use types::{
    AnalysisHistoryRecord, AnalysisOutcome, AnalysisSettings, Classification, CompletionOutcome,
    CompletionRequest, Event, EventStats, PeriodStats, Reading, UsageLogRecord,
};

// Re-export the orchestrator and its collaborator traits
pub use analysis::{
    AiClient, AnalysisError, AnalysisOrchestrator, EventStore, Notifier, ReadingStore,
    SettingsProvider, UsageStore,
};

// Re-export the stats engine
pub use stats::{compute_event_stats, compute_period_stats};

// Re-export the classification parser
pub use classification::{parse_classification, ParsedAnalysis};

// Re-export pricing
pub use pricing::{ModelPrice, PricingTable, UsageReport};

// Re-export storage adapters
pub use storage::{open_database, EventStorage, ReadingStorage, StorageError, UsageStorage};

// Re-export the notifier
pub use notify::{BroadcastNotifier, Notification, NotifyTopic};

// Re-export the AI client adapter
pub use ai::{AiClientError, OpenAiClient};
