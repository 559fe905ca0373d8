//! Analysis orchestration
//!
//! The root component of the engine: consumes the stats engine, the
//! classification parser, and the collaborator interfaces (storage, AI
//! client, notifier, settings) to run one event through the full analysis
//! lifecycle with idempotent usage accounting and ordered notifications.

mod locks;
mod orchestrator;
pub mod prompts;
mod traits;

pub use locks::EventLockMap;
pub use orchestrator::{AnalysisError, AnalysisOrchestrator};
pub use traits::{AiClient, EventStore, Notifier, ReadingStore, SettingsProvider, UsageStore};
