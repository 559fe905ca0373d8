//! Analysis Pipeline Regression Tests
//!
//! Exercises the full analysis lifecycle against real sled-backed stores:
//! readings in → stats → (scripted) AI call → event update + history append
//! + usage accounting → ordered notifications. The AI client is the only
//! mocked collaborator; everything else runs the shipped adapters.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use glucolens::{
    open_database, AiClient, AnalysisOrchestrator, AnalysisOutcome, AnalysisSettings,
    BroadcastNotifier, Classification, CompletionOutcome, CompletionRequest, Event, EventStorage,
    EventStore, Notifier, NotifyTopic, PricingTable, Reading, ReadingStorage, ReadingStore,
    SwapSettingsProvider, UsageStorage, UsageStore,
};

/// AI client that replays a canned outcome and records the last request.
struct ScriptedAi {
    outcome: CompletionOutcome,
    last_request: std::sync::Mutex<Option<CompletionRequest>>,
}

impl ScriptedAi {
    fn new(outcome: CompletionOutcome) -> Self {
        Self {
            outcome,
            last_request: std::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl AiClient for ScriptedAi {
    async fn analyze(
        &self,
        _api_key: &str,
        request: CompletionRequest,
    ) -> Result<CompletionOutcome> {
        *self.last_request.lock().unwrap() = Some(request);
        Ok(self.outcome.clone())
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn tagged_outcome(text: &str) -> CompletionOutcome {
    CompletionOutcome {
        content: Some(text.to_string()),
        model: "gpt-4o-mini-2024-07-18".to_string(),
        input_tokens: 300,
        output_tokens: 90,
        total_tokens: 390,
        finish_reason: Some("stop".to_string()),
        http_status: 200,
        success: true,
        duration_ms: 420,
        error_message: None,
    }
}

fn configured_settings() -> AnalysisSettings {
    AnalysisSettings {
        api_key: Some("sk-test".to_string()),
        ..AnalysisSettings::default()
    }
}

struct Pipeline {
    _dir: tempfile::TempDir,
    readings: Arc<ReadingStorage>,
    events: Arc<EventStorage>,
    usage: Arc<UsageStorage>,
    ai: Arc<ScriptedAi>,
    notifier: Arc<BroadcastNotifier>,
    settings: Arc<SwapSettingsProvider>,
    orchestrator: AnalysisOrchestrator,
}

fn build_pipeline(outcome: CompletionOutcome, settings: AnalysisSettings) -> Pipeline {
    // RUST_LOG=debug surfaces pipeline tracing during test runs
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let dir = tempfile::tempdir().unwrap();
    let db = open_database(dir.path()).unwrap();

    let readings = Arc::new(ReadingStorage::open(&db).unwrap());
    let events = Arc::new(EventStorage::open(&db).unwrap());
    let usage = Arc::new(UsageStorage::open(&db).unwrap());
    let ai = Arc::new(ScriptedAi::new(outcome));
    let notifier = Arc::new(BroadcastNotifier::new(16));
    let settings = Arc::new(SwapSettingsProvider::new(settings));

    let orchestrator = AnalysisOrchestrator::new(
        Arc::clone(&readings) as Arc<dyn ReadingStore>,
        Arc::clone(&events) as Arc<dyn EventStore>,
        Arc::clone(&usage) as Arc<dyn UsageStore>,
        Arc::clone(&ai) as Arc<dyn AiClient>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        Arc::clone(&settings) as Arc<dyn glucolens::SettingsProvider>,
    );

    Pipeline {
        _dir: dir,
        readings,
        events,
        usage,
        ai,
        notifier,
        settings,
        orchestrator,
    }
}

fn seed_meal_scenario(pipeline: &Pipeline) -> i64 {
    // A pasta dinner with a classic post-meal rise
    for (offset_min, value) in [
        (-25i64, 98.0),
        (-10, 102.0),
        (0, 105.0),
        (15, 122.0),
        (30, 141.0),
        (45, 168.0),
        (60, 155.0),
        (90, 128.0),
    ] {
        pipeline
            .readings
            .append(&Reading::new(value, t0() + Duration::minutes(offset_min)))
            .unwrap();
    }

    let event_id = pipeline.events.allocate_id().unwrap();
    let event = Event::new(
        event_id,
        "Pasta with garlic bread",
        t0(),
        t0() - Duration::minutes(30),
        t0() + Duration::hours(2),
    );
    pipeline.events.save(&event).unwrap();
    event_id
}

#[tokio::test]
async fn full_pipeline_persists_analysis_and_notifies_in_order() {
    let pipeline = build_pipeline(
        tagged_outcome("[CLASSIFICATION: yellow]\nNotable rise to 168 mg/dL, recovered well."),
        configured_settings(),
    );
    let event_id = seed_meal_scenario(&pipeline);
    let mut rx = pipeline.notifier.subscribe();

    let outcome = pipeline
        .orchestrator
        .analyze_event(event_id, "scheduled", None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        outcome.analysis_text(),
        Some("Notable rise to 168 mg/dL, recovered well.")
    );

    // Event was updated and persisted with fresh stats
    let event = pipeline.events.load(event_id).unwrap().unwrap();
    assert!(event.is_processed);
    assert_eq!(event.ai_classification, Some(Classification::Yellow));
    assert_eq!(event.glucose_at_event, Some(105.0));
    assert_eq!(event.max, Some(168.0));
    assert_eq!(event.spike, Some(63.0));
    assert_eq!(event.peak_time_utc, Some(t0() + Duration::minutes(45)));
    assert_eq!(event.reading_count, 8);

    // One history row with the stats snapshot and the supplied reason
    let history = pipeline.events.history_for_event(event_id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reason, "scheduled");
    assert_eq!(history[0].stats.spike, Some(63.0));

    // One usage row carrying the service-reported model
    let usage = pipeline.usage.recent(10).unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].model, "gpt-4o-mini-2024-07-18");
    assert_eq!(usage[0].event_id, Some(event_id));

    // events-updated strictly before usage-updated
    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(first.topic, NotifyTopic::EventsUpdated);
    assert_eq!(second.topic, NotifyTopic::UsageUpdated);
    assert_eq!(first.count, 1);

    // Cost reporting recomputes from the pricing table; the dated model
    // falls back to the gpt-4o-mini prefix prices
    let table = PricingTable::default();
    let report = table.summarize(&usage);
    let expected = (300.0 * 0.15 + 90.0 * 0.60) / 1_000_000.0;
    assert!((report.total_cost_usd - expected).abs() < 1e-12);
}

#[tokio::test]
async fn prompt_reflects_event_and_stats() {
    let pipeline = build_pipeline(
        tagged_outcome("[CLASSIFICATION: green]\nLooks stable."),
        configured_settings(),
    );
    let event_id = seed_meal_scenario(&pipeline);

    pipeline
        .orchestrator
        .analyze_event(event_id, "scheduled", Some("gpt-4o"), &CancellationToken::new())
        .await
        .unwrap();

    let request = pipeline.ai.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.model, "gpt-4o");
    assert!(request.user_prompt.contains("Pasta with garlic bread"));
    assert!(request.user_prompt.contains("At event: 105.0"));
    assert!(request.system_prompt.contains("[CLASSIFICATION: green]"));
}

#[tokio::test]
async fn reprocess_appends_second_history_row() {
    let pipeline = build_pipeline(
        tagged_outcome("[CLASSIFICATION: yellow]\nFirst pass."),
        configured_settings(),
    );
    let event_id = seed_meal_scenario(&pipeline);
    let cancel = CancellationToken::new();

    pipeline
        .orchestrator
        .analyze_event(event_id, "scheduled", None, &cancel)
        .await
        .unwrap();
    pipeline
        .orchestrator
        .analyze_event(event_id, "manual reprocess", None, &cancel)
        .await
        .unwrap();

    let history = pipeline.events.history_for_event(event_id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].reason, "manual reprocess");

    // Both attempts accounted
    assert_eq!(pipeline.usage.count(), 2);
}

#[tokio::test]
async fn settings_hot_swap_enables_analysis() {
    let pipeline = build_pipeline(
        tagged_outcome("[CLASSIFICATION: green]\nStable."),
        AnalysisSettings::default(), // unconfigured
    );
    let event_id = seed_meal_scenario(&pipeline);
    let cancel = CancellationToken::new();

    let outcome = pipeline
        .orchestrator
        .analyze_event(event_id, "scheduled", None, &cancel)
        .await
        .unwrap();
    assert_eq!(outcome, AnalysisOutcome::NotConfigured);
    assert_eq!(pipeline.usage.count(), 0);

    // The user saves an API key; the very next run picks it up
    pipeline.settings.replace(configured_settings());

    let outcome = pipeline
        .orchestrator
        .analyze_event(event_id, "scheduled", None, &cancel)
        .await
        .unwrap();
    assert!(matches!(outcome, AnalysisOutcome::Completed { .. }));
    assert_eq!(pipeline.usage.count(), 1);
}

#[tokio::test]
async fn empty_result_is_accounted_but_changes_nothing() {
    let mut outcome = tagged_outcome("");
    outcome.content = None;
    let pipeline = build_pipeline(outcome, configured_settings());
    let event_id = seed_meal_scenario(&pipeline);

    let result = pipeline
        .orchestrator
        .analyze_event(event_id, "scheduled", None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result, AnalysisOutcome::Empty);
    assert_eq!(pipeline.usage.count(), 1);
    assert!(pipeline.events.history_for_event(event_id).unwrap().is_empty());

    let event = pipeline.events.load(event_id).unwrap().unwrap();
    assert!(!event.is_processed);
    assert!(event.ai_analysis.is_none());
}

#[tokio::test]
async fn concurrent_reprocess_requests_serialize() {
    let pipeline = Arc::new(build_pipeline(
        tagged_outcome("[CLASSIFICATION: green]\nStable."),
        configured_settings(),
    ));
    let event_id = seed_meal_scenario(&pipeline);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let pipeline = Arc::clone(&pipeline);
        handles.push(tokio::spawn(async move {
            pipeline
                .orchestrator
                .analyze_event(event_id, "manual reprocess", None, &CancellationToken::new())
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    // Every run completed its full append+save sequence without
    // interleaving: one history row and one usage row per run
    assert_eq!(
        pipeline.events.history_for_event(event_id).unwrap().len(),
        4
    );
    assert_eq!(pipeline.usage.count(), 4);

    let event = pipeline.events.load(event_id).unwrap().unwrap();
    assert!(event.is_processed);
}
