//! Taxonomy → scenarios → synthesis → sync → import → score, end to end
//! against a completion-service double and an in-memory store.

use judgebench::prompt::PromptSet;
use judgebench::providers::BoundAnthropicProvider;
use judgebench::scenario;
use judgebench::scoring;
use judgebench::store::Store;
use judgebench::synthesis::{self, PersistStatus, ProgressObserver, ScenarioStatus};
use judgebench::taxonomy::Taxonomy;
use judgebench::transfer::{self, ImportEntry};
use std::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn taxonomy() -> Taxonomy {
    serde_json::from_str(
        r#"{
            "dimensions": [
                {"name": "Persona", "subdimensions": ["novice", "expert"], "decision_logic": "vocabulary", "objective": "skill coverage"},
                {"name": "Urgency", "subdimensions": ["low", "high"], "decision_logic": "deadline pressure", "objective": "tone coverage"}
            ],
            "summary": "support requests"
        }"#,
    )
    .unwrap()
}

fn text_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "content": [{"type": "text", "text": text}]
    }))
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<(usize, String)>>,
}

impl ProgressObserver for RecordingObserver {
    fn scenario_status(&self, index: usize, _total: usize, status: ScenarioStatus) {
        self.events
            .lock()
            .unwrap()
            .push((index, status.to_string()));
    }

    fn persist_status(&self, _index: usize, _total: usize, _status: PersistStatus) {}
}

#[tokio::test]
async fn full_pipeline_from_taxonomy_to_scores() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(text_response("A synthesized example input."))
        .mount(&server)
        .await;

    let store = Store::in_memory().await.unwrap();
    let project = store.create_project("pipeline").await.unwrap();
    let taxonomy = taxonomy();
    store.update_taxonomy(project.id, &taxonomy).await.unwrap();

    // 2×2 dimensions expand to exactly 4 scenarios.
    let scenarios = scenario::generate(&taxonomy.dimensions);
    assert_eq!(scenarios.len(), scenario::total_combinations(&taxonomy.dimensions));
    assert_eq!(scenarios.len(), 4);

    let provider = BoundAnthropicProvider::new(Some("sk-test"), Some(&server.uri()), "claude-test");
    let prompts = PromptSet::new().unwrap();
    let observer = RecordingObserver::default();

    let outcomes = synthesis::run_batch(
        &store,
        &provider,
        &prompts,
        &taxonomy,
        project.id,
        &observer,
    )
    .await;
    assert_eq!(outcomes.len(), 4);
    assert!(outcomes.iter().all(|o| o.status == ScenarioStatus::Completed));

    // One persisted row per scenario, in processing order.
    let inputs = store.list_synthetic(project.id).await.unwrap();
    assert_eq!(inputs.len(), 4);

    // Sync a model against the inputs, twice: second pass creates nothing.
    let model = store.create_model(project.id).await.unwrap();
    assert_eq!(store.sync_evaluations(project.id, model.id).await.unwrap(), 4);
    assert_eq!(store.sync_evaluations(project.id, model.id).await.unwrap(), 0);

    // Round-trip outputs through the exchange format.
    let exported = transfer::export_inputs(&store, project.id).await.unwrap();
    let outputs: Vec<ImportEntry> = exported
        .iter()
        .map(|e| ImportEntry {
            id: e.id,
            output: format!("answer for {}", e.id),
        })
        .collect();
    let report = transfer::import_outputs(&store, model.id, &outputs).await.unwrap();
    assert_eq!(report.updated, 4);
    assert!(report.missing.is_empty());

    // Expert passes three of four; judge never ran, so agreement is only on
    // the row left fully unset.
    let rows = store.list_evaluations_for_model(model.id).await.unwrap();
    for row in rows.iter().take(3) {
        store.set_expert_pass(row.id, Some(true)).await.unwrap();
    }
    let rows = store.list_evaluations_for_model(model.id).await.unwrap();
    let scores = scoring::score(&rows);
    assert!((scores.overall - 75.0).abs() < 1e-9);
    assert!((scores.judge_quality - 25.0).abs() < 1e-9);

    store.set_model_score(model.id, scores.overall).await.unwrap();
    let model = store.get_model(model.id).await.unwrap().unwrap();
    assert_eq!(model.score, Some(75.0));
}

#[tokio::test]
async fn batch_continues_past_a_failing_scenario() {
    let server = MockServer::start().await;
    // First call succeeds, everything after returns 500.
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(text_response("only successful input"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let store = Store::in_memory().await.unwrap();
    let project = store.create_project("p").await.unwrap();
    let taxonomy = taxonomy();

    let provider = BoundAnthropicProvider::new(Some("sk-test"), Some(&server.uri()), "claude-test");
    let prompts = PromptSet::new().unwrap();
    let observer = RecordingObserver::default();

    let outcomes = synthesis::run_batch(
        &store,
        &provider,
        &prompts,
        &taxonomy,
        project.id,
        &observer,
    )
    .await;

    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes[0].status, ScenarioStatus::Completed);
    assert!(outcomes[1..]
        .iter()
        .all(|o| o.status == ScenarioStatus::Error));

    // Partial progress stays persisted.
    assert_eq!(store.list_synthetic(project.id).await.unwrap().len(), 1);

    // Every scenario was still processed, in order.
    let events = observer.events.lock().unwrap();
    let processing: Vec<usize> = events
        .iter()
        .filter(|(_, s)| s == "processing")
        .map(|(i, _)| *i)
        .collect();
    assert_eq!(processing, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn missing_credentials_fail_each_scenario_without_aborting() {
    let store = Store::in_memory().await.unwrap();
    let project = store.create_project("p").await.unwrap();
    let taxonomy = taxonomy();

    // No API key: every completion call reports the configuration failure.
    let provider = BoundAnthropicProvider::new(None, None, "claude-test");
    let prompts = PromptSet::new().unwrap();
    let observer = RecordingObserver::default();

    let outcomes = synthesis::run_batch(
        &store,
        &provider,
        &prompts,
        &taxonomy,
        project.id,
        &observer,
    )
    .await;

    assert_eq!(outcomes.len(), 4);
    assert!(outcomes.iter().all(|o| o.status == ScenarioStatus::Error));
    assert!(store.list_synthetic(project.id).await.unwrap().is_empty());
}
