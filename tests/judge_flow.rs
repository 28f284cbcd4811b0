//! End-to-end judge flow against a completion-service double.

use judgebench::error::{BenchError, JudgeError};
use judgebench::judge;
use judgebench::prompt::PromptSet;
use judgebench::providers::BoundAnthropicProvider;
use judgebench::store::{JudgeState, Store};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn seeded_store() -> (Store, i64, i64) {
    let store = Store::in_memory().await.unwrap();
    let project = store.create_project("support bot").await.unwrap();
    let model = store.create_model(project.id).await.unwrap();
    store
        .insert_synthetic(project.id, "Why did my invoice total change?")
        .await
        .unwrap();
    store.sync_evaluations(project.id, model.id).await.unwrap();
    let evaluation_id = store.list_evaluations_for_model(model.id).await.unwrap()[0].id;
    (store, project.id, evaluation_id)
}

fn verdict_body(critique: &str, outcome: &str) -> serde_json::Value {
    serde_json::json!({
        "content": [{
            "type": "text",
            "text": format!(r#"{{"critique": "{critique}", "outcome": "{outcome}"}}"#)
        }]
    })
}

#[tokio::test]
async fn judge_records_pass_verdict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(verdict_body("Clear answer.", "good")))
        .mount(&server)
        .await;

    let (store, _, evaluation_id) = seeded_store().await;
    let provider = BoundAnthropicProvider::new(Some("sk-test"), Some(&server.uri()), "claude-test");
    let prompts = PromptSet::new().unwrap();

    let verdict = judge::judge(&store, &provider, &prompts, evaluation_id)
        .await
        .unwrap();
    assert!(verdict.outcome.is_pass());

    let row = store.get_evaluation(evaluation_id).await.unwrap().unwrap();
    assert_eq!(row.judge_pass, Some(true));
    assert_eq!(row.judge_critique_text.as_deref(), Some("Clear answer."));
    assert_eq!(row.judge_state, JudgeState::Judged);
}

#[tokio::test]
async fn judge_records_fail_verdict_distinctly_from_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(verdict_body("Evasive.", "bad")))
        .mount(&server)
        .await;

    let (store, _, evaluation_id) = seeded_store().await;
    let provider = BoundAnthropicProvider::new(Some("sk-test"), Some(&server.uri()), "claude-test");
    let prompts = PromptSet::new().unwrap();

    let verdict = judge::judge(&store, &provider, &prompts, evaluation_id)
        .await
        .unwrap();
    assert!(!verdict.outcome.is_pass());

    let row = store.get_evaluation(evaluation_id).await.unwrap().unwrap();
    assert_eq!(row.judge_pass, Some(false));
    assert_eq!(row.judge_state, JudgeState::Judged);
}

#[tokio::test]
async fn missing_model_output_is_judged_with_sentinel() {
    let server = MockServer::start().await;
    // The mock only matches when the sentinel is present in the prompt.
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_string_contains("No output produced."))
        .respond_with(ResponseTemplate::new(200).set_body_json(verdict_body("No output.", "bad")))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _, evaluation_id) = seeded_store().await;
    let provider = BoundAnthropicProvider::new(Some("sk-test"), Some(&server.uri()), "claude-test");
    let prompts = PromptSet::new().unwrap();

    judge::judge(&store, &provider, &prompts, evaluation_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn real_model_output_is_embedded_in_the_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_string_contains("Rates are applied at billing time."))
        .respond_with(ResponseTemplate::new(200).set_body_json(verdict_body("Good.", "good")))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _, evaluation_id) = seeded_store().await;
    let row = store.get_evaluation(evaluation_id).await.unwrap().unwrap();
    store
        .set_model_output(
            row.model_id,
            row.synthetic_data_id,
            "Rates are applied at billing time.",
        )
        .await
        .unwrap();

    let provider = BoundAnthropicProvider::new(Some("sk-test"), Some(&server.uri()), "claude-test");
    let prompts = PromptSet::new().unwrap();
    judge::judge(&store, &provider, &prompts, evaluation_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn custom_judge_prompt_leads_the_composed_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_string_contains("Penalize missing citations."))
        .respond_with(ResponseTemplate::new(200).set_body_json(verdict_body("Ok.", "good")))
        .expect(1)
        .mount(&server)
        .await;

    let (store, project_id, evaluation_id) = seeded_store().await;
    store
        .update_judge_prompt(project_id, "Penalize missing citations.")
        .await
        .unwrap();

    let provider = BoundAnthropicProvider::new(Some("sk-test"), Some(&server.uri()), "claude-test");
    let prompts = PromptSet::new().unwrap();
    judge::judge(&store, &provider, &prompts, evaluation_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn malformed_response_errors_and_resets_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": "The output is bad, trust me."}]
        })))
        .mount(&server)
        .await;

    let (store, _, evaluation_id) = seeded_store().await;
    let provider = BoundAnthropicProvider::new(Some("sk-test"), Some(&server.uri()), "claude-test");
    let prompts = PromptSet::new().unwrap();

    let err = judge::judge(&store, &provider, &prompts, evaluation_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BenchError::Judge(JudgeError::MalformedVerdict(_))
    ));

    // Never coerced into a fail verdict; row stays retryable.
    let row = store.get_evaluation(evaluation_id).await.unwrap().unwrap();
    assert_eq!(row.judge_pass, None);
    assert_eq!(row.judge_critique_text, None);
    assert_eq!(row.judge_state, JudgeState::Unjudged);
}

#[tokio::test]
async fn upstream_error_resets_state_and_surfaces() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let (store, _, evaluation_id) = seeded_store().await;
    let provider = BoundAnthropicProvider::new(Some("sk-test"), Some(&server.uri()), "claude-test");
    let prompts = PromptSet::new().unwrap();

    let err = judge::judge(&store, &provider, &prompts, evaluation_id)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("API error"));

    let row = store.get_evaluation(evaluation_id).await.unwrap().unwrap();
    assert_eq!(row.judge_state, JudgeState::Unjudged);
}

#[tokio::test]
async fn missing_evaluation_is_an_explicit_failure() {
    let server = MockServer::start().await;
    let (store, _, _) = seeded_store().await;
    let provider = BoundAnthropicProvider::new(Some("sk-test"), Some(&server.uri()), "claude-test");
    let prompts = PromptSet::new().unwrap();

    let err = judge::judge(&store, &provider, &prompts, 9999)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BenchError::Judge(JudgeError::EvaluationNotFound(9999))
    ));
}

#[tokio::test]
async fn trailing_tag_artifact_is_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{
                "type": "text",
                "text": "{\"critique\": \"Fine.\", \"outcome\": \"good\"}\n</examples>"
            }]
        })))
        .mount(&server)
        .await;

    let (store, _, evaluation_id) = seeded_store().await;
    let provider = BoundAnthropicProvider::new(Some("sk-test"), Some(&server.uri()), "claude-test");
    let prompts = PromptSet::new().unwrap();

    let verdict = judge::judge(&store, &provider, &prompts, evaluation_id)
        .await
        .unwrap();
    assert!(verdict.outcome.is_pass());
}
