//! Synthetic input generation: one completion call per scenario, strictly
//! sequential. The batch loop must stay sequential — parallelizing it would
//! change the observable progress order and hammer the completion service.

use crate::prompt::{PromptSet, SYNTHESIS_SYSTEM_PROMPT};
use crate::providers::{CompletionProvider, CompletionRequest};
use crate::scenario;
use crate::store::Store;
use crate::taxonomy::Taxonomy;
use strum::Display;

const SYNTHESIS_TEMPERATURE: f64 = 0.7;
const SYNTHESIS_MAX_TOKENS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScenarioStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PersistStatus {
    Pending,
    Success,
    Error,
}

/// Injected progress sink for batch runs. Batches can span hundreds of
/// sequential round trips, so callers surface per-item state as it changes.
pub trait ProgressObserver: Send + Sync {
    fn scenario_status(&self, index: usize, total: usize, status: ScenarioStatus);
    fn persist_status(&self, index: usize, total: usize, status: PersistStatus);
}

/// Default observer: structured log lines.
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn scenario_status(&self, index: usize, total: usize, status: ScenarioStatus) {
        tracing::info!(
            scenario = index + 1,
            total,
            status = %status,
            "scenario status"
        );
    }

    fn persist_status(&self, index: usize, total: usize, status: PersistStatus) {
        tracing::info!(
            scenario = index + 1,
            total,
            status = %status,
            "persistence status"
        );
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub scenario: String,
    pub response: Option<String>,
    pub status: ScenarioStatus,
    pub persist: PersistStatus,
}

/// Generate one synthetic input for a scenario, without persisting it.
pub async fn generate_input(
    provider: &dyn CompletionProvider,
    prompts: &PromptSet,
    taxonomy: &Taxonomy,
    scenario: &str,
) -> anyhow::Result<String> {
    let context = taxonomy.context_without_objectives();
    let prompt = prompts.synthesis_prompt(&context, scenario)?;
    let request = CompletionRequest::new(prompt)
        .with_system(SYNTHESIS_SYSTEM_PROMPT)
        .with_temperature(SYNTHESIS_TEMPERATURE)
        .with_max_tokens(SYNTHESIS_MAX_TOKENS);
    provider.complete(request).await
}

/// Generate and persist one synthetic input. Exactly one row is written per
/// successful call.
pub async fn synthesize_one(
    store: &Store,
    provider: &dyn CompletionProvider,
    prompts: &PromptSet,
    taxonomy: &Taxonomy,
    scenario: &str,
    project_id: i64,
) -> anyhow::Result<String> {
    let text = generate_input(provider, prompts, taxonomy, scenario).await?;
    store.insert_synthetic(project_id, &text).await?;
    Ok(text)
}

/// Expand the taxonomy and synthesize every scenario, one at a time, in
/// generation order. Scenario i+1 never starts before scenario i's full
/// round trip (completion call + persistence) has finished or failed, and a
/// single scenario's failure never aborts the batch.
pub async fn run_batch(
    store: &Store,
    provider: &dyn CompletionProvider,
    prompts: &PromptSet,
    taxonomy: &Taxonomy,
    project_id: i64,
    observer: &dyn ProgressObserver,
) -> Vec<BatchOutcome> {
    let scenarios = scenario::generate(&taxonomy.dimensions);
    let total = scenarios.len();

    for index in 0..total {
        observer.scenario_status(index, total, ScenarioStatus::Pending);
        observer.persist_status(index, total, PersistStatus::Pending);
    }

    let mut outcomes = Vec::with_capacity(total);
    for (index, scenario) in scenarios.into_iter().enumerate() {
        observer.scenario_status(index, total, ScenarioStatus::Processing);

        match generate_input(provider, prompts, taxonomy, &scenario).await {
            Ok(response) => {
                let persist = match store.insert_synthetic(project_id, &response).await {
                    Ok(_) => PersistStatus::Success,
                    Err(e) => {
                        tracing::error!(scenario = index + 1, error = %e, "persist failed");
                        PersistStatus::Error
                    }
                };
                observer.scenario_status(index, total, ScenarioStatus::Completed);
                observer.persist_status(index, total, persist);
                outcomes.push(BatchOutcome {
                    scenario,
                    response: Some(response),
                    status: ScenarioStatus::Completed,
                    persist,
                });
            }
            Err(e) => {
                tracing::warn!(scenario = index + 1, error = %e, "synthesis failed");
                observer.scenario_status(index, total, ScenarioStatus::Error);
                observer.persist_status(index, total, PersistStatus::Error);
                outcomes.push(BatchOutcome {
                    scenario,
                    response: None,
                    status: ScenarioStatus::Error,
                    persist: PersistStatus::Error,
                });
            }
        }
    }

    outcomes
}
