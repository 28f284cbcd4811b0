//! Judge-prompt optimization from expert disagreement data.

use crate::error::{BenchError, OptimizeError};
use crate::prompt::{PromptSet, DEFAULT_JUDGE_PROMPT};
use crate::providers::{CompletionProvider, CompletionRequest};
use crate::store::{EvaluationRow, Store};

const OPTIMIZE_MAX_TOKENS: u32 = 8192;
const EMPTY_SENTINEL: &str = "EMPTY";

/// Rows worth showing the optimizer: the expert wrote a critique, supplied
/// an improved output, or disagreed with the judge. Rows whose expert
/// critique is the empty string are then dropped even when another clause
/// admitted them.
pub fn select_for_optimization(rows: &[EvaluationRow]) -> Vec<&EvaluationRow> {
    rows.iter()
        .filter(|e| {
            e.expert_critique_text
                .as_deref()
                .is_some_and(|t| !t.is_empty())
                || e.improved_output.is_some()
                || e.judge_pass != e.expert_pass
        })
        .filter(|e| e.expert_critique_text.as_deref() != Some(""))
        .collect()
}

fn opt_bool(value: Option<bool>) -> String {
    value.map_or_else(|| EMPTY_SENTINEL.to_string(), |b| b.to_string())
}

fn opt_text(value: Option<&str>) -> &str {
    value.unwrap_or(EMPTY_SENTINEL)
}

/// Serialize one selected row into the sample block fed to the optimizer.
pub fn serialize_sample(evaluation: &EvaluationRow) -> String {
    format!(
        "<model_evaluation>
    <model_output>{}</model_output>
    <judge_critique_text>{}</judge_critique_text>
    <judge_pass>{}</judge_pass>
    <expert_critique_text>{}</expert_critique_text>
    <expert_pass>{}</expert_pass>
    <improved_output>{}</improved_output>
</model_evaluation>",
        opt_text(evaluation.model_output.as_deref()),
        opt_text(evaluation.judge_critique_text.as_deref()),
        opt_bool(evaluation.judge_pass),
        opt_text(evaluation.expert_critique_text.as_deref()),
        opt_bool(evaluation.expert_pass),
        opt_text(evaluation.improved_output.as_deref()),
    )
}

/// The revised prompt delimited by `<prompt>` markers, if present.
pub fn extract_improved_prompt(text: &str) -> Option<&str> {
    let start = text.find("<prompt>")? + "<prompt>".len();
    let end = text[start..].find("</prompt>")? + start;
    Some(text[start..end].trim())
}

/// Optimize a project's judge prompt from its evaluation history and persist
/// the result. Nothing is written when the response carries no delimited
/// prompt.
pub async fn optimize(
    store: &Store,
    provider: &dyn CompletionProvider,
    prompts: &PromptSet,
    project_id: i64,
) -> Result<String, BenchError> {
    let project = store
        .get_project(project_id)
        .await?
        .ok_or(OptimizeError::ProjectNotFound(project_id))?;

    let evaluations = store.list_evaluations_for_project(project_id).await?;
    let selected = select_for_optimization(&evaluations);
    tracing::info!(
        project_id,
        samples = selected.len(),
        "optimizing judge prompt"
    );

    let judge_prompt = project
        .judge_prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_JUDGE_PROMPT);

    let samples = selected
        .iter()
        .map(|row| serialize_sample(row))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = prompts.optimizer_prompt(judge_prompt, &samples)?;
    let response = provider
        .complete(CompletionRequest::new(prompt).with_max_tokens(OPTIMIZE_MAX_TOKENS))
        .await?;

    let improved = extract_improved_prompt(&response)
        .ok_or(OptimizeError::MissingPromptMarker)?
        .to_string();

    store.update_judge_prompt(project_id, &improved).await?;
    Ok(improved)
}
