//! Judge unit of work: critique one model output for one synthetic input.

use crate::error::{BenchError, JudgeError};
use crate::prompt::{PromptSet, DEFAULT_JUDGE_PROMPT};
use crate::providers::{CompletionProvider, CompletionRequest};
use crate::store::{JudgeState, Store};
use serde::{Deserialize, Serialize};

const JUDGE_MAX_TOKENS: u32 = 1024;

/// Verdict categories the judge may emit. Only `good` maps to a pass; any
/// other member of the set is a fail. Values outside the set are a parse
/// error, not a fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeOutcome {
    Good,
    Bad,
}

impl JudgeOutcome {
    pub fn is_pass(self) -> bool {
        matches!(self, Self::Good)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub critique: String,
    pub outcome: JudgeOutcome,
}

/// Parse the judge response strictly. A trailing closing-tag artifact (the
/// model echoing the end of the examples block) is stripped first; anything
/// else that fails JSON parsing is a [`JudgeError::MalformedVerdict`].
pub fn parse_verdict(text: &str) -> Result<JudgeVerdict, JudgeError> {
    let cleaned = strip_trailing_closing_tag(text.trim());
    serde_json::from_str(cleaned).map_err(|e| JudgeError::MalformedVerdict(e.to_string()))
}

fn strip_trailing_closing_tag(text: &str) -> &str {
    if let Some(start) = text.rfind("</") {
        let tail = &text[start..];
        if tail.len() > 3 && tail.ends_with('>') {
            let name = &tail[2..tail.len() - 1];
            if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return text[..start].trim_end();
            }
        }
    }
    text
}

/// Judge one evaluation: load the row, its project's judge prompt and the
/// linked synthetic input, ask the completion service for a verdict, persist
/// it. Retryable: any failure resets the row to `unjudged`.
pub async fn judge(
    store: &Store,
    provider: &dyn CompletionProvider,
    prompts: &PromptSet,
    evaluation_id: i64,
) -> Result<JudgeVerdict, BenchError> {
    let evaluation = store
        .get_evaluation(evaluation_id)
        .await?
        .ok_or(JudgeError::EvaluationNotFound(evaluation_id))?;
    let project = store
        .get_project(evaluation.project_id)
        .await?
        .ok_or(JudgeError::ProjectNotFound(evaluation.project_id))?;
    let synthetic = store
        .get_synthetic(evaluation.synthetic_data_id)
        .await?
        .ok_or(JudgeError::SyntheticInputNotFound(evaluation.synthetic_data_id))?;

    let judge_prompt = project
        .judge_prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_JUDGE_PROMPT);

    let prompt = prompts.judge_prompt(
        judge_prompt,
        &synthetic.data,
        evaluation.model_output.as_deref(),
    )?;

    store
        .set_judge_state(evaluation_id, JudgeState::InProgress)
        .await?;

    let request = CompletionRequest::new(prompt)
        .with_temperature(0.0)
        .with_max_tokens(JUDGE_MAX_TOKENS);

    let response = match provider.complete(request).await {
        Ok(text) => text,
        Err(e) => {
            reset_state(store, evaluation_id).await;
            return Err(BenchError::Other(e));
        }
    };

    let verdict = match parse_verdict(&response) {
        Ok(verdict) => verdict,
        Err(e) => {
            reset_state(store, evaluation_id).await;
            return Err(e.into());
        }
    };

    store
        .record_judge_verdict(evaluation_id, &verdict.critique, verdict.outcome.is_pass())
        .await?;

    tracing::info!(
        evaluation_id,
        pass = verdict.outcome.is_pass(),
        "judge verdict recorded"
    );
    Ok(verdict)
}

/// Best-effort rollback to `unjudged` so the row stays retryable.
async fn reset_state(store: &Store, evaluation_id: i64) {
    if let Err(e) = store
        .set_judge_state(evaluation_id, JudgeState::Unjudged)
        .await
    {
        tracing::warn!(evaluation_id, error = %e, "failed to reset judge state");
    }
}
