use super::types::{str_to_judge_state, EvaluationRow, JudgeState};
use anyhow::Context;
use chrono::Local;
use sqlx::SqlitePool;

type EvaluationTuple = (
    i64,            // id
    i64,            // project_id
    i64,            // model_id
    i64,            // synthetic_data_id
    Option<String>, // model_output
    String,         // judge_state
    Option<String>, // judge_critique_text
    Option<bool>,   // judge_pass
    Option<String>, // expert_critique_text
    Option<bool>,   // expert_pass
    Option<String>, // improved_output
);

const EVALUATION_COLUMNS: &str = "id, project_id, model_id, synthetic_data_id, model_output, \
     judge_state, judge_critique_text, judge_pass, expert_critique_text, expert_pass, \
     improved_output";

fn from_tuple(row: EvaluationTuple) -> EvaluationRow {
    let (
        id,
        project_id,
        model_id,
        synthetic_data_id,
        model_output,
        judge_state,
        judge_critique_text,
        judge_pass,
        expert_critique_text,
        expert_pass,
        improved_output,
    ) = row;
    EvaluationRow {
        id,
        project_id,
        model_id,
        synthetic_data_id,
        model_output,
        judge_state: str_to_judge_state(&judge_state),
        judge_critique_text,
        judge_pass,
        expert_critique_text,
        expert_pass,
        improved_output,
    }
}

/// Insert one empty evaluation per (model, synthetic input) pair that does
/// not already exist. Idempotent: re-running never duplicates a pair.
pub(super) async fn sync_evaluations(
    pool: &SqlitePool,
    project_id: i64,
    model_id: i64,
) -> anyhow::Result<u64> {
    let now = Local::now().to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO model_evaluation (project_id, model_id, synthetic_data_id, judge_state, created_at)
         SELECT sd.project_id, ?2, sd.id, 'unjudged', ?3
         FROM synthetic_data sd
         WHERE sd.project_id = ?1
           AND NOT EXISTS (
               SELECT 1 FROM model_evaluation me
               WHERE me.model_id = ?2 AND me.synthetic_data_id = sd.id
           )",
    )
    .bind(project_id)
    .bind(model_id)
    .bind(&now)
    .execute(pool)
    .await
    .context("sync evaluations")?;

    Ok(result.rows_affected())
}

pub(super) async fn get_evaluation(
    pool: &SqlitePool,
    id: i64,
) -> anyhow::Result<Option<EvaluationRow>> {
    let sql = format!("SELECT {EVALUATION_COLUMNS} FROM model_evaluation WHERE id = ?1");
    let row: Option<EvaluationTuple> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("query evaluation")?;
    Ok(row.map(from_tuple))
}

pub(super) async fn list_evaluations_for_project(
    pool: &SqlitePool,
    project_id: i64,
) -> anyhow::Result<Vec<EvaluationRow>> {
    let sql = format!(
        "SELECT {EVALUATION_COLUMNS} FROM model_evaluation WHERE project_id = ?1 ORDER BY id"
    );
    let rows: Vec<EvaluationTuple> = sqlx::query_as(&sql)
        .bind(project_id)
        .fetch_all(pool)
        .await
        .context("list evaluations for project")?;
    Ok(rows.into_iter().map(from_tuple).collect())
}

pub(super) async fn list_evaluations_for_model(
    pool: &SqlitePool,
    model_id: i64,
) -> anyhow::Result<Vec<EvaluationRow>> {
    let sql =
        format!("SELECT {EVALUATION_COLUMNS} FROM model_evaluation WHERE model_id = ?1 ORDER BY id");
    let rows: Vec<EvaluationTuple> = sqlx::query_as(&sql)
        .bind(model_id)
        .fetch_all(pool)
        .await
        .context("list evaluations for model")?;
    Ok(rows.into_iter().map(from_tuple).collect())
}

pub(super) async fn set_judge_state(
    pool: &SqlitePool,
    id: i64,
    state: JudgeState,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE model_evaluation SET judge_state = ?1 WHERE id = ?2")
        .bind(state.to_string())
        .bind(id)
        .execute(pool)
        .await
        .context("update judge state")?;
    Ok(())
}

/// Persist the judge verdict and close the in-progress marker in one write.
pub(super) async fn record_judge_verdict(
    pool: &SqlitePool,
    id: i64,
    critique: &str,
    pass: bool,
) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE model_evaluation
         SET judge_critique_text = ?1, judge_pass = ?2, judge_state = 'judged'
         WHERE id = ?3",
    )
    .bind(critique)
    .bind(pass)
    .bind(id)
    .execute(pool)
    .await
    .context("record judge verdict")?;
    Ok(())
}

pub(super) async fn set_expert_pass(
    pool: &SqlitePool,
    id: i64,
    pass: Option<bool>,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE model_evaluation SET expert_pass = ?1 WHERE id = ?2")
        .bind(pass)
        .bind(id)
        .execute(pool)
        .await
        .context("update expert pass")?;
    Ok(())
}

pub(super) async fn set_expert_critique(
    pool: &SqlitePool,
    id: i64,
    critique: &str,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE model_evaluation SET expert_critique_text = ?1 WHERE id = ?2")
        .bind(critique)
        .bind(id)
        .execute(pool)
        .await
        .context("update expert critique")?;
    Ok(())
}

pub(super) async fn set_improved_output(
    pool: &SqlitePool,
    id: i64,
    improved_output: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE model_evaluation SET improved_output = ?1 WHERE id = ?2")
        .bind(improved_output)
        .bind(id)
        .execute(pool)
        .await
        .context("update improved output")?;
    Ok(())
}

/// Set the model output on the evaluation addressed by (model, synthetic
/// input). Returns whether a row was actually updated.
pub(super) async fn set_model_output(
    pool: &SqlitePool,
    model_id: i64,
    synthetic_data_id: i64,
    output: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE model_evaluation SET model_output = ?1
         WHERE model_id = ?2 AND synthetic_data_id = ?3",
    )
    .bind(output)
    .bind(model_id)
    .bind(synthetic_data_id)
    .execute(pool)
    .await
    .context("update model output")?;
    Ok(result.rows_affected() > 0)
}
