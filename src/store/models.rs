use super::types::ModelRow;
use anyhow::Context;
use chrono::Local;
use sqlx::SqlitePool;

/// Create the next model version for a project (1-based, append-only).
pub(super) async fn create_model(pool: &SqlitePool, project_id: i64) -> anyhow::Result<ModelRow> {
    let next_version: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(version_number), 0) + 1 FROM model WHERE project_id = ?1",
    )
    .bind(project_id)
    .fetch_one(pool)
    .await
    .context("next model version")?;

    let now = Local::now().to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO model (project_id, version_number, created_at) VALUES (?1, ?2, ?3)",
    )
    .bind(project_id)
    .bind(next_version)
    .bind(&now)
    .execute(pool)
    .await
    .context("insert model")?;

    Ok(ModelRow {
        id: result.last_insert_rowid(),
        project_id,
        score: None,
        version_number: next_version,
    })
}

pub(super) async fn get_model(pool: &SqlitePool, id: i64) -> anyhow::Result<Option<ModelRow>> {
    let row: Option<(i64, i64, Option<f64>, i64)> = sqlx::query_as(
        "SELECT id, project_id, score, version_number FROM model WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("query model")?;

    Ok(row.map(|(id, project_id, score, version_number)| ModelRow {
        id,
        project_id,
        score,
        version_number,
    }))
}

pub(super) async fn list_models(
    pool: &SqlitePool,
    project_id: i64,
) -> anyhow::Result<Vec<ModelRow>> {
    let rows: Vec<(i64, i64, Option<f64>, i64)> = sqlx::query_as(
        "SELECT id, project_id, score, version_number
         FROM model WHERE project_id = ?1 ORDER BY version_number",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
    .context("list models")?;

    Ok(rows
        .into_iter()
        .map(|(id, project_id, score, version_number)| ModelRow {
            id,
            project_id,
            score,
            version_number,
        })
        .collect())
}

pub(super) async fn set_model_score(pool: &SqlitePool, id: i64, score: f64) -> anyhow::Result<()> {
    sqlx::query("UPDATE model SET score = ?1 WHERE id = ?2")
        .bind(score)
        .bind(id)
        .execute(pool)
        .await
        .context("update model score")?;
    Ok(())
}

/// Delete a model and its evaluations.
pub(super) async fn delete_model(pool: &SqlitePool, id: i64) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM model_evaluation WHERE model_id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .context("delete model evaluations")?;
    sqlx::query("DELETE FROM model WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .context("delete model")?;
    Ok(())
}
