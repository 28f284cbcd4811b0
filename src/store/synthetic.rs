use super::types::SyntheticInputRow;
use anyhow::Context;
use chrono::Local;
use sqlx::SqlitePool;

pub(super) async fn insert_synthetic(
    pool: &SqlitePool,
    project_id: i64,
    data: &str,
) -> anyhow::Result<SyntheticInputRow> {
    let now = Local::now().to_rfc3339();
    let result =
        sqlx::query("INSERT INTO synthetic_data (project_id, data, created_at) VALUES (?1, ?2, ?3)")
            .bind(project_id)
            .bind(data)
            .bind(&now)
            .execute(pool)
            .await
            .context("insert synthetic input")?;

    Ok(SyntheticInputRow {
        id: result.last_insert_rowid(),
        project_id,
        data: data.to_string(),
    })
}

pub(super) async fn get_synthetic(
    pool: &SqlitePool,
    id: i64,
) -> anyhow::Result<Option<SyntheticInputRow>> {
    let row: Option<(i64, i64, String)> =
        sqlx::query_as("SELECT id, project_id, data FROM synthetic_data WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("query synthetic input")?;

    Ok(row.map(|(id, project_id, data)| SyntheticInputRow {
        id,
        project_id,
        data,
    }))
}

pub(super) async fn list_synthetic(
    pool: &SqlitePool,
    project_id: i64,
) -> anyhow::Result<Vec<SyntheticInputRow>> {
    let rows: Vec<(i64, i64, String)> = sqlx::query_as(
        "SELECT id, project_id, data FROM synthetic_data WHERE project_id = ?1 ORDER BY id",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
    .context("list synthetic inputs")?;

    Ok(rows
        .into_iter()
        .map(|(id, project_id, data)| SyntheticInputRow {
            id,
            project_id,
            data,
        })
        .collect())
}

/// Administrative deletion; also removes evaluations pairing this input.
pub(super) async fn delete_synthetic(pool: &SqlitePool, id: i64) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM model_evaluation WHERE synthetic_data_id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .context("delete evaluations for synthetic input")?;
    sqlx::query("DELETE FROM synthetic_data WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .context("delete synthetic input")?;
    Ok(())
}
