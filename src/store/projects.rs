use super::types::ProjectRow;
use crate::taxonomy::Taxonomy;
use anyhow::Context;
use chrono::Local;
use sqlx::SqlitePool;

pub(super) async fn create_project(pool: &SqlitePool, name: &str) -> anyhow::Result<ProjectRow> {
    let now = Local::now().to_rfc3339();
    let result = sqlx::query("INSERT INTO project (name, created_at) VALUES (?1, ?2)")
        .bind(name)
        .bind(&now)
        .execute(pool)
        .await
        .context("insert project")?;

    Ok(ProjectRow {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        model_summary: None,
        judge_prompt: None,
        model_input_dimensions: None,
    })
}

pub(super) async fn get_project(pool: &SqlitePool, id: i64) -> anyhow::Result<Option<ProjectRow>> {
    let row: Option<(i64, String, Option<String>, Option<String>, Option<String>)> =
        sqlx::query_as(
            "SELECT id, name, model_summary, judge_prompt, model_input_dimensions
             FROM project WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("query project")?;

    Ok(row.map(
        |(id, name, model_summary, judge_prompt, model_input_dimensions)| ProjectRow {
            id,
            name,
            model_summary,
            judge_prompt,
            model_input_dimensions,
        },
    ))
}

pub(super) async fn list_projects(pool: &SqlitePool) -> anyhow::Result<Vec<ProjectRow>> {
    let rows: Vec<(i64, String, Option<String>, Option<String>, Option<String>)> = sqlx::query_as(
        "SELECT id, name, model_summary, judge_prompt, model_input_dimensions
         FROM project ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .context("list projects")?;

    Ok(rows
        .into_iter()
        .map(
            |(id, name, model_summary, judge_prompt, model_input_dimensions)| ProjectRow {
                id,
                name,
                model_summary,
                judge_prompt,
                model_input_dimensions,
            },
        )
        .collect())
}

pub(super) async fn update_project_name(
    pool: &SqlitePool,
    id: i64,
    name: &str,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE project SET name = ?1 WHERE id = ?2")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await
        .context("update project name")?;
    Ok(())
}

pub(super) async fn update_model_summary(
    pool: &SqlitePool,
    id: i64,
    summary: &str,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE project SET model_summary = ?1 WHERE id = ?2")
        .bind(summary)
        .bind(id)
        .execute(pool)
        .await
        .context("update project summary")?;
    Ok(())
}

pub(super) async fn update_judge_prompt(
    pool: &SqlitePool,
    id: i64,
    judge_prompt: &str,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE project SET judge_prompt = ?1 WHERE id = ?2")
        .bind(judge_prompt)
        .bind(id)
        .execute(pool)
        .await
        .context("update judge prompt")?;
    Ok(())
}

pub(super) async fn update_taxonomy(
    pool: &SqlitePool,
    id: i64,
    taxonomy: &Taxonomy,
) -> anyhow::Result<()> {
    let json = serde_json::to_string(taxonomy).context("encode taxonomy")?;
    sqlx::query("UPDATE project SET model_input_dimensions = ?1 WHERE id = ?2")
        .bind(&json)
        .bind(id)
        .execute(pool)
        .await
        .context("update taxonomy")?;
    Ok(())
}

/// Delete a project and everything it owns.
pub(super) async fn delete_project(pool: &SqlitePool, id: i64) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM model_evaluation WHERE project_id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .context("delete project evaluations")?;
    sqlx::query("DELETE FROM synthetic_data WHERE project_id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .context("delete project synthetic inputs")?;
    sqlx::query("DELETE FROM model WHERE project_id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .context("delete project models")?;
    sqlx::query("DELETE FROM project WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .context("delete project")?;
    Ok(())
}
