//! SQLite-backed project store.
//!
//! One row per entity, addressed by its own identifier; all updates are
//! last-writer-wins with no cross-row transactions. Concurrent edits to the
//! same evaluation row may race — accepted, not guarded against.

mod evaluations;
mod models;
mod projects;
mod schema;
mod synthetic;
pub mod types;

pub use types::{EvaluationRow, JudgeState, ModelRow, ProjectRow, SyntheticInputRow};

use crate::taxonomy::Taxonomy;
use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database at the given path.
    pub async fn open(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("create database directory")?;
        }

        let url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePool::connect(&url)
            .await
            .context("open SQLite database")?;

        schema::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Open an in-memory database (tests, dry runs). Capped to a single
    /// connection so every query sees the same database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("open in-memory SQLite")?;
        schema::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Health check: execute a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    // ── Projects ─────────────────────────────────────────────

    pub async fn create_project(&self, name: &str) -> anyhow::Result<ProjectRow> {
        projects::create_project(&self.pool, name).await
    }

    pub async fn get_project(&self, id: i64) -> anyhow::Result<Option<ProjectRow>> {
        projects::get_project(&self.pool, id).await
    }

    pub async fn list_projects(&self) -> anyhow::Result<Vec<ProjectRow>> {
        projects::list_projects(&self.pool).await
    }

    pub async fn update_project_name(&self, id: i64, name: &str) -> anyhow::Result<()> {
        projects::update_project_name(&self.pool, id, name).await
    }

    pub async fn update_model_summary(&self, id: i64, summary: &str) -> anyhow::Result<()> {
        projects::update_model_summary(&self.pool, id, summary).await
    }

    pub async fn update_judge_prompt(&self, id: i64, judge_prompt: &str) -> anyhow::Result<()> {
        projects::update_judge_prompt(&self.pool, id, judge_prompt).await
    }

    pub async fn update_taxonomy(&self, id: i64, taxonomy: &Taxonomy) -> anyhow::Result<()> {
        projects::update_taxonomy(&self.pool, id, taxonomy).await
    }

    pub async fn delete_project(&self, id: i64) -> anyhow::Result<()> {
        projects::delete_project(&self.pool, id).await
    }

    // ── Models ───────────────────────────────────────────────

    pub async fn create_model(&self, project_id: i64) -> anyhow::Result<ModelRow> {
        models::create_model(&self.pool, project_id).await
    }

    pub async fn get_model(&self, id: i64) -> anyhow::Result<Option<ModelRow>> {
        models::get_model(&self.pool, id).await
    }

    pub async fn list_models(&self, project_id: i64) -> anyhow::Result<Vec<ModelRow>> {
        models::list_models(&self.pool, project_id).await
    }

    pub async fn set_model_score(&self, id: i64, score: f64) -> anyhow::Result<()> {
        models::set_model_score(&self.pool, id, score).await
    }

    pub async fn delete_model(&self, id: i64) -> anyhow::Result<()> {
        models::delete_model(&self.pool, id).await
    }

    // ── Synthetic inputs ─────────────────────────────────────

    pub async fn insert_synthetic(
        &self,
        project_id: i64,
        data: &str,
    ) -> anyhow::Result<SyntheticInputRow> {
        synthetic::insert_synthetic(&self.pool, project_id, data).await
    }

    pub async fn get_synthetic(&self, id: i64) -> anyhow::Result<Option<SyntheticInputRow>> {
        synthetic::get_synthetic(&self.pool, id).await
    }

    pub async fn list_synthetic(&self, project_id: i64) -> anyhow::Result<Vec<SyntheticInputRow>> {
        synthetic::list_synthetic(&self.pool, project_id).await
    }

    pub async fn delete_synthetic(&self, id: i64) -> anyhow::Result<()> {
        synthetic::delete_synthetic(&self.pool, id).await
    }

    // ── Evaluations ──────────────────────────────────────────

    pub async fn sync_evaluations(&self, project_id: i64, model_id: i64) -> anyhow::Result<u64> {
        evaluations::sync_evaluations(&self.pool, project_id, model_id).await
    }

    pub async fn get_evaluation(&self, id: i64) -> anyhow::Result<Option<EvaluationRow>> {
        evaluations::get_evaluation(&self.pool, id).await
    }

    pub async fn list_evaluations_for_project(
        &self,
        project_id: i64,
    ) -> anyhow::Result<Vec<EvaluationRow>> {
        evaluations::list_evaluations_for_project(&self.pool, project_id).await
    }

    pub async fn list_evaluations_for_model(
        &self,
        model_id: i64,
    ) -> anyhow::Result<Vec<EvaluationRow>> {
        evaluations::list_evaluations_for_model(&self.pool, model_id).await
    }

    pub async fn set_judge_state(&self, id: i64, state: JudgeState) -> anyhow::Result<()> {
        evaluations::set_judge_state(&self.pool, id, state).await
    }

    pub async fn record_judge_verdict(
        &self,
        id: i64,
        critique: &str,
        pass: bool,
    ) -> anyhow::Result<()> {
        evaluations::record_judge_verdict(&self.pool, id, critique, pass).await
    }

    pub async fn set_expert_pass(&self, id: i64, pass: Option<bool>) -> anyhow::Result<()> {
        evaluations::set_expert_pass(&self.pool, id, pass).await
    }

    pub async fn set_expert_critique(&self, id: i64, critique: &str) -> anyhow::Result<()> {
        evaluations::set_expert_critique(&self.pool, id, critique).await
    }

    pub async fn set_improved_output(
        &self,
        id: i64,
        improved_output: Option<&str>,
    ) -> anyhow::Result<()> {
        evaluations::set_improved_output(&self.pool, id, improved_output).await
    }

    pub async fn set_model_output(
        &self,
        model_id: i64,
        synthetic_data_id: i64,
        output: &str,
    ) -> anyhow::Result<bool> {
        evaluations::set_model_output(&self.pool, model_id, synthetic_data_id, output).await
    }
}
