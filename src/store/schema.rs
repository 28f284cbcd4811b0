use anyhow::Context;
use sqlx::SqlitePool;

pub(super) async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS project (
            id                     INTEGER PRIMARY KEY AUTOINCREMENT,
            name                   TEXT NOT NULL,
            model_summary          TEXT,
            judge_prompt           TEXT,
            model_input_dimensions TEXT,
            created_at             TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS model (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id     INTEGER NOT NULL REFERENCES project(id),
            score          REAL,
            version_number INTEGER NOT NULL,
            created_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_model_project ON model(project_id);

        CREATE TABLE IF NOT EXISTS synthetic_data (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES project(id),
            data       TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_synthetic_project ON synthetic_data(project_id);

        CREATE TABLE IF NOT EXISTS model_evaluation (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id           INTEGER NOT NULL REFERENCES project(id),
            model_id             INTEGER NOT NULL REFERENCES model(id),
            synthetic_data_id    INTEGER NOT NULL REFERENCES synthetic_data(id),
            model_output         TEXT,
            judge_state          TEXT NOT NULL DEFAULT 'unjudged',
            judge_critique_text  TEXT,
            judge_pass           INTEGER,
            expert_critique_text TEXT,
            expert_pass          INTEGER,
            improved_output      TEXT,
            created_at           TEXT NOT NULL,
            UNIQUE(model_id, synthetic_data_id)
        );
        CREATE INDEX IF NOT EXISTS idx_evaluation_project ON model_evaluation(project_id);
        CREATE INDEX IF NOT EXISTS idx_evaluation_model ON model_evaluation(model_id);",
    )
    .execute(pool)
    .await
    .context("init schema")?;

    Ok(())
}
