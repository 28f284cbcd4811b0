use super::AppState;
use crate::judge;
use crate::optimize;
use crate::prompt::TAXONOMY_SYSTEM_PROMPT;
use crate::providers::CompletionRequest;
use crate::scoring;
use crate::synthesis;
use crate::taxonomy::{parse_taxonomy_response, Taxonomy};
use crate::transfer::{self, ImportEntry};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Deserializer};

const TAXONOMY_MAX_TOKENS: u32 = 4096;

/// Distinguishes an explicit JSON `null` from an absent field: absent stays
/// `None`, `null` becomes `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

fn error_json(message: impl std::fmt::Display) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": message.to_string()})),
    )
}

/// GET /health
pub(super) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ok",
        "store": state.store.health_check().await,
    });
    Json(body)
}

// ── Projects & models ───────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct CreateProjectBody {
    pub name: String,
}

/// POST /projects
pub(super) async fn handle_create_project(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectBody>,
) -> impl IntoResponse {
    match state.store.create_project(&body.name).await {
        Ok(project) => (
            StatusCode::OK,
            Json(serde_json::json!({"id": project.id, "name": project.name})),
        ),
        Err(e) => {
            tracing::error!("project creation failed: {e:#}");
            error_json("Failed to create project")
        }
    }
}

/// GET /projects/{id}
pub(super) async fn handle_get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.get_project(id).await {
        Ok(Some(project)) => {
            let taxonomy = project.taxonomy().ok().flatten();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "id": project.id,
                    "name": project.name,
                    "modelSummary": project.model_summary,
                    "judgePrompt": project.judge_prompt,
                    "taxonomy": taxonomy,
                })),
            )
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("Project {id} not found")})),
        ),
        Err(e) => {
            tracing::error!("project lookup failed: {e:#}");
            error_json("Failed to load project")
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateProjectBody {
    pub name: Option<String>,
    pub model_summary: Option<String>,
    pub judge_prompt: Option<String>,
    pub taxonomy: Option<Taxonomy>,
}

/// POST /projects/{id} — apply whichever project fields the request carries.
pub(super) async fn handle_update_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateProjectBody>,
) -> impl IntoResponse {
    match state.store.get_project(id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": format!("Project {id} not found")})),
            );
        }
        Err(e) => {
            tracing::error!("project lookup failed: {e:#}");
            return error_json("Failed to load project");
        }
    }

    if let Some(ref taxonomy) = body.taxonomy {
        if let Err(e) = taxonomy.validate() {
            return error_json(e);
        }
    }

    let result = async {
        if let Some(ref name) = body.name {
            state.store.update_project_name(id, name).await?;
        }
        if let Some(ref summary) = body.model_summary {
            state.store.update_model_summary(id, summary).await?;
        }
        if let Some(ref judge_prompt) = body.judge_prompt {
            state.store.update_judge_prompt(id, judge_prompt).await?;
        }
        if let Some(ref taxonomy) = body.taxonomy {
            state.store.update_taxonomy(id, taxonomy).await?;
        }
        anyhow::Ok(())
    }
    .await;

    match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"success": true}))),
        Err(e) => {
            tracing::error!("project update failed: {e:#}");
            error_json("Failed to update project")
        }
    }
}

/// DELETE /projects/{id} — removes the project and everything it owns.
pub(super) async fn handle_delete_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.delete_project(id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"success": true}))),
        Err(e) => {
            tracing::error!("project deletion failed: {e:#}");
            error_json("Failed to delete project")
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateModelBody {
    pub project_id: i64,
}

/// POST /models — register the next model version for a project.
pub(super) async fn handle_create_model(
    State(state): State<AppState>,
    Json(body): Json<CreateModelBody>,
) -> impl IntoResponse {
    match state.store.create_model(body.project_id).await {
        Ok(model) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": model.id,
                "projectId": model.project_id,
                "versionNumber": model.version_number,
            })),
        ),
        Err(e) => {
            tracing::error!("model creation failed: {e:#}");
            error_json("Failed to create model")
        }
    }
}

/// DELETE /models/{id} — removes the model and its evaluations.
pub(super) async fn handle_delete_model(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.delete_model(id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"success": true}))),
        Err(e) => {
            tracing::error!("model deletion failed: {e:#}");
            error_json("Failed to delete model")
        }
    }
}

/// DELETE /synthetic/{id} — administrative removal of one synthetic input
/// and the evaluations pairing it.
pub(super) async fn handle_delete_synthetic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.delete_synthetic(id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"success": true}))),
        Err(e) => {
            tracing::error!("synthetic input deletion failed: {e:#}");
            error_json("Failed to delete synthetic input")
        }
    }
}

// ── Taxonomy automation ─────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct TaxonomyAutomateBody {
    pub taxonomy: String,
}

/// POST /taxonomy-automate — convert free-text specifications into the
/// structured taxonomy, validated once here at the automation boundary.
pub(super) async fn handle_taxonomy_automate(
    State(state): State<AppState>,
    Json(body): Json<TaxonomyAutomateBody>,
) -> impl IntoResponse {
    let prompt = match state.prompts.taxonomy_user_prompt(&body.taxonomy) {
        Ok(prompt) => prompt,
        Err(e) => {
            tracing::error!("taxonomy prompt render failed: {e:#}");
            return error_json("Failed to build taxonomy prompt");
        }
    };

    let request = CompletionRequest::new(prompt)
        .with_system(TAXONOMY_SYSTEM_PROMPT)
        .with_temperature(0.0)
        .with_max_tokens(TAXONOMY_MAX_TOKENS);

    let response = match state.provider.complete(request).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("taxonomy automation failed: {e:#}");
            return error_json(format!("{e:#}"));
        }
    };

    match parse_taxonomy_response(&response) {
        Ok(taxonomy) => (StatusCode::OK, Json(serde_json::json!(taxonomy))),
        Err(e) => {
            tracing::error!("taxonomy parse failed: {e}");
            error_json(format!("Failed to parse response as JSON: {e}"))
        }
    }
}

// ── Synthesis ───────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SynthesizeBody {
    pub json_context: Taxonomy,
    pub scenario: String,
    pub project_id: i64,
}

/// POST /synthesize — one scenario, one completion call, one persisted row.
pub(super) async fn handle_synthesize(
    State(state): State<AppState>,
    Json(body): Json<SynthesizeBody>,
) -> impl IntoResponse {
    match synthesis::synthesize_one(
        &state.store,
        state.provider.as_ref(),
        &state.prompts,
        &body.json_context,
        &body.scenario,
        body.project_id,
    )
    .await
    {
        Ok(response) => (
            StatusCode::OK,
            Json(serde_json::json!({"response": response})),
        ),
        Err(e) => {
            tracing::error!("scenario processing failed: {e:#}");
            error_json(format!("{e:#}"))
        }
    }
}

// ── Judging ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JudgeBody {
    pub evaluation_id: i64,
}

/// POST /judge
pub(super) async fn handle_judge(
    State(state): State<AppState>,
    Json(body): Json<JudgeBody>,
) -> impl IntoResponse {
    match judge::judge(
        &state.store,
        state.provider.as_ref(),
        &state.prompts,
        body.evaluation_id,
    )
    .await
    {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({"success": true}))),
        Err(e) => {
            tracing::error!(evaluation_id = body.evaluation_id, "judge failed: {e}");
            error_json(e)
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JudgeOptimizeBody {
    pub project_id: i64,
}

/// POST /judge-optimize
pub(super) async fn handle_judge_optimize(
    State(state): State<AppState>,
    Json(body): Json<JudgeOptimizeBody>,
) -> impl IntoResponse {
    match optimize::optimize(
        &state.store,
        state.provider.as_ref(),
        &state.prompts,
        body.project_id,
    )
    .await
    {
        Ok(improved) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true, "improvedPrompt": improved})),
        ),
        Err(e) => {
            tracing::error!(project_id = body.project_id, "optimize failed: {e}");
            error_json(e)
        }
    }
}

// ── Evaluation lifecycle ────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncBody {
    pub project_id: i64,
    pub model_id: i64,
}

/// POST /sync — create missing evaluation rows for a model. Idempotent.
pub(super) async fn handle_sync(
    State(state): State<AppState>,
    Json(body): Json<SyncBody>,
) -> impl IntoResponse {
    match state
        .store
        .sync_evaluations(body.project_id, body.model_id)
        .await
    {
        Ok(created) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true, "created": created})),
        ),
        Err(e) => {
            tracing::error!("evaluation sync failed: {e:#}");
            error_json("Failed to sync evaluations")
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ExpertReviewBody {
    pub evaluation_id: i64,
    /// Absent: unchanged. `null`: cleared back to undecided.
    #[serde(default, deserialize_with = "double_option")]
    pub expert_pass: Option<Option<bool>>,
    pub expert_critique: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub improved_output: Option<Option<String>>,
}

/// POST /expert-review — apply whichever expert fields the request carries,
/// keyed strictly by evaluation id. Last writer wins.
pub(super) async fn handle_expert_review(
    State(state): State<AppState>,
    Json(body): Json<ExpertReviewBody>,
) -> impl IntoResponse {
    match state.store.get_evaluation(body.evaluation_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_json(format!("Evaluation {} not found", body.evaluation_id));
        }
        Err(e) => {
            tracing::error!("evaluation lookup failed: {e:#}");
            return error_json("Failed to load evaluation");
        }
    }

    let result = async {
        if let Some(pass) = body.expert_pass {
            state.store.set_expert_pass(body.evaluation_id, pass).await?;
        }
        if let Some(ref critique) = body.expert_critique {
            state
                .store
                .set_expert_critique(body.evaluation_id, critique)
                .await?;
        }
        if let Some(ref improved) = body.improved_output {
            state
                .store
                .set_improved_output(body.evaluation_id, improved.as_deref())
                .await?;
        }
        anyhow::Ok(())
    }
    .await;

    match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"success": true}))),
        Err(e) => {
            tracing::error!("expert review update failed: {e:#}");
            error_json("Failed to update evaluation")
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ScoreBody {
    pub model_id: i64,
}

/// POST /score — aggregate a model's evaluations and persist the overall
/// score on the model row. Display-rounded copies ride along.
pub(super) async fn handle_score(
    State(state): State<AppState>,
    Json(body): Json<ScoreBody>,
) -> impl IntoResponse {
    let rows = match state.store.list_evaluations_for_model(body.model_id).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("evaluation listing failed: {e:#}");
            return error_json("Failed to load evaluations");
        }
    };

    let scores = scoring::score(&rows);
    if let Err(e) = state
        .store
        .set_model_score(body.model_id, scores.overall)
        .await
    {
        tracing::error!("score persistence failed: {e:#}");
        return error_json("Failed to persist score");
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "overall": scores.overall,
            "judgeQuality": scores.judge_quality,
            "overallDisplay": scoring::display_rounded(scores.overall),
            "judgeQualityDisplay": scoring::display_rounded(scores.judge_quality),
        })),
    )
}

// ── Bulk exchange ───────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ExportBody {
    pub project_id: i64,
}

/// POST /export — `[{id, input}]` for a project's synthetic inputs.
pub(super) async fn handle_export(
    State(state): State<AppState>,
    Json(body): Json<ExportBody>,
) -> impl IntoResponse {
    match transfer::export_inputs(&state.store, body.project_id).await {
        Ok(entries) => (StatusCode::OK, Json(serde_json::json!(entries))),
        Err(e) => {
            tracing::error!("export failed: {e:#}");
            error_json("Failed to export inputs")
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ImportBody {
    pub model_id: i64,
    pub outputs: Vec<ImportEntry>,
}

/// POST /import — `[{id, output}]` applied onto one model's evaluations.
pub(super) async fn handle_import(
    State(state): State<AppState>,
    Json(body): Json<ImportBody>,
) -> impl IntoResponse {
    match transfer::import_outputs(&state.store, body.model_id, &body.outputs).await {
        Ok(report) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "updated": report.updated,
                "missing": report.missing,
            })),
        ),
        Err(e) => {
            tracing::error!("import failed: {e:#}");
            error_json("Failed to import outputs")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesize_body_parses_camel_case() {
        let body: SynthesizeBody = serde_json::from_str(
            r#"{
                "jsonContext": {"dimensions": [{"name": "A", "subdimensions": ["x"]}], "summary": "s"},
                "scenario": "A: x.",
                "projectId": 4
            }"#,
        )
        .unwrap();
        assert_eq!(body.project_id, 4);
        assert_eq!(body.scenario, "A: x.");
        assert_eq!(body.json_context.dimensions.len(), 1);
    }

    #[test]
    fn judge_body_requires_evaluation_id() {
        let ok: Result<JudgeBody, _> = serde_json::from_str(r#"{"evaluationId": 9}"#);
        assert_eq!(ok.unwrap().evaluation_id, 9);

        let missing: Result<JudgeBody, _> = serde_json::from_str(r#"{}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn expert_review_distinguishes_null_from_absent() {
        let absent: ExpertReviewBody =
            serde_json::from_str(r#"{"evaluationId": 1}"#).unwrap();
        assert_eq!(absent.expert_pass, None);

        let null: ExpertReviewBody =
            serde_json::from_str(r#"{"evaluationId": 1, "expertPass": null}"#).unwrap();
        assert_eq!(null.expert_pass, Some(None));

        let set: ExpertReviewBody =
            serde_json::from_str(r#"{"evaluationId": 1, "expertPass": false}"#).unwrap();
        assert_eq!(set.expert_pass, Some(Some(false)));
    }

    #[test]
    fn import_body_carries_entries() {
        let body: ImportBody = serde_json::from_str(
            r#"{"modelId": 2, "outputs": [{"id": 5, "output": "text"}]}"#,
        )
        .unwrap();
        assert_eq!(body.model_id, 2);
        assert_eq!(body.outputs.len(), 1);
    }
}
