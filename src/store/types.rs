use crate::taxonomy::Taxonomy;
use strum::{Display, EnumString};

/// Judge lifecycle for an evaluation row. Persisted as TEXT so a
/// crashed-mid-judge row (`in_progress`) is distinguishable from a
/// never-started one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum JudgeState {
    #[default]
    Unjudged,
    InProgress,
    Judged,
}

#[derive(Debug, Clone)]
pub struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub model_summary: Option<String>,
    pub judge_prompt: Option<String>,
    /// Taxonomy persisted as structured JSON.
    pub model_input_dimensions: Option<String>,
}

impl ProjectRow {
    /// Decode the persisted taxonomy, if one has been set.
    pub fn taxonomy(&self) -> anyhow::Result<Option<Taxonomy>> {
        match self.model_input_dimensions.as_deref() {
            None => Ok(None),
            Some(json) => {
                let taxonomy = serde_json::from_str(json)?;
                Ok(Some(taxonomy))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelRow {
    pub id: i64,
    pub project_id: i64,
    pub score: Option<f64>,
    pub version_number: i64,
}

#[derive(Debug, Clone)]
pub struct SyntheticInputRow {
    pub id: i64,
    pub project_id: i64,
    pub data: String,
}

/// One row per (model, synthetic input) pair. Fields fill in over time and
/// are never required to be fully populated.
#[derive(Debug, Clone, Default)]
pub struct EvaluationRow {
    pub id: i64,
    pub project_id: i64,
    pub model_id: i64,
    pub synthetic_data_id: i64,
    pub model_output: Option<String>,
    pub judge_state: JudgeState,
    pub judge_critique_text: Option<String>,
    pub judge_pass: Option<bool>,
    pub expert_critique_text: Option<String>,
    pub expert_pass: Option<bool>,
    pub improved_output: Option<String>,
}

pub(super) fn str_to_judge_state(s: &str) -> JudgeState {
    s.parse().unwrap_or_default()
}
