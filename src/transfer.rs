//! Bulk input/output exchange: export synthetic inputs as `[{id, input}]`,
//! import model outputs as `[{id, output}]`, keyed by the synthetic-input
//! identifier. Export-then-import round-trips exactly.

use crate::store::Store;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub id: i64,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEntry {
    pub id: i64,
    pub output: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportReport {
    pub updated: usize,
    /// Ids with no matching (model, synthetic input) evaluation row.
    pub missing: Vec<i64>,
}

pub async fn export_inputs(store: &Store, project_id: i64) -> anyhow::Result<Vec<ExportEntry>> {
    let rows = store.list_synthetic(project_id).await?;
    Ok(rows
        .into_iter()
        .map(|row| ExportEntry {
            id: row.id,
            input: row.data,
        })
        .collect())
}

/// Apply model outputs onto the evaluations of one model, addressed strictly
/// by synthetic-input id. Unknown ids are reported, never silently dropped.
pub async fn import_outputs(
    store: &Store,
    model_id: i64,
    entries: &[ImportEntry],
) -> anyhow::Result<ImportReport> {
    let mut report = ImportReport::default();
    for entry in entries {
        if store
            .set_model_output(model_id, entry.id, &entry.output)
            .await?
        {
            report.updated += 1;
        } else {
            report.missing.push(entry.id);
        }
    }
    Ok(report)
}
