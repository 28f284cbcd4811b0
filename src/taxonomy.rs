//! Input-space taxonomy: the validated schema exchanged between the chat
//! dialogue, the automation step, and the scenario generator.

use crate::error::TaxonomyError;
use serde::{Deserialize, Serialize};

/// One axis of variation with its enumerated options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub subdimensions: Vec<String>,
    #[serde(default)]
    pub decision_logic: String,
    #[serde(default)]
    pub objective: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub summary: String,
}

impl Taxonomy {
    /// Validate once at the automation boundary; downstream consumers trust
    /// the shape. Dimensions with no subdimensions are legal — the scenario
    /// generator filters them out rather than treating them as errors.
    pub fn validate(&self) -> Result<(), TaxonomyError> {
        if self.dimensions.is_empty() {
            return Err(TaxonomyError::Validation(
                "taxonomy has no dimensions".into(),
            ));
        }
        for (i, dim) in self.dimensions.iter().enumerate() {
            if dim.name.trim().is_empty() {
                return Err(TaxonomyError::Validation(format!(
                    "dimension {i} has an empty name"
                )));
            }
        }
        Ok(())
    }

    /// Background context for the synthesis prompt: `objective` fields are
    /// stripped, keeping name, subdimensions and decision logic only.
    pub fn context_without_objectives(&self) -> serde_json::Value {
        serde_json::json!({
            "dimensions": self
                .dimensions
                .iter()
                .map(|dim| {
                    serde_json::json!({
                        "name": dim.name,
                        "subdimensions": dim.subdimensions,
                        "decision_logic": dim.decision_logic,
                    })
                })
                .collect::<Vec<_>>(),
            "summary": self.summary,
        })
    }
}

/// Parse a completion-service response into a taxonomy.
///
/// Tries the whole response as JSON first; models occasionally wrap the
/// object in prose, so fall back to the outermost `{...}` block before
/// giving up.
pub fn parse_taxonomy_response(text: &str) -> Result<Taxonomy, TaxonomyError> {
    let taxonomy: Taxonomy = match serde_json::from_str(text) {
        Ok(parsed) => parsed,
        Err(primary) => {
            let candidate = extract_json_object(text)
                .ok_or_else(|| TaxonomyError::Parse(primary.to_string()))?;
            serde_json::from_str(candidate).map_err(|e| TaxonomyError::Parse(e.to_string()))?
        }
    };
    taxonomy.validate()?;
    Ok(taxonomy)
}

/// Outermost `{...}` span of the text, if any.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
