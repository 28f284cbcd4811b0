//! Score aggregation over evaluation rows. Pure; rounding happens only at
//! display boundaries.

use crate::store::EvaluationRow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    /// Percentage of rows the expert passed.
    pub overall: f64,
    /// Percentage of rows where judge and expert verdicts agree. Two unset
    /// verdicts count as agreeing: agreement is raw equality of the two
    /// nullable booleans.
    pub judge_quality: f64,
}

#[allow(clippy::cast_precision_loss)]
pub fn score(evaluations: &[EvaluationRow]) -> Scores {
    let total = evaluations.len();
    if total == 0 {
        return Scores {
            overall: 0.0,
            judge_quality: 0.0,
        };
    }

    let expert_pass_count = evaluations
        .iter()
        .filter(|e| e.expert_pass == Some(true))
        .count();
    let matching = evaluations
        .iter()
        .filter(|e| e.judge_pass == e.expert_pass)
        .count();

    Scores {
        overall: 100.0 * expert_pass_count as f64 / total as f64,
        judge_quality: 100.0 * matching as f64 / total as f64,
    }
}

/// One-decimal rounding for display surfaces.
pub fn display_rounded(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
