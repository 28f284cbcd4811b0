//! Scenario expansion: the cartesian product of subdimension choices, one
//! choice per dimension, rendered as descriptive strings.

use crate::taxonomy::Dimension;

/// Expand dimensions into every combination of one subdimension per
/// dimension, in declaration order (outer loop = first dimension).
///
/// Dimensions with no subdimensions are excluded from the product rather
/// than multiplying it by zero. Pure function; the output length always
/// equals [`total_combinations`].
pub fn generate(dimensions: &[Dimension]) -> Vec<String> {
    let valid: Vec<&Dimension> = dimensions
        .iter()
        .filter(|d| !d.subdimensions.is_empty())
        .collect();

    let mut scenarios = Vec::with_capacity(total_combinations(dimensions));
    let mut current: Vec<&str> = Vec::with_capacity(valid.len());
    expand(&valid, &mut current, &mut scenarios);
    scenarios
}

fn expand<'a>(dims: &[&'a Dimension], current: &mut Vec<&'a str>, out: &mut Vec<String>) {
    if current.len() == dims.len() {
        let mut scenario = dims
            .iter()
            .zip(current.iter())
            .map(|(dim, choice)| format!("{}: {}", dim.name, choice))
            .collect::<Vec<_>>()
            .join(". ");
        if !scenario.is_empty() {
            scenario.push('.');
        }
        out.push(scenario);
        return;
    }

    let index = current.len();
    for subdim in &dims[index].subdimensions {
        current.push(subdim.as_str());
        expand(dims, current, out);
        current.pop();
    }
}

/// Size of the scenario space: the product of subdimension counts over the
/// filtered dimension set (empty product = 1).
pub fn total_combinations(dimensions: &[Dimension]) -> usize {
    dimensions
        .iter()
        .filter(|d| !d.subdimensions.is_empty())
        .map(|d| d.subdimensions.len())
        .product()
}
