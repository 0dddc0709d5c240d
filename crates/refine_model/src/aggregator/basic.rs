use serde::Serialize;

use crate::booster::BoosterCombo;
use crate::resolver::BasicState;
use crate::tables::{BasicTable, TableError};

use super::{ExpectedResourceCost, Segment};

/// Closed-form expectation for clearing one basic level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelExpectation {
    pub level: u32,
    pub expected_attempts: f64,
    /// Attempts needed when every roll fails and only pity succeeds.
    pub max_attempts: u32,
}

/// Expected attempts to clear `level` with `combo` on every attempt.
///
/// Failures are deterministic given the attempt index, so the chain of
/// failure states is walked once: `P(reach attempt k) = prod(1 - p_j, j < k)`
/// and `E = sum(P(reach attempt k))`. The chain ends at the attempt pity
/// guarantees.
pub fn level_expectation(
    table: &BasicTable,
    level: u32,
    combo: BoosterCombo,
) -> Result<LevelExpectation, TableError> {
    let row = table.row(level)?;
    let mut state = BasicState::new(level);
    let mut reach = 1.0;
    let mut expected_attempts = 0.0;
    let mut max_attempts = 0;

    loop {
        max_attempts += 1;
        expected_attempts += reach;
        if state.is_guaranteed() {
            break;
        }
        let probability = table.probability(level, combo, state.probability_bonus)?;
        reach *= 1.0 - probability;
        if reach <= 0.0 {
            break;
        }
        state = state.after_failure(probability, row.base_probability);
    }

    Ok(LevelExpectation {
        level,
        expected_attempts,
        max_attempts,
    })
}

pub fn level_expectations(
    table: &BasicTable,
    from: u32,
    to: u32,
    combo: BoosterCombo,
) -> Result<Vec<LevelExpectation>, TableError> {
    (from..to)
        .map(|level| level_expectation(table, level, combo))
        .collect()
}

/// Expected resources to go from `from` to `to`, one segment per level.
pub(super) fn basic_expected(
    table: &BasicTable,
    from: u32,
    to: u32,
    combo: BoosterCombo,
) -> Result<ExpectedResourceCost, TableError> {
    let mut total = ExpectedResourceCost::default();
    for level in from..to {
        let expectation = level_expectation(table, level, combo)?;
        let attempts = expectation.expected_attempts;
        let row = table.row(level)?;
        let materials = table.attempt_materials(level, combo)?.scaled(attempts);
        let flat_gold = row.cost.gold as f64 * attempts;

        tracing::debug!(
            equipment = table.equipment.name(),
            level,
            expected_attempts = attempts,
            max_attempts = expectation.max_attempts,
            "basic level expectation"
        );

        total += ExpectedResourceCost {
            expected_attempts: attempts,
            paid_attempts: attempts,
            materials,
            flat_gold,
            segments: vec![Segment {
                from: level,
                to: level + 1,
                expected_attempts: attempts,
                paid_attempts: attempts,
                flat_gold,
            }],
        };
    }
    Ok(total)
}
