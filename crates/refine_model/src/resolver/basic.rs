use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::booster::BoosterCombo;
use crate::ledger::MaterialLedger;
use crate::tables::{BasicTable, FAILURE_BONUS_RATIO, PITY_DIVISOR, TableError, is_pity_full};

use super::roll;

/// Progress of one item on the basic scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicState {
    pub level: u32,
    /// Pity meter in `[0, 1]`; full means the next attempt succeeds.
    pub pity: f64,
    /// Standing bonus earned by failures, in `[0, base probability]`.
    pub probability_bonus: f64,
}

impl BasicState {
    pub fn new(level: u32) -> Self {
        Self {
            level,
            pity: 0.0,
            probability_bonus: 0.0,
        }
    }

    pub fn is_guaranteed(&self) -> bool {
        is_pity_full(self.pity)
    }

    /// State after failing an attempt that had `probability` to succeed.
    pub fn after_failure(&self, probability: f64, base_probability: f64) -> Self {
        Self {
            level: self.level,
            pity: (self.pity + probability / PITY_DIVISOR).min(1.0),
            probability_bonus: (self.probability_bonus + FAILURE_BONUS_RATIO * base_probability)
                .min(base_probability),
        }
    }

    pub fn after_success(&self) -> Self {
        Self::new(self.level + 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicAttempt {
    pub success: bool,
    /// The pity meter was full, no roll was made.
    pub guaranteed: bool,
    pub probability: f64,
    pub combo: BoosterCombo,
    pub state: BasicState,
    pub materials: MaterialLedger,
    pub gold: f64,
}

/// Resolve one attempt from `state`.
///
/// The level and combo are checked against `table` before anything is rolled.
pub fn resolve_basic_attempt<R: Rng + ?Sized>(
    table: &BasicTable,
    state: &BasicState,
    combo: BoosterCombo,
    rng: &mut R,
) -> Result<BasicAttempt, TableError> {
    let row = table.row(state.level)?;
    let probability = table.probability(state.level, combo, state.probability_bonus)?;
    let materials = table.attempt_materials(state.level, combo)?;

    let guaranteed = state.is_guaranteed();
    let success = guaranteed || roll(rng) < probability;
    let next = if success {
        state.after_success()
    } else {
        state.after_failure(probability, row.base_probability)
    };

    Ok(BasicAttempt {
        success,
        guaranteed,
        probability,
        combo,
        state: next,
        materials,
        gold: row.cost.gold as f64,
    })
}
