mod advanced;
mod basic;

use crate::booster::BoosterCombo;
use crate::data::{EquipmentType, MaterialKind};
use crate::ledger::MaterialLedger;

pub use advanced::{
    AdvancedStageData, AdvancedTable, Ancestor, AncestorCard, ExpEffect, GRADE_PROBABILITIES,
    Grade, NUM_GRADES, SideEffect, StageGroup, expected_grade_exp, grade_distribution, stage_of,
};
pub use basic::{
    BREATH_BONUS_RATIO, BasicLevelData, BasicTable, FAILURE_BONUS_RATIO, PITY_DIVISOR,
    attempt_probability, is_pity_full,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("level {level} is outside the supported range {min}..={max}")]
    InvalidLevel { level: u32, min: u32, max: u32 },

    #[error("booster combination '{combo}' is not available at level {level}")]
    InvalidBoosterCombo { level: u32, combo: BoosterCombo },

    #[error("inconsistent table {table}: {detail}")]
    Inconsistent { table: &'static str, detail: String },
}

/// Fixed materials and gold spent by one paid attempt, before boosters.
///
/// `stones` resolves to the destruction or guardian stone by equipment type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptCost {
    pub stones: u32,
    pub leapstones: u32,
    pub fusion: u32,
    pub shards: u32,
    pub silver: u32,
    pub gold: u32,
}

impl AttemptCost {
    pub fn materials(&self, equipment: EquipmentType) -> [(MaterialKind, u32); 5] {
        [
            (MaterialKind::stone(equipment), self.stones),
            (MaterialKind::Leapstone, self.leapstones),
            (MaterialKind::FusionMaterial, self.fusion),
            (MaterialKind::Shards, self.shards),
            (MaterialKind::Silver, self.silver),
        ]
    }

    /// Add `attempts` worth of this cost to `ledger`.
    pub fn add_to(&self, ledger: &mut MaterialLedger, equipment: EquipmentType, attempts: f64) {
        for (kind, quantity) in self.materials(equipment) {
            ledger.add_quantity(kind, quantity as f64 * attempts);
        }
    }
}

/// Booster materials spent by one attempt with `combo`.
pub(crate) fn add_booster_materials(
    ledger: &mut MaterialLedger,
    equipment: EquipmentType,
    combo: BoosterCombo,
    breath_per_attempt: u32,
    tome_per_attempt: u32,
) {
    if combo.uses_breath() {
        ledger.add_quantity(MaterialKind::breath(equipment), breath_per_attempt as f64);
    }
    if combo.uses_tome() {
        ledger.add_quantity(MaterialKind::tome(equipment), tome_per_attempt as f64);
    }
}

const PROBABILITY_TOLERANCE: f64 = 1e-9;

fn inconsistent(table: &'static str, detail: String) -> TableError {
    TableError::Inconsistent { table, detail }
}

/// Check every shipped table against the invariants the resolver and the
/// aggregator rely on.
pub fn validate_tables() -> Result<(), TableError> {
    for table in BasicTable::all() {
        table.validate()?;
    }

    for (combo_index, row) in GRADE_PROBABILITIES.iter().enumerate() {
        let sum: f64 = row.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(inconsistent(
                "advanced grades",
                format!("row '{}' sums to {sum}", BoosterCombo::ALL[combo_index]),
            ));
        }
        if row.iter().any(|&p| !(0.0..=1.0).contains(&p)) {
            return Err(inconsistent(
                "advanced grades",
                format!("row '{}' has a probability outside [0, 1]", BoosterCombo::ALL[combo_index]),
            ));
        }
    }
    for combo in BoosterCombo::ALL {
        for other in BoosterCombo::ALL {
            if combo.contains(other)
                && advanced::combo_expected_exp(combo) < advanced::combo_expected_exp(other)
            {
                return Err(inconsistent(
                    "advanced grades",
                    format!("'{combo}' yields less experience than '{other}'"),
                ));
            }
        }
    }

    for group in StageGroup::ALL {
        let sum: f64 = group.cards().iter().map(|card| card.weight).sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(inconsistent(
                "ancestors",
                format!("{group:?} weights sum to {sum}"),
            ));
        }
        if group.recharge_probability() >= 1.0 {
            return Err(inconsistent(
                "ancestors",
                format!("{group:?} recharges on every draw"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_tables_are_consistent() {
        validate_tables().unwrap();
    }

    #[test]
    fn attempt_cost_maps_stone_by_equipment() {
        let cost = AttemptCost {
            stones: 10,
            leapstones: 2,
            fusion: 1,
            shards: 50,
            silver: 900,
            gold: 30,
        };
        let mut ledger = MaterialLedger::new();
        cost.add_to(&mut ledger, EquipmentType::Weapon, 2.5);
        assert_eq!(ledger.get(MaterialKind::DestructionStone), 25.0);
        assert_eq!(ledger.get(MaterialKind::GuardianStone), 0.0);
        assert_eq!(ledger.get(MaterialKind::Silver), 2250.0);
    }

    #[test]
    fn booster_materials_follow_combo() {
        let mut ledger = MaterialLedger::new();
        add_booster_materials(&mut ledger, EquipmentType::Armor, BoosterCombo::BOTH, 20, 1);
        add_booster_materials(&mut ledger, EquipmentType::Armor, BoosterCombo::TOME, 20, 1);
        assert_eq!(ledger.get(MaterialKind::GlacierBreath), 20.0);
        assert_eq!(ledger.get(MaterialKind::Tailoring), 2.0);
    }
}
