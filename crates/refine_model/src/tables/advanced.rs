use serde::{Deserialize, Serialize};

use crate::booster::{BoosterCombo, NUM_BOOSTER_COMBOS};
use crate::data::{ADVANCED_MAX_LEVEL, EquipmentType, LEVELS_PER_STAGE, NUM_STAGES};

use super::{AttemptCost, TableError};

pub const NUM_GRADES: usize = 3;

const GRADE_EXP: [u32; NUM_GRADES] = [10, 20, 40];

// Indexed by `BoosterCombo::index()`: none, breath, tome, both.
pub const GRADE_PROBABILITIES: [[f64; NUM_GRADES]; NUM_BOOSTER_COMBOS] = [
    [0.80, 0.15, 0.05],
    [0.50, 0.30, 0.20],
    [0.70, 0.20, 0.10],
    [0.40, 0.35, 0.25],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Grade {
    Success,
    GreatSuccess,
    SuperSuccess,
}

impl Grade {
    pub const ALL: [Grade; NUM_GRADES] = [Grade::Success, Grade::GreatSuccess, Grade::SuperSuccess];

    pub const fn exp(self) -> u32 {
        GRADE_EXP[self as usize]
    }
}

/// Stage index (0-based) an attempt from `level` belongs to.
pub fn stage_of(level: u32) -> Result<usize, TableError> {
    if level >= ADVANCED_MAX_LEVEL {
        return Err(TableError::InvalidLevel {
            level,
            min: 0,
            max: ADVANCED_MAX_LEVEL - 1,
        });
    }
    Ok((level / LEVELS_PER_STAGE) as usize)
}

pub(super) fn combo_expected_exp(combo: BoosterCombo) -> f64 {
    GRADE_PROBABILITIES[combo.index()]
        .iter()
        .zip(Grade::ALL)
        .map(|(p, grade)| p * grade.exp() as f64)
        .sum()
}

pub fn grade_distribution(
    table: &AdvancedTable,
    level: u32,
    combo: BoosterCombo,
) -> Result<&'static [f64; NUM_GRADES], TableError> {
    table.check_combo(level, combo)?;
    Ok(&GRADE_PROBABILITIES[combo.index()])
}

/// Mean grade experience of one attempt with `combo` at `level`.
pub fn expected_grade_exp(
    table: &AdvancedTable,
    level: u32,
    combo: BoosterCombo,
) -> Result<f64, TableError> {
    table.check_combo(level, combo)?;
    Ok(combo_expected_exp(combo))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Ancestor {
    Galatur,
    Gelar,
    Kuhumbar,
    Temer,
    Naber,
    Eber,
}

/// What an ancestor card does to the experience of its attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpEffect {
    Multiply(u32),
    Add(u32),
    /// Replaces the graded experience with a fixed amount.
    Grant(u32),
}

impl ExpEffect {
    pub fn apply(self, grade_exp: u32) -> u32 {
        match self {
            ExpEffect::Multiply(factor) => grade_exp * factor,
            ExpEffect::Add(amount) => grade_exp + amount,
            ExpEffect::Grant(amount) => amount,
        }
    }

    pub fn expected(self, grade_exp: f64) -> f64 {
        match self {
            ExpEffect::Multiply(factor) => grade_exp * factor as f64,
            ExpEffect::Add(amount) => grade_exp + amount as f64,
            ExpEffect::Grant(amount) => amount as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    None,
    FreeNextAttempt,
    RechargeMeter,
    EnhanceNextAncestor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AncestorCard {
    pub ancestor: Ancestor,
    pub weight: f64,
    pub effect: ExpEffect,
    pub enhanced_effect: ExpEffect,
    pub side_effect: SideEffect,
}

impl AncestorCard {
    pub fn effect(&self, enhanced: bool) -> ExpEffect {
        if enhanced {
            self.enhanced_effect
        } else {
            self.effect
        }
    }
}

const EARLY_CARDS: [AncestorCard; 4] = [
    AncestorCard {
        ancestor: Ancestor::Galatur,
        weight: 0.15,
        effect: ExpEffect::Multiply(5),
        enhanced_effect: ExpEffect::Multiply(5),
        side_effect: SideEffect::None,
    },
    AncestorCard {
        ancestor: Ancestor::Gelar,
        weight: 0.35,
        effect: ExpEffect::Multiply(3),
        enhanced_effect: ExpEffect::Multiply(3),
        side_effect: SideEffect::None,
    },
    AncestorCard {
        ancestor: Ancestor::Kuhumbar,
        weight: 0.15,
        effect: ExpEffect::Add(30),
        enhanced_effect: ExpEffect::Add(30),
        side_effect: SideEffect::RechargeMeter,
    },
    AncestorCard {
        ancestor: Ancestor::Temer,
        weight: 0.35,
        effect: ExpEffect::Add(10),
        enhanced_effect: ExpEffect::Add(10),
        side_effect: SideEffect::FreeNextAttempt,
    },
];

const LATE_CARDS: [AncestorCard; 6] = [
    AncestorCard {
        ancestor: Ancestor::Galatur,
        weight: 0.125,
        effect: ExpEffect::Multiply(5),
        enhanced_effect: ExpEffect::Multiply(7),
        side_effect: SideEffect::None,
    },
    AncestorCard {
        ancestor: Ancestor::Gelar,
        weight: 0.25,
        effect: ExpEffect::Multiply(3),
        enhanced_effect: ExpEffect::Multiply(5),
        side_effect: SideEffect::None,
    },
    AncestorCard {
        ancestor: Ancestor::Kuhumbar,
        weight: 0.125,
        effect: ExpEffect::Add(30),
        enhanced_effect: ExpEffect::Add(80),
        side_effect: SideEffect::RechargeMeter,
    },
    AncestorCard {
        ancestor: Ancestor::Temer,
        weight: 0.25,
        effect: ExpEffect::Add(10),
        enhanced_effect: ExpEffect::Add(30),
        side_effect: SideEffect::FreeNextAttempt,
    },
    AncestorCard {
        ancestor: Ancestor::Naber,
        weight: 0.125,
        effect: ExpEffect::Multiply(1),
        enhanced_effect: ExpEffect::Multiply(1),
        side_effect: SideEffect::EnhanceNextAncestor,
    },
    AncestorCard {
        ancestor: Ancestor::Eber,
        weight: 0.125,
        effect: ExpEffect::Grant(100),
        enhanced_effect: ExpEffect::Grant(200),
        side_effect: SideEffect::None,
    },
];

/// Ancestor decks: stages 1-2 draw from the early deck, 3-4 from the late one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageGroup {
    Early,
    Late,
}

impl StageGroup {
    pub const ALL: [StageGroup; 2] = [StageGroup::Early, StageGroup::Late];

    pub fn for_stage(stage: usize) -> Self {
        if stage < NUM_STAGES / 2 {
            StageGroup::Early
        } else {
            StageGroup::Late
        }
    }

    pub fn cards(self) -> &'static [AncestorCard] {
        match self {
            StageGroup::Early => &EARLY_CARDS,
            StageGroup::Late => &LATE_CARDS,
        }
    }

    fn side_effect_probability(self, side_effect: SideEffect) -> f64 {
        self.cards()
            .iter()
            .filter(|card| card.side_effect == side_effect)
            .map(|card| card.weight)
            .sum()
    }

    pub fn recharge_probability(self) -> f64 {
        self.side_effect_probability(SideEffect::RechargeMeter)
    }

    pub fn free_attempt_probability(self) -> f64 {
        self.side_effect_probability(SideEffect::FreeNextAttempt)
    }

    pub fn enhance_probability(self) -> f64 {
        self.side_effect_probability(SideEffect::EnhanceNextAncestor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvancedStageData {
    pub cost: AttemptCost,
    pub breath_per_attempt: u32,
    /// `None` where no tome exists for the stage.
    pub tome_per_attempt: Option<u32>,
}

#[derive(Debug)]
pub struct AdvancedTable {
    pub equipment: EquipmentType,
    stages: [AdvancedStageData; NUM_STAGES],
}

impl AdvancedTable {
    pub fn get(equipment: EquipmentType) -> &'static AdvancedTable {
        match equipment {
            EquipmentType::Armor => &ARMOR_ADVANCED,
            EquipmentType::Weapon => &WEAPON_ADVANCED,
        }
    }

    pub fn stage(&self, stage: usize) -> Result<&AdvancedStageData, TableError> {
        self.stages.get(stage).ok_or(TableError::InvalidLevel {
            level: stage as u32 * LEVELS_PER_STAGE,
            min: 0,
            max: ADVANCED_MAX_LEVEL - 1,
        })
    }

    pub fn stage_for_level(&self, level: u32) -> Result<&AdvancedStageData, TableError> {
        self.stage(stage_of(level)?)
    }

    /// Fails when `combo` asks for a tome the stage of `level` does not have.
    pub fn check_combo(&self, level: u32, combo: BoosterCombo) -> Result<(), TableError> {
        let stage = self.stage_for_level(level)?;
        if combo.uses_tome() && stage.tome_per_attempt.is_none() {
            return Err(TableError::InvalidBoosterCombo { level, combo });
        }
        Ok(())
    }
}

static ARMOR_ADVANCED: AdvancedTable = AdvancedTable {
    equipment: EquipmentType::Armor,
    stages: [
        AdvancedStageData {
            cost: AttemptCost {
                stones: 500,
                leapstones: 8,
                fusion: 4,
                shards: 3000,
                silver: 40000,
                gold: 400,
            },
            breath_per_attempt: 12,
            tome_per_attempt: Some(1),
        },
        AdvancedStageData {
            cost: AttemptCost {
                stones: 700,
                leapstones: 12,
                fusion: 6,
                shards: 4000,
                silver: 50000,
                gold: 600,
            },
            breath_per_attempt: 14,
            tome_per_attempt: Some(1),
        },
        AdvancedStageData {
            cost: AttemptCost {
                stones: 900,
                leapstones: 16,
                fusion: 8,
                shards: 5000,
                silver: 60000,
                gold: 800,
            },
            breath_per_attempt: 16,
            tome_per_attempt: None,
        },
        AdvancedStageData {
            cost: AttemptCost {
                stones: 1100,
                leapstones: 20,
                fusion: 10,
                shards: 6000,
                silver: 70000,
                gold: 1000,
            },
            breath_per_attempt: 18,
            tome_per_attempt: None,
        },
    ],
};

static WEAPON_ADVANCED: AdvancedTable = AdvancedTable {
    equipment: EquipmentType::Weapon,
    stages: [
        AdvancedStageData {
            cost: AttemptCost {
                stones: 900,
                leapstones: 12,
                fusion: 6,
                shards: 4500,
                silver: 50000,
                gold: 600,
            },
            breath_per_attempt: 18,
            tome_per_attempt: Some(1),
        },
        AdvancedStageData {
            cost: AttemptCost {
                stones: 1200,
                leapstones: 16,
                fusion: 8,
                shards: 6000,
                silver: 62000,
                gold: 800,
            },
            breath_per_attempt: 20,
            tome_per_attempt: Some(1),
        },
        AdvancedStageData {
            cost: AttemptCost {
                stones: 1500,
                leapstones: 20,
                fusion: 10,
                shards: 7500,
                silver: 74000,
                gold: 1000,
            },
            breath_per_attempt: 22,
            tome_per_attempt: None,
        },
        AdvancedStageData {
            cost: AttemptCost {
                stones: 1800,
                leapstones: 24,
                fusion: 12,
                shards: 9000,
                silver: 86000,
                gold: 1200,
            },
            breath_per_attempt: 24,
            tome_per_attempt: None,
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_rows_sum_to_one() {
        for row in GRADE_PROBABILITIES {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "row sums to {sum}");
        }
    }

    #[test]
    fn boosters_never_lower_expected_exp() {
        for combo in BoosterCombo::ALL {
            for other in BoosterCombo::ALL {
                if combo.contains(other) {
                    assert!(combo_expected_exp(combo) >= combo_expected_exp(other));
                }
            }
        }
        assert!((combo_expected_exp(BoosterCombo::NONE) - 13.0).abs() < 1e-9);
        assert!((combo_expected_exp(BoosterCombo::BOTH) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn stage_of_partitions_forty_levels() {
        assert_eq!(stage_of(0).unwrap(), 0);
        assert_eq!(stage_of(9).unwrap(), 0);
        assert_eq!(stage_of(10).unwrap(), 1);
        assert_eq!(stage_of(39).unwrap(), 3);
        assert!(matches!(
            stage_of(40),
            Err(TableError::InvalidLevel { level: 40, .. })
        ));
    }

    #[test]
    fn tome_only_exists_in_first_two_stages() {
        let table = AdvancedTable::get(EquipmentType::Armor);
        assert!(table.check_combo(15, BoosterCombo::BOTH).is_ok());
        assert_eq!(
            table.check_combo(20, BoosterCombo::TOME),
            Err(TableError::InvalidBoosterCombo {
                level: 20,
                combo: BoosterCombo::TOME
            })
        );
        assert!(expected_grade_exp(table, 35, BoosterCombo::BREATH).is_ok());
    }

    #[test]
    fn stage_groups_split_at_level_twenty() {
        assert_eq!(StageGroup::for_stage(0), StageGroup::Early);
        assert_eq!(StageGroup::for_stage(1), StageGroup::Early);
        assert_eq!(StageGroup::for_stage(2), StageGroup::Late);
        assert_eq!(StageGroup::for_stage(3), StageGroup::Late);
        assert_eq!(StageGroup::Early.enhance_probability(), 0.0);
        assert!((StageGroup::Late.enhance_probability() - 0.125).abs() < 1e-12);
        assert!((StageGroup::Early.recharge_probability() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn effects_apply_to_grade_exp() {
        assert_eq!(ExpEffect::Multiply(5).apply(20), 100);
        assert_eq!(ExpEffect::Add(30).apply(10), 40);
        assert_eq!(ExpEffect::Grant(100).apply(40), 100);
        assert!((ExpEffect::Multiply(3).expected(13.0) - 39.0).abs() < 1e-12);
    }
}
