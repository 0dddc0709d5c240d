use crate::booster::BoosterCombo;
use crate::data::{BASIC_MAX_LEVEL, BASIC_MIN_LEVEL, BasicVariant, EquipmentType, NUM_BASIC_LEVELS};
use crate::ledger::MaterialLedger;

use super::{AttemptCost, TableError, add_booster_materials, inconsistent};

// Each failure adds `probability / PITY_DIVISOR` to the pity meter.
pub const PITY_DIVISOR: f64 = 2.15;
// Each failure raises the standing bonus by this share of the base rate, up to the base rate.
pub const FAILURE_BONUS_RATIO: f64 = 0.1;
// A full set of breath adds this share of the base rate.
pub const BREATH_BONUS_RATIO: f64 = 1.0;
const PITY_TOLERANCE: f64 = 1e-9;

const TOMES_PER_ATTEMPT: u32 = 1;

#[inline(always)]
pub fn is_pity_full(pity: f64) -> bool {
    pity >= 1.0 - PITY_TOLERANCE
}

/// Success probability in effect for one basic attempt.
///
/// The base rate plus the failure bonus and the tome increment never exceed
/// twice the base rate; breath is added on top and the total is capped at 1.
pub fn attempt_probability(base: f64, failure_bonus: f64, tome_bonus: f64, breath: bool) -> f64 {
    let boosted = (base + failure_bonus + tome_bonus).min(2.0 * base);
    let breath_bonus = if breath {
        base * BREATH_BONUS_RATIO
    } else {
        0.0
    };
    (boosted + breath_bonus).min(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasicLevelData {
    pub base_probability: f64,
    /// `None` where no tome exists for the level.
    pub tome_bonus: Option<f64>,
    pub breath_per_attempt: u32,
    pub cost: AttemptCost,
}

#[derive(Debug)]
pub struct BasicTable {
    pub equipment: EquipmentType,
    pub variant: BasicVariant,
    rows: [BasicLevelData; NUM_BASIC_LEVELS],
}

impl BasicTable {
    pub fn get(equipment: EquipmentType, variant: BasicVariant) -> &'static BasicTable {
        match (equipment, variant) {
            (EquipmentType::Armor, BasicVariant::Standard) => &ARMOR_STANDARD,
            (EquipmentType::Weapon, BasicVariant::Standard) => &WEAPON_STANDARD,
            (EquipmentType::Armor, BasicVariant::Succession) => &ARMOR_SUCCESSION,
            (EquipmentType::Weapon, BasicVariant::Succession) => &WEAPON_SUCCESSION,
        }
    }

    pub fn all() -> [&'static BasicTable; 4] {
        [
            &ARMOR_STANDARD,
            &WEAPON_STANDARD,
            &ARMOR_SUCCESSION,
            &WEAPON_SUCCESSION,
        ]
    }

    /// Row for an attempt made from `level`.
    pub fn row(&self, level: u32) -> Result<&BasicLevelData, TableError> {
        if !(BASIC_MIN_LEVEL..BASIC_MAX_LEVEL).contains(&level) {
            return Err(TableError::InvalidLevel {
                level,
                min: BASIC_MIN_LEVEL,
                max: BASIC_MAX_LEVEL - 1,
            });
        }
        Ok(&self.rows[(level - BASIC_MIN_LEVEL) as usize])
    }

    /// Tome increment for `combo` at `level`; 0 when the combo has no tome.
    pub fn tome_bonus(&self, level: u32, combo: BoosterCombo) -> Result<f64, TableError> {
        let row = self.row(level)?;
        if !combo.uses_tome() {
            return Ok(0.0);
        }
        row.tome_bonus
            .ok_or(TableError::InvalidBoosterCombo { level, combo })
    }

    pub fn probability(
        &self,
        level: u32,
        combo: BoosterCombo,
        failure_bonus: f64,
    ) -> Result<f64, TableError> {
        let tome_bonus = self.tome_bonus(level, combo)?;
        let base = self.row(level)?.base_probability;
        Ok(attempt_probability(
            base,
            failure_bonus,
            tome_bonus,
            combo.uses_breath(),
        ))
    }

    /// Probability of a fresh attempt (no failures yet) at `level`.
    pub fn effective_probability(&self, level: u32, combo: BoosterCombo) -> Result<f64, TableError> {
        self.probability(level, combo, 0.0)
    }

    /// Materials one paid attempt consumes, boosters included.
    pub fn attempt_materials(
        &self,
        level: u32,
        combo: BoosterCombo,
    ) -> Result<MaterialLedger, TableError> {
        self.tome_bonus(level, combo)?;
        let row = self.row(level)?;
        let mut ledger = MaterialLedger::new();
        row.cost.add_to(&mut ledger, self.equipment, 1.0);
        add_booster_materials(
            &mut ledger,
            self.equipment,
            combo,
            row.breath_per_attempt,
            TOMES_PER_ATTEMPT,
        );
        Ok(ledger)
    }

    pub(super) fn validate(&self) -> Result<(), TableError> {
        let name = "basic";
        for level in BASIC_MIN_LEVEL..BASIC_MAX_LEVEL {
            let row = self.row(level)?;
            if !(row.base_probability > 0.0 && row.base_probability <= 1.0) {
                return Err(inconsistent(
                    name,
                    format!(
                        "{} {:?} level {level}: base probability {}",
                        self.equipment.name(),
                        self.variant,
                        row.base_probability
                    ),
                ));
            }
            for combo in BoosterCombo::ALL {
                let Ok(probability) = self.effective_probability(level, combo) else {
                    continue;
                };
                if !(probability > 0.0 && probability <= 1.0) {
                    return Err(inconsistent(
                        name,
                        format!("level {level} combo '{combo}': probability {probability}"),
                    ));
                }
                for other in BoosterCombo::ALL {
                    if !combo.contains(other) {
                        continue;
                    }
                    let Ok(weaker) = self.effective_probability(level, other) else {
                        continue;
                    };
                    if probability < weaker {
                        return Err(inconsistent(
                            name,
                            format!("level {level}: '{combo}' is weaker than '{other}'"),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

type Column<T> = [T; NUM_BASIC_LEVELS];

struct CostColumns {
    stones: Column<u32>,
    leapstones: Column<u32>,
    fusion: Column<u32>,
    shards: Column<u32>,
    silver: Column<u32>,
    gold: Column<u32>,
}

const EMPTY_ROW: BasicLevelData = BasicLevelData {
    base_probability: 0.0,
    tome_bonus: None,
    breath_per_attempt: 0,
    cost: AttemptCost {
        stones: 0,
        leapstones: 0,
        fusion: 0,
        shards: 0,
        silver: 0,
        gold: 0,
    },
};

const fn build_rows(
    base: &Column<f64>,
    tome: &Column<Option<f64>>,
    breath: &Column<u32>,
    cost: &CostColumns,
) -> [BasicLevelData; NUM_BASIC_LEVELS] {
    let mut rows = [EMPTY_ROW; NUM_BASIC_LEVELS];
    let mut i = 0;
    while i < NUM_BASIC_LEVELS {
        rows[i] = BasicLevelData {
            base_probability: base[i],
            tome_bonus: tome[i],
            breath_per_attempt: breath[i],
            cost: AttemptCost {
                stones: cost.stones[i],
                leapstones: cost.leapstones[i],
                fusion: cost.fusion[i],
                shards: cost.shards[i],
                silver: cost.silver[i],
                gold: cost.gold[i],
            },
        };
        i += 1;
    }
    rows
}

// Rows are indexed by the level the attempt is made from: 11, 12, ..., 24.
const STANDARD_PROBABILITIES: Column<f64> = [
    0.10, 0.10, 0.05, 0.05, 0.04, 0.04, 0.03, 0.03, 0.03, 0.015, 0.015, 0.01, 0.01, 0.005,
];
const STANDARD_TOME: Column<Option<f64>> = [
    Some(0.10),
    Some(0.10),
    Some(0.05),
    Some(0.05),
    Some(0.04),
    Some(0.04),
    Some(0.03),
    Some(0.03),
    Some(0.02),
    Some(0.01),
    None,
    None,
    None,
    None,
];

const SUCCESSION_PROBABILITIES: Column<f64> = [
    0.10, 0.10, 0.05, 0.05, 0.05, 0.04, 0.04, 0.03, 0.03, 0.03, 0.02, 0.02, 0.015, 0.01,
];
const SUCCESSION_TOME: Column<Option<f64>> = [
    Some(0.10),
    Some(0.10),
    Some(0.05),
    Some(0.05),
    Some(0.05),
    Some(0.04),
    Some(0.04),
    Some(0.03),
    Some(0.02),
    Some(0.02),
    None,
    None,
    None,
    None,
];

const ARMOR_BREATH: Column<u32> = [20, 20, 20, 20, 20, 20, 25, 25, 25, 25, 25, 25, 25, 25];
const WEAPON_BREATH: Column<u32> = [25, 25, 25, 25, 25, 25, 30, 30, 30, 30, 30, 30, 30, 30];

const ARMOR_STANDARD_COST: CostColumns = CostColumns {
    stones: [
        1000, 1000, 1100, 1100, 1200, 1200, 1300, 1300, 1400, 1500, 1500, 1600, 1700, 1800,
    ],
    leapstones: [11, 11, 12, 12, 13, 13, 15, 15, 16, 17, 17, 18, 19, 20],
    fusion: [7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13, 13],
    shards: [
        4000, 4000, 4500, 4500, 5000, 5000, 5500, 5500, 6000, 6500, 6500, 7000, 7500, 8000,
    ],
    silver: [
        74000, 74000, 78000, 78000, 82000, 82000, 86000, 86000, 90000, 94000, 94000, 98000,
        102000, 106000,
    ],
    gold: [600, 600, 650, 650, 700, 700, 750, 750, 800, 850, 850, 900, 950, 1000],
};

const WEAPON_STANDARD_COST: CostColumns = CostColumns {
    stones: [
        1700, 1700, 1800, 1800, 1900, 1900, 2000, 2000, 2100, 2200, 2200, 2300, 2400, 2500,
    ],
    leapstones: [18, 18, 19, 19, 20, 20, 22, 22, 24, 26, 26, 28, 30, 32],
    fusion: [11, 11, 12, 12, 13, 13, 14, 14, 15, 16, 16, 17, 18, 19],
    shards: [
        6500, 6500, 7000, 7000, 7500, 7500, 8000, 8000, 8500, 9000, 9000, 9500, 10000, 10500,
    ],
    silver: [
        92000, 92000, 96000, 96000, 100000, 100000, 104000, 104000, 108000, 112000, 112000,
        116000, 120000, 124000,
    ],
    gold: [900, 900, 950, 950, 1000, 1000, 1100, 1100, 1200, 1300, 1300, 1400, 1500, 1600],
};

const ARMOR_SUCCESSION_COST: CostColumns = CostColumns {
    stones: [
        1200, 1200, 1300, 1300, 1400, 1400, 1500, 1500, 1600, 1700, 1700, 1800, 1900, 2000,
    ],
    leapstones: [14, 14, 15, 15, 16, 16, 18, 18, 19, 20, 20, 22, 23, 24],
    fusion: [9, 9, 10, 10, 11, 11, 12, 12, 13, 13, 14, 14, 15, 15],
    shards: [
        5000, 5000, 5500, 5500, 6000, 6000, 6500, 6500, 7000, 7500, 7500, 8000, 8500, 9000,
    ],
    silver: [
        80000, 80000, 84000, 84000, 88000, 88000, 92000, 92000, 96000, 100000, 100000, 104000,
        108000, 112000,
    ],
    gold: [700, 700, 750, 750, 800, 800, 850, 850, 900, 950, 950, 1000, 1050, 1100],
};

const WEAPON_SUCCESSION_COST: CostColumns = CostColumns {
    stones: [
        2000, 2000, 2100, 2100, 2200, 2200, 2300, 2300, 2400, 2500, 2500, 2600, 2700, 2800,
    ],
    leapstones: [22, 22, 23, 23, 24, 24, 26, 26, 28, 30, 30, 32, 34, 36],
    fusion: [13, 13, 14, 14, 15, 15, 16, 16, 17, 18, 18, 19, 20, 21],
    shards: [
        8000, 8000, 8500, 8500, 9000, 9000, 9500, 9500, 10000, 10500, 10500, 11000, 11500, 12000,
    ],
    silver: [
        100000, 100000, 104000, 104000, 108000, 108000, 112000, 112000, 116000, 120000, 120000,
        124000, 128000, 132000,
    ],
    gold: [
        1000, 1000, 1050, 1050, 1100, 1100, 1200, 1200, 1300, 1400, 1400, 1500, 1600, 1700,
    ],
};

static ARMOR_STANDARD: BasicTable = BasicTable {
    equipment: EquipmentType::Armor,
    variant: BasicVariant::Standard,
    rows: build_rows(
        &STANDARD_PROBABILITIES,
        &STANDARD_TOME,
        &ARMOR_BREATH,
        &ARMOR_STANDARD_COST,
    ),
};

static WEAPON_STANDARD: BasicTable = BasicTable {
    equipment: EquipmentType::Weapon,
    variant: BasicVariant::Standard,
    rows: build_rows(
        &STANDARD_PROBABILITIES,
        &STANDARD_TOME,
        &WEAPON_BREATH,
        &WEAPON_STANDARD_COST,
    ),
};

static ARMOR_SUCCESSION: BasicTable = BasicTable {
    equipment: EquipmentType::Armor,
    variant: BasicVariant::Succession,
    rows: build_rows(
        &SUCCESSION_PROBABILITIES,
        &SUCCESSION_TOME,
        &ARMOR_BREATH,
        &ARMOR_SUCCESSION_COST,
    ),
};

static WEAPON_SUCCESSION: BasicTable = BasicTable {
    equipment: EquipmentType::Weapon,
    variant: BasicVariant::Succession,
    rows: build_rows(
        &SUCCESSION_PROBABILITIES,
        &SUCCESSION_TOME,
        &WEAPON_BREATH,
        &WEAPON_SUCCESSION_COST,
    ),
};
