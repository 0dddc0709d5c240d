use serde::Serialize;

use crate::booster::BoosterPolicy;
use crate::data::{
    BONUS_TURN_INTERVAL, EXP_PER_STAGE, EquipmentType, LEVELS_PER_STAGE, MaterialKind, NUM_STAGES,
};
use crate::ledger::MaterialLedger;
use crate::tables::{AdvancedTable, StageGroup, TableError, expected_grade_exp};

use super::{ExpectedResourceCost, Segment};

/// Per-stage constants for one booster policy.
///
/// Bonus turns are treated as a fixed share of attempts. A stage cycles
/// through six normal turns and then `b = 1 / (1 - P(recharge))` bonus turns
/// on average, so `bonus_frequency = b / (6 + b)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageExpectation {
    pub stage: usize,
    pub normal_frequency: f64,
    pub bonus_frequency: f64,
    pub expected_exp_per_attempt: f64,
    /// Attempts to clear the whole stage.
    pub expected_attempts: f64,
    /// Share of attempts that cost only their boosters.
    pub free_fraction: f64,
    pub breath_usage_rate: f64,
    pub tome_usage_rate: f64,
}

impl StageExpectation {
    pub fn paid_attempts(&self) -> f64 {
        self.expected_attempts * (1.0 - self.free_fraction)
    }
}

// Share of attempts spending a booster used on normal and/or bonus turns.
fn usage_rate(on_normal: bool, on_bonus: bool, normal_frequency: f64, bonus_frequency: f64) -> f64 {
    let mut rate = 0.0;
    if on_normal {
        rate += normal_frequency;
    }
    if on_bonus {
        rate += bonus_frequency;
    }
    rate
}

pub fn stage_expectation(
    table: &AdvancedTable,
    stage: usize,
    policy: &BoosterPolicy,
) -> Result<StageExpectation, TableError> {
    table.stage(stage)?;
    let level = stage as u32 * LEVELS_PER_STAGE;
    let normal_exp = expected_grade_exp(table, level, policy.normal)?;
    let bonus_grade_exp = expected_grade_exp(table, level, policy.bonus)?;

    let group = StageGroup::for_stage(stage);
    let enhanced = group.enhance_probability();
    let bonus_exp: f64 = group
        .cards()
        .iter()
        .map(|card| {
            card.weight
                * ((1.0 - enhanced) * card.effect.expected(bonus_grade_exp)
                    + enhanced * card.enhanced_effect.expected(bonus_grade_exp))
        })
        .sum();

    let interval = BONUS_TURN_INTERVAL as f64;
    let bonus_run = 1.0 / (1.0 - group.recharge_probability());
    let bonus_frequency = bonus_run / (interval + bonus_run);
    let normal_frequency = 1.0 - bonus_frequency;

    let expected_exp_per_attempt = normal_frequency * normal_exp + bonus_frequency * bonus_exp;

    Ok(StageExpectation {
        stage,
        normal_frequency,
        bonus_frequency,
        expected_exp_per_attempt,
        expected_attempts: EXP_PER_STAGE as f64 / expected_exp_per_attempt,
        free_fraction: bonus_frequency * group.free_attempt_probability(),
        breath_usage_rate: usage_rate(
            policy.normal.uses_breath(),
            policy.bonus.uses_breath(),
            normal_frequency,
            bonus_frequency,
        ),
        tome_usage_rate: usage_rate(
            policy.normal.uses_tome(),
            policy.bonus.uses_tome(),
            normal_frequency,
            bonus_frequency,
        ),
    })
}

/// Constants for every stage, or the first stage the policy is illegal in.
pub fn stage_expectations(
    equipment: EquipmentType,
    policy: &BoosterPolicy,
) -> Result<Vec<StageExpectation>, TableError> {
    let table = AdvancedTable::get(equipment);
    (0..NUM_STAGES)
        .map(|stage| stage_expectation(table, stage, policy))
        .collect()
}

/// Expected resources for the whole of `stage`.
fn stage_resources(
    table: &AdvancedTable,
    expectation: &StageExpectation,
) -> Result<(MaterialLedger, f64), TableError> {
    let data = table.stage(expectation.stage)?;
    let attempts = expectation.expected_attempts;
    let paid = expectation.paid_attempts();

    let mut materials = MaterialLedger::new();
    data.cost.add_to(&mut materials, table.equipment, paid);
    if expectation.breath_usage_rate > 0.0 {
        materials.add_quantity(
            MaterialKind::breath(table.equipment),
            attempts * expectation.breath_usage_rate * data.breath_per_attempt as f64,
        );
    }
    if expectation.tome_usage_rate > 0.0 {
        let tomes = data.tome_per_attempt.unwrap_or(0) as f64;
        materials.add_quantity(
            MaterialKind::tome(table.equipment),
            attempts * expectation.tome_usage_rate * tomes,
        );
    }
    Ok((materials, paid * data.cost.gold as f64))
}

/// Expected resources to go from `from` to `to` on the advanced scale.
///
/// Partially covered stages are charged the traversed fraction
/// `(hi - lo) / 10` of the full-stage expectation.
pub(super) fn advanced_expected(
    table: &AdvancedTable,
    from: u32,
    to: u32,
    policy: &BoosterPolicy,
) -> Result<ExpectedResourceCost, TableError> {
    let mut total = ExpectedResourceCost::default();
    if from >= to {
        return Ok(total);
    }
    let first = (from / LEVELS_PER_STAGE) as usize;
    let last = ((to - 1) / LEVELS_PER_STAGE) as usize;

    for stage in first..=last {
        let stage_start = stage as u32 * LEVELS_PER_STAGE;
        let lo = from.max(stage_start);
        let hi = to.min(stage_start + LEVELS_PER_STAGE);
        let fraction = (hi - lo) as f64 / LEVELS_PER_STAGE as f64;

        let expectation = stage_expectation(table, stage, policy)?;
        let (materials, flat_gold) = stage_resources(table, &expectation)?;
        let attempts = expectation.expected_attempts * fraction;
        let paid = expectation.paid_attempts() * fraction;

        tracing::debug!(
            equipment = table.equipment.name(),
            stage,
            from = lo,
            to = hi,
            fraction,
            expected_attempts = attempts,
            "advanced stage expectation"
        );

        total += ExpectedResourceCost {
            expected_attempts: attempts,
            paid_attempts: paid,
            materials: materials.scaled(fraction),
            flat_gold: flat_gold * fraction,
            segments: vec![Segment {
                from: lo,
                to: hi,
                expected_attempts: attempts,
                paid_attempts: paid,
                flat_gold: flat_gold * fraction,
            }],
        };
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booster::BoosterCombo;

    fn armor() -> &'static AdvancedTable {
        AdvancedTable::get(EquipmentType::Armor)
    }

    #[test]
    fn early_stage_without_boosters_matches_regression_value() {
        let stage = stage_expectation(armor(), 0, &BoosterPolicy::default()).unwrap();
        assert!((stage.bonus_frequency - 0.16393442622950818).abs() < 1e-12);
        assert!((stage.expected_exp_per_attempt - 17.08196721311475).abs() < 1e-9);
        assert!((stage.expected_attempts - 58.54126679462573).abs() < 1e-9);
        assert!((stage.free_fraction - 0.05737704918032786).abs() < 1e-12);
        assert_eq!(stage.breath_usage_rate, 0.0);
    }

    #[test]
    fn late_stage_without_boosters_matches_regression_value() {
        let stage = stage_expectation(armor(), 3, &BoosterPolicy::default()).unwrap();
        assert!((stage.bonus_frequency - 0.16).abs() < 1e-12);
        assert!((stage.expected_exp_per_attempt - 18.49).abs() < 1e-9);
        assert!((stage.expected_attempts - 54.08328826392644).abs() < 1e-9);
    }

    #[test]
    fn full_boosters_match_regression_value() {
        let stage = stage_expectation(armor(), 1, &BoosterPolicy::uniform(BoosterCombo::BOTH)).unwrap();
        assert!((stage.expected_attempts - 37.33170134638923).abs() < 1e-9);
        assert!((stage.breath_usage_rate - 1.0).abs() < 1e-12);
        assert!((stage.tome_usage_rate - 1.0).abs() < 1e-12);
    }

    #[test]
    fn usage_rate_follows_turn_type() {
        let policy = BoosterPolicy::new(BoosterCombo::NONE, BoosterCombo::BREATH);
        let stage = stage_expectation(armor(), 0, &policy).unwrap();
        assert!((stage.breath_usage_rate - stage.bonus_frequency).abs() < 1e-12);
        assert_eq!(stage.tome_usage_rate, 0.0);

        let policy = BoosterPolicy::new(BoosterCombo::BREATH, BoosterCombo::NONE);
        let stage = stage_expectation(armor(), 0, &policy).unwrap();
        assert!((stage.breath_usage_rate - stage.normal_frequency).abs() < 1e-12);
    }

    #[test]
    fn tome_policy_fails_in_late_stages() {
        let policy = BoosterPolicy::new(BoosterCombo::NONE, BoosterCombo::TOME);
        assert!(stage_expectation(armor(), 1, &policy).is_ok());
        assert_eq!(
            stage_expectations(EquipmentType::Armor, &policy),
            Err(TableError::InvalidBoosterCombo {
                level: 20,
                combo: BoosterCombo::TOME
            })
        );
    }

    #[test]
    fn partial_stage_is_linearly_interpolated() {
        let policy = BoosterPolicy::default();
        let full = advanced_expected(armor(), 0, 10, &policy).unwrap();
        let part = advanced_expected(armor(), 3, 7, &policy).unwrap();
        assert!((part.expected_attempts - 0.4 * full.expected_attempts).abs() < 1e-9);
        assert!(part.materials.max_abs_diff(&full.materials.scaled(0.4)) < 1e-6);
    }

    #[test]
    fn free_attempts_cost_no_base_materials() {
        let stage = stage_expectation(armor(), 0, &BoosterPolicy::default()).unwrap();
        let cost = advanced_expected(armor(), 0, 10, &BoosterPolicy::default()).unwrap();
        let paid = stage.expected_attempts * (1.0 - stage.free_fraction);
        assert!((cost.paid_attempts - paid).abs() < 1e-9);
        assert!((cost.materials.get(MaterialKind::GuardianStone) - 500.0 * paid).abs() < 1e-6);
        assert!((cost.flat_gold - 400.0 * paid).abs() < 1e-6);
    }

    #[test]
    fn range_spanning_stages_yields_one_segment_each() {
        let cost = advanced_expected(armor(), 5, 32, &BoosterPolicy::default()).unwrap();
        let bounds: Vec<(u32, u32)> = cost.segments.iter().map(|s| (s.from, s.to)).collect();
        assert_eq!(bounds, vec![(5, 10), (10, 20), (20, 30), (30, 32)]);
    }
}
