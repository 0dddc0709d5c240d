mod advanced;
mod basic;

use std::ops::{Add, AddAssign};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::booster::BoosterPolicy;
use crate::cost::{CostError, PriceSnapshot};
use crate::data::{EquipmentType, Regime};
use crate::ledger::MaterialLedger;
use crate::tables::{AdvancedTable, BasicTable, TableError};

pub use advanced::{StageExpectation, stage_expectation, stage_expectations};
pub use basic::{LevelExpectation, level_expectation, level_expectations};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Cost(#[from] CostError),

    #[error("target level {target} is below current level {current}")]
    InvalidRange { current: u32, target: u32 },
}

/// One computed plan: an item, a level range and the boosters spent on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionInput {
    pub equipment: EquipmentType,
    pub regime: Regime,
    pub current_level: u32,
    pub target_level: u32,
    #[serde(default)]
    pub policy: BoosterPolicy,
}

impl ProjectionInput {
    fn validate(&self) -> Result<(), ProjectionError> {
        let (min, max) = self.regime.level_bounds();
        for level in [self.current_level, self.target_level] {
            if !(min..=max).contains(&level) {
                return Err(TableError::InvalidLevel { level, min, max }.into());
            }
        }
        if self.target_level < self.current_level {
            return Err(ProjectionError::InvalidRange {
                current: self.current_level,
                target: self.target_level,
            });
        }
        Ok(())
    }
}

/// Expected attempts over `from..to`: one level (basic) or the covered part
/// of one stage (advanced).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub from: u32,
    pub to: u32,
    pub expected_attempts: f64,
    pub paid_attempts: f64,
    pub flat_gold: f64,
}

impl Segment {
    fn scaled(&self, factor: f64) -> Self {
        Self {
            expected_attempts: self.expected_attempts * factor,
            paid_attempts: self.paid_attempts * factor,
            flat_gold: self.flat_gold * factor,
            ..*self
        }
    }
}

/// Expected attempts and materials, before any prices are applied.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedResourceCost {
    pub expected_attempts: f64,
    /// Attempts that pay base materials and gold; free attempts only pay
    /// for their boosters.
    pub paid_attempts: f64,
    pub materials: MaterialLedger,
    pub flat_gold: f64,
    pub segments: Vec<Segment>,
}

impl ExpectedResourceCost {
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            expected_attempts: self.expected_attempts * factor,
            paid_attempts: self.paid_attempts * factor,
            materials: self.materials.scaled(factor),
            flat_gold: self.flat_gold * factor,
            segments: self.segments.iter().map(|s| s.scaled(factor)).collect(),
        }
    }
}

impl AddAssign for ExpectedResourceCost {
    fn add_assign(&mut self, rhs: Self) {
        self.expected_attempts += rhs.expected_attempts;
        self.paid_attempts += rhs.paid_attempts;
        self.materials += rhs.materials;
        self.flat_gold += rhs.flat_gold;
        self.segments.extend(rhs.segments);
    }
}

impl Add for ExpectedResourceCost {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

/// Expected resources priced against a snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostProjection {
    pub expected_attempts: f64,
    pub paid_attempts: f64,
    pub materials: MaterialLedger,
    pub flat_gold: f64,
    pub material_gold: f64,
    pub gold_total: f64,
    pub segments: Vec<Segment>,
}

impl CostProjection {
    pub fn from_resources(resources: ExpectedResourceCost, material_gold: f64) -> Self {
        Self {
            expected_attempts: resources.expected_attempts,
            paid_attempts: resources.paid_attempts,
            materials: resources.materials,
            flat_gold: resources.flat_gold,
            material_gold,
            gold_total: material_gold + resources.flat_gold,
            segments: resources.segments,
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            expected_attempts: self.expected_attempts * factor,
            paid_attempts: self.paid_attempts * factor,
            materials: self.materials.scaled(factor),
            flat_gold: self.flat_gold * factor,
            material_gold: self.material_gold * factor,
            gold_total: self.gold_total * factor,
            segments: self.segments.iter().map(|s| s.scaled(factor)).collect(),
        }
    }
}

impl AddAssign for CostProjection {
    fn add_assign(&mut self, rhs: Self) {
        self.expected_attempts += rhs.expected_attempts;
        self.paid_attempts += rhs.paid_attempts;
        self.materials += rhs.materials;
        self.flat_gold += rhs.flat_gold;
        self.material_gold += rhs.material_gold;
        self.gold_total += rhs.gold_total;
        self.segments.extend(rhs.segments);
    }
}

impl Add for CostProjection {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

/// Expected attempts and materials for `input`, dispatched by regime.
pub fn expected_resources(input: &ProjectionInput) -> Result<ExpectedResourceCost, ProjectionError> {
    input.validate()?;
    let from = input.current_level;
    let to = input.target_level;
    let resources = match input.regime.basic_variant() {
        Some(variant) => {
            let table = BasicTable::get(input.equipment, variant);
            basic::basic_expected(table, from, to, input.policy.normal)?
        }
        None => {
            let table = AdvancedTable::get(input.equipment);
            advanced::advanced_expected(table, from, to, &input.policy)?
        }
    };
    Ok(resources)
}

pub fn project(
    input: &ProjectionInput,
    prices: &PriceSnapshot,
) -> Result<CostProjection, ProjectionError> {
    let resources = expected_resources(input)?;
    let material_gold = prices.material_gold(&resources.materials, input.equipment, &input.policy)?;

    tracing::debug!(
        equipment = input.equipment.name(),
        regime = ?input.regime,
        from = input.current_level,
        to = input.target_level,
        policy = %input.policy.key(),
        expected_attempts = resources.expected_attempts,
        material_gold,
        "projection computed"
    );

    Ok(CostProjection::from_resources(resources, material_gold))
}

/// Project every input in parallel; results keep the order of `inputs`.
pub fn project_batch(
    inputs: &[ProjectionInput],
    prices: &PriceSnapshot,
) -> Result<Vec<CostProjection>, ProjectionError> {
    inputs.par_iter().map(|input| project(input, prices)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booster::BoosterCombo;
    use crate::data::MaterialKind;

    fn input(regime: Regime, current_level: u32, target_level: u32) -> ProjectionInput {
        ProjectionInput {
            equipment: EquipmentType::Armor,
            regime,
            current_level,
            target_level,
            policy: BoosterPolicy::default(),
        }
    }

    #[test]
    fn empty_range_costs_nothing() {
        let cost = expected_resources(&input(Regime::Advanced, 14, 14)).unwrap();
        assert_eq!(cost, ExpectedResourceCost::default());
        let cost = expected_resources(&input(Regime::Basic, 25, 25)).unwrap();
        assert!(cost.materials.is_empty());
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert_eq!(
            expected_resources(&input(Regime::Basic, 15, 12)),
            Err(ProjectionError::InvalidRange {
                current: 15,
                target: 12
            })
        );
    }

    #[test]
    fn levels_outside_regime_are_rejected() {
        assert!(matches!(
            expected_resources(&input(Regime::Basic, 10, 12)),
            Err(ProjectionError::Table(TableError::InvalidLevel { level: 10, .. }))
        ));
        assert!(matches!(
            expected_resources(&input(Regime::Advanced, 0, 41)),
            Err(ProjectionError::Table(TableError::InvalidLevel { level: 41, .. }))
        ));
    }

    #[test]
    fn succession_uses_its_own_table() {
        let standard = expected_resources(&input(Regime::Basic, 15, 16)).unwrap();
        let succession = expected_resources(&input(Regime::Succession, 15, 16)).unwrap();
        assert!(succession.expected_attempts < standard.expected_attempts);
    }

    #[test]
    fn gold_total_adds_flat_gold_to_material_gold() {
        let prices = PriceSnapshot::new(MaterialKind::ALL.map(|kind| (kind, 1.0))).unwrap();
        let mut request = input(Regime::Advanced, 0, 10);
        request.policy = BoosterPolicy::uniform(BoosterCombo::BREATH);
        let projection = project(&request, &prices).unwrap();
        let quantity: f64 = projection.materials.iter().map(|(_, q)| q).sum();
        assert!((projection.material_gold - quantity).abs() < 1e-6);
        assert!((projection.gold_total - projection.material_gold - projection.flat_gold).abs() < 1e-6);
    }

    #[test]
    fn missing_price_surfaces_as_cost_error() {
        let prices = PriceSnapshot::default();
        assert_eq!(
            project(&input(Regime::Basic, 11, 12), &prices),
            Err(ProjectionError::Cost(CostError::MissingPrice {
                kind: MaterialKind::GuardianStone
            }))
        );
    }
}
