use std::collections::BTreeMap;

use crate::booster::BoosterPolicy;
use crate::data::{EquipmentType, MaterialKind, NUM_MATERIALS};
use crate::ledger::MaterialLedger;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CostError {
    #[error("price for {kind} must be a finite non-negative number, got {value}")]
    InvalidPrice { kind: MaterialKind, value: f64 },

    #[error("no market price supplied for {kind}")]
    MissingPrice { kind: MaterialKind },
}

/// Read-only unit prices (gold per unit) captured at computation time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceSnapshot {
    prices: [Option<f64>; NUM_MATERIALS],
}

impl PriceSnapshot {
    /// Create a price snapshot with validation.
    ///
    /// Constraints enforced:
    /// - every price is finite and >= 0
    pub fn new<I>(prices: I) -> Result<Self, CostError>
    where
        I: IntoIterator<Item = (MaterialKind, f64)>,
    {
        let mut snapshot = Self::default();
        for (kind, value) in prices {
            snapshot.set_price(kind, value)?;
        }
        Ok(snapshot)
    }

    pub fn from_map(prices: &BTreeMap<MaterialKind, f64>) -> Result<Self, CostError> {
        Self::new(prices.iter().map(|(&kind, &value)| (kind, value)))
    }

    pub fn set_price(&mut self, kind: MaterialKind, value: f64) -> Result<(), CostError> {
        if !value.is_finite() || value < 0.0 {
            return Err(CostError::InvalidPrice { kind, value });
        }
        self.prices[kind.index()] = Some(value);
        Ok(())
    }

    pub fn price(&self, kind: MaterialKind) -> Option<f64> {
        self.prices[kind.index()]
    }

    /// Gold value of `ledger`.
    ///
    /// Bound boosters in `policy` are skipped; every other consumed kind
    /// must have a price.
    pub fn material_gold(
        &self,
        ledger: &MaterialLedger,
        equipment: EquipmentType,
        policy: &BoosterPolicy,
    ) -> Result<f64, CostError> {
        let mut total = 0.0;
        for (kind, quantity) in ledger.nonzero() {
            if is_bound(kind, equipment, policy) {
                continue;
            }
            let price = self.price(kind).ok_or(CostError::MissingPrice { kind })?;
            total += quantity * price;
        }
        Ok(total)
    }
}

fn is_bound(kind: MaterialKind, equipment: EquipmentType, policy: &BoosterPolicy) -> bool {
    (policy.breath_bound && kind == MaterialKind::breath(equipment))
        || (policy.tome_bound && kind == MaterialKind::tome(equipment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booster::BoosterCombo;

    fn ledger() -> MaterialLedger {
        [
            (MaterialKind::GuardianStone, 100.0),
            (MaterialKind::GlacierBreath, 10.0),
            (MaterialKind::Tailoring, 2.0),
        ]
        .into_iter()
        .collect()
    }

    fn prices() -> PriceSnapshot {
        PriceSnapshot::new([
            (MaterialKind::GuardianStone, 0.5),
            (MaterialKind::GlacierBreath, 30.0),
            (MaterialKind::Tailoring, 800.0),
        ])
        .unwrap()
    }

    #[test]
    fn negative_or_nan_price_is_rejected() {
        assert_eq!(
            PriceSnapshot::new([(MaterialKind::Shards, -1.0)]),
            Err(CostError::InvalidPrice {
                kind: MaterialKind::Shards,
                value: -1.0
            })
        );
        assert!(PriceSnapshot::new([(MaterialKind::Shards, f64::NAN)]).is_err());
    }

    #[test]
    fn material_gold_multiplies_quantity_by_price() {
        let policy = BoosterPolicy::uniform(BoosterCombo::BOTH);
        let gold = prices()
            .material_gold(&ledger(), EquipmentType::Armor, &policy)
            .unwrap();
        assert!((gold - (50.0 + 300.0 + 1600.0)).abs() < 1e-9);
    }

    #[test]
    fn bound_boosters_cost_nothing() {
        let policy = BoosterPolicy::uniform(BoosterCombo::BOTH).with_bound(true, false);
        let gold = prices()
            .material_gold(&ledger(), EquipmentType::Armor, &policy)
            .unwrap();
        assert!((gold - (50.0 + 1600.0)).abs() < 1e-9);

        // Binding the weapon's breath says nothing about the armor's.
        let weapon_ledger: MaterialLedger = [(MaterialKind::GlacierBreath, 1.0)].into_iter().collect();
        let gold = prices()
            .material_gold(&weapon_ledger, EquipmentType::Weapon, &policy)
            .unwrap();
        assert!((gold - 30.0).abs() < 1e-9);
    }

    #[test]
    fn bound_tome_costs_nothing() {
        let policy = BoosterPolicy::uniform(BoosterCombo::BOTH).with_bound(false, true);
        let gold = prices()
            .material_gold(&ledger(), EquipmentType::Armor, &policy)
            .unwrap();
        assert!((gold - (50.0 + 300.0)).abs() < 1e-9);

        // With both bound, neither booster needs a price at all.
        let snapshot = PriceSnapshot::new([(MaterialKind::GuardianStone, 0.5)]).unwrap();
        let both = policy.with_bound(true, true);
        let gold = snapshot
            .material_gold(&ledger(), EquipmentType::Armor, &both)
            .unwrap();
        assert!((gold - 50.0).abs() < 1e-9);
    }

    #[test]
    fn missing_price_is_reported() {
        let snapshot = PriceSnapshot::new([(MaterialKind::GuardianStone, 0.5)]).unwrap();
        let policy = BoosterPolicy::uniform(BoosterCombo::BOTH).with_bound(true, false);
        assert_eq!(
            snapshot.material_gold(&ledger(), EquipmentType::Armor, &policy),
            Err(CostError::MissingPrice {
                kind: MaterialKind::Tailoring
            })
        );
    }
}
