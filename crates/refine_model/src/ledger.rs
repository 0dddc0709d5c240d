use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::data::{MaterialKind, NUM_MATERIALS};

/// Accumulated material quantities, one slot per `MaterialKind`.
///
/// Simulated runs only ever add whole units; projections hold expectations,
/// so quantities are stored as `f64` either way.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaterialLedger {
    quantities: [f64; NUM_MATERIALS],
}

impl MaterialLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: MaterialKind) -> f64 {
        self.quantities[kind.index()]
    }

    pub fn add_quantity(&mut self, kind: MaterialKind, quantity: f64) {
        debug_assert!(quantity >= 0.0, "ledger quantities only grow");
        self.quantities[kind.index()] += quantity;
    }

    pub fn add_ledger(&mut self, other: &MaterialLedger) {
        for (total, quantity) in self.quantities.iter_mut().zip(other.quantities.iter()) {
            *total += quantity;
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            quantities: self.quantities.map(|quantity| quantity * factor),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.iter().all(|&quantity| quantity == 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialKind, f64)> + '_ {
        MaterialKind::ALL
            .iter()
            .map(|&kind| (kind, self.quantities[kind.index()]))
    }

    /// Kinds with a non-zero quantity.
    pub fn nonzero(&self) -> impl Iterator<Item = (MaterialKind, f64)> + '_ {
        self.iter().filter(|&(_, quantity)| quantity != 0.0)
    }

    pub fn to_map(&self) -> BTreeMap<MaterialKind, f64> {
        self.nonzero().collect()
    }

    /// Largest per-kind absolute difference, for approximate comparisons.
    pub fn max_abs_diff(&self, other: &MaterialLedger) -> f64 {
        self.quantities
            .iter()
            .zip(other.quantities.iter())
            .map(|(lhs, rhs)| (lhs - rhs).abs())
            .fold(0.0, f64::max)
    }
}

impl Add for MaterialLedger {
    type Output = MaterialLedger;

    fn add(mut self, rhs: MaterialLedger) -> MaterialLedger {
        self.add_ledger(&rhs);
        self
    }
}

impl AddAssign for MaterialLedger {
    fn add_assign(&mut self, rhs: MaterialLedger) {
        self.add_ledger(&rhs);
    }
}

impl FromIterator<(MaterialKind, f64)> for MaterialLedger {
    fn from_iter<T: IntoIterator<Item = (MaterialKind, f64)>>(iter: T) -> Self {
        let mut ledger = MaterialLedger::new();
        for (kind, quantity) in iter {
            ledger.add_quantity(kind, quantity);
        }
        ledger
    }
}

impl Serialize for MaterialLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MaterialLedger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<MaterialKind, f64>::deserialize(deserializer)?;
        Ok(map.into_iter().collect())
    }
}
