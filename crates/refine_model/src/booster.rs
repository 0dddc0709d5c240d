use std::fmt;

use serde::{Deserialize, Serialize};

pub const NUM_BOOSTERS: usize = 2;
pub const NUM_BOOSTER_COMBOS: usize = 1 << NUM_BOOSTERS;

const BREATH_BIT: u8 = 1;
const TOME_BIT: u8 = 1 << 1;
// The mask with every booster bit on.
const MASK_ALL: u8 = (1 << NUM_BOOSTERS) - 1;

const COMBO_NAMES: [&str; NUM_BOOSTER_COMBOS] = ["none", "breath", "tome", "both"];

/// A set of boosters used on one attempt, stored as a bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoosterCombo(u8);

impl BoosterCombo {
    pub const NONE: Self = Self(0);
    pub const BREATH: Self = Self(BREATH_BIT);
    pub const TOME: Self = Self(TOME_BIT);
    pub const BOTH: Self = Self(MASK_ALL);
    pub const ALL: [Self; NUM_BOOSTER_COMBOS] = [Self::NONE, Self::BREATH, Self::TOME, Self::BOTH];

    pub const fn from_flags(breath: bool, tome: bool) -> Self {
        let mut bits = 0;
        if breath {
            bits |= BREATH_BIT;
        }
        if tome {
            bits |= TOME_BIT;
        }
        Self(bits)
    }

    /// Table row for this combo. Always in `0..NUM_BOOSTER_COMBOS`.
    #[inline(always)]
    pub const fn index(self) -> usize {
        (self.0 & MASK_ALL) as usize
    }

    #[inline(always)]
    pub const fn uses_breath(self) -> bool {
        self.0 & BREATH_BIT != 0
    }

    #[inline(always)]
    pub const fn uses_tome(self) -> bool {
        self.0 & TOME_BIT != 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self((self.0 | other.0) & MASK_ALL)
    }

    pub fn name(self) -> &'static str {
        COMBO_NAMES[self.index()]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        COMBO_NAMES
            .iter()
            .position(|&combo| combo == name)
            .map(|index| Self(index as u8))
    }
}

impl fmt::Display for BoosterCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for BoosterCombo {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let name = value.trim().to_ascii_lowercase();
        Self::from_name(&name).ok_or_else(|| format!("Unknown booster combo: {value}"))
    }
}

impl From<BoosterCombo> for String {
    fn from(combo: BoosterCombo) -> Self {
        combo.name().to_string()
    }
}

/// Which boosters a caller spends, per turn type, and whether they are bound.
///
/// `normal` applies to every basic attempt and to normal turns of advanced
/// refining; `bonus` applies to advanced bonus turns only. Bound boosters are
/// still consumed but cost no gold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoosterPolicy {
    #[serde(default)]
    pub normal: BoosterCombo,
    #[serde(default)]
    pub bonus: BoosterCombo,
    #[serde(default)]
    pub breath_bound: bool,
    #[serde(default)]
    pub tome_bound: bool,
}

impl BoosterPolicy {
    pub const fn new(normal: BoosterCombo, bonus: BoosterCombo) -> Self {
        Self {
            normal,
            bonus,
            breath_bound: false,
            tome_bound: false,
        }
    }

    /// Same combo on both turn types.
    pub const fn uniform(combo: BoosterCombo) -> Self {
        Self::new(combo, combo)
    }

    pub const fn with_bound(mut self, breath_bound: bool, tome_bound: bool) -> Self {
        self.breath_bound = breath_bound;
        self.tome_bound = tome_bound;
        self
    }

    #[inline(always)]
    pub const fn combo_for(&self, bonus_turn: bool) -> BoosterCombo {
        if bonus_turn { self.bonus } else { self.normal }
    }

    /// Canonical lookup key, e.g. `none_none` or `breath_both`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.normal, self.bonus)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let (normal, bonus) = key.trim().split_once('_')?;
        Some(Self::new(
            BoosterCombo::from_name(normal)?,
            BoosterCombo::from_name(bonus)?,
        ))
    }
}
