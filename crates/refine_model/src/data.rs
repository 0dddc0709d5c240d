use std::fmt;

use serde::{Deserialize, Serialize};

// Basic refining: attempts are made from 11..=24, the item tops out at 25.
pub const BASIC_MIN_LEVEL: u32 = 11;
pub const BASIC_MAX_LEVEL: u32 = 25;
pub const NUM_BASIC_LEVELS: usize = (BASIC_MAX_LEVEL - BASIC_MIN_LEVEL) as usize;

// Advanced refining: 0..=40, four stages of ten levels.
pub const ADVANCED_MAX_LEVEL: u32 = 40;
pub const LEVELS_PER_STAGE: u32 = 10;
pub const NUM_STAGES: usize = (ADVANCED_MAX_LEVEL / LEVELS_PER_STAGE) as usize;
pub const EXP_PER_LEVEL: u32 = 100;
pub const EXP_PER_STAGE: u32 = EXP_PER_LEVEL * LEVELS_PER_STAGE;
// Normal attempts needed to arm a bonus turn.
pub const BONUS_TURN_INTERVAL: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EquipmentType {
    Armor,
    Weapon,
}

impl EquipmentType {
    pub const ALL: [EquipmentType; 2] = [EquipmentType::Armor, EquipmentType::Weapon];

    pub fn name(self) -> &'static str {
        match self {
            EquipmentType::Armor => "armor",
            EquipmentType::Weapon => "weapon",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|equipment| equipment.name() == name)
    }
}

/// The two tables the basic regime can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicVariant {
    Standard,
    Succession,
}

impl BasicVariant {
    pub const ALL: [BasicVariant; 2] = [BasicVariant::Standard, BasicVariant::Succession];

    pub fn name(self) -> &'static str {
        match self {
            BasicVariant::Standard => "standard",
            BasicVariant::Succession => "succession",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|variant| variant.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Regime {
    Basic,
    Succession,
    Advanced,
}

impl Regime {
    pub fn basic_variant(self) -> Option<BasicVariant> {
        match self {
            Regime::Basic => Some(BasicVariant::Standard),
            Regime::Succession => Some(BasicVariant::Succession),
            Regime::Advanced => None,
        }
    }

    /// Inclusive level bounds an item of this regime can sit at.
    pub fn level_bounds(self) -> (u32, u32) {
        match self {
            Regime::Basic | Regime::Succession => (BASIC_MIN_LEVEL, BASIC_MAX_LEVEL),
            Regime::Advanced => (0, ADVANCED_MAX_LEVEL),
        }
    }
}

pub const NUM_MATERIALS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MaterialKind {
    DestructionStone,
    GuardianStone,
    Leapstone,
    FusionMaterial,
    Shards,
    Silver,
    LavaBreath,
    GlacierBreath,
    Metallurgy,
    Tailoring,
}

const MATERIAL_LABELS: [&str; NUM_MATERIALS] = [
    "Destruction Stone",
    "Guardian Stone",
    "Leapstone",
    "Fusion Material",
    "Shards",
    "Silver",
    "Lava's Breath",
    "Glacier's Breath",
    "Metallurgy",
    "Tailoring",
];

impl MaterialKind {
    pub const ALL: [MaterialKind; NUM_MATERIALS] = [
        MaterialKind::DestructionStone,
        MaterialKind::GuardianStone,
        MaterialKind::Leapstone,
        MaterialKind::FusionMaterial,
        MaterialKind::Shards,
        MaterialKind::Silver,
        MaterialKind::LavaBreath,
        MaterialKind::GlacierBreath,
        MaterialKind::Metallurgy,
        MaterialKind::Tailoring,
    ];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        MATERIAL_LABELS[self.index()]
    }

    /// The refining stone consumed by this equipment type.
    pub const fn stone(equipment: EquipmentType) -> Self {
        match equipment {
            EquipmentType::Weapon => MaterialKind::DestructionStone,
            EquipmentType::Armor => MaterialKind::GuardianStone,
        }
    }

    pub const fn breath(equipment: EquipmentType) -> Self {
        match equipment {
            EquipmentType::Weapon => MaterialKind::LavaBreath,
            EquipmentType::Armor => MaterialKind::GlacierBreath,
        }
    }

    pub const fn tome(equipment: EquipmentType) -> Self {
        match equipment {
            EquipmentType::Weapon => MaterialKind::Metallurgy,
            EquipmentType::Armor => MaterialKind::Tailoring,
        }
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
