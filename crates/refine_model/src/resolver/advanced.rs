use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::booster::{BoosterCombo, BoosterPolicy};
use crate::data::{ADVANCED_MAX_LEVEL, BONUS_TURN_INTERVAL, EXP_PER_LEVEL, LEVELS_PER_STAGE};
use crate::ledger::MaterialLedger;
use crate::tables::{
    AdvancedTable, Ancestor, Grade, SideEffect, StageGroup, TableError, add_booster_materials,
    grade_distribution, stage_of,
};

use super::{pick_weighted, roll};

/// Progress of one item on the advanced scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedState {
    pub level: u32,
    pub exp: u32,
    /// Normal attempts since the last bonus turn.
    pub meter: u32,
    pub bonus_turn_ready: bool,
    pub next_attempt_free: bool,
    pub next_ancestor_enhanced: bool,
}

impl AdvancedState {
    pub fn new(level: u32) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AncestorDraw {
    pub ancestor: Ancestor,
    pub enhanced: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedAttempt {
    pub bonus_turn: bool,
    /// Base materials and gold were waived for this attempt.
    pub free: bool,
    pub grade: Grade,
    pub ancestor: Option<AncestorDraw>,
    pub exp_gained: u32,
    pub levels_gained: u32,
    pub combo: BoosterCombo,
    pub state: AdvancedState,
    pub materials: MaterialLedger,
    pub gold: f64,
}

/// Add `gained` experience at `level`.
///
/// Overflow carries into following levels, except that reaching a stage
/// boundary (every tenth level) discards whatever is left.
pub fn gain_exp(level: u32, exp: u32, gained: u32) -> (u32, u32) {
    let mut level = level;
    let mut exp = exp + gained;
    while exp >= EXP_PER_LEVEL && level < ADVANCED_MAX_LEVEL {
        exp -= EXP_PER_LEVEL;
        level += 1;
        if level % LEVELS_PER_STAGE == 0 {
            exp = 0;
        }
    }
    if level >= ADVANCED_MAX_LEVEL {
        exp = 0;
    }
    (level, exp)
}

/// Resolve one advanced attempt from `state`.
pub fn resolve_advanced_attempt<R: Rng + ?Sized>(
    table: &AdvancedTable,
    state: &AdvancedState,
    policy: &BoosterPolicy,
    rng: &mut R,
) -> Result<AdvancedAttempt, TableError> {
    let stage_index = stage_of(state.level)?;
    let stage = table.stage(stage_index)?;
    let bonus_turn = state.bonus_turn_ready;
    let combo = policy.combo_for(bonus_turn);
    let grades = grade_distribution(table, state.level, combo)?;

    let grade = Grade::ALL[pick_weighted(grades.iter().copied(), roll(rng))];
    let mut exp_gained = grade.exp();
    let mut next = *state;
    let mut ancestor = None;

    if bonus_turn {
        let cards = StageGroup::for_stage(stage_index).cards();
        let card = &cards[pick_weighted(cards.iter().map(|card| card.weight), roll(rng))];
        let enhanced = state.next_ancestor_enhanced;
        exp_gained = card.effect(enhanced).apply(exp_gained);
        ancestor = Some(AncestorDraw {
            ancestor: card.ancestor,
            enhanced,
        });

        next.meter = 0;
        next.bonus_turn_ready = card.side_effect == SideEffect::RechargeMeter;
        next.next_attempt_free = card.side_effect == SideEffect::FreeNextAttempt;
        next.next_ancestor_enhanced = card.side_effect == SideEffect::EnhanceNextAncestor;
    } else {
        next.meter = (state.meter + 1).min(BONUS_TURN_INTERVAL);
        next.bonus_turn_ready = next.meter >= BONUS_TURN_INTERVAL;
        next.next_attempt_free = false;
    }

    let (level, exp) = gain_exp(state.level, state.exp, exp_gained);
    next.level = level;
    next.exp = exp;

    let free = state.next_attempt_free;
    let mut materials = MaterialLedger::new();
    if !free {
        stage.cost.add_to(&mut materials, table.equipment, 1.0);
    }
    add_booster_materials(
        &mut materials,
        table.equipment,
        combo,
        stage.breath_per_attempt,
        stage.tome_per_attempt.unwrap_or(0),
    );

    Ok(AdvancedAttempt {
        bonus_turn,
        free,
        grade,
        ancestor,
        exp_gained,
        levels_gained: level - state.level,
        combo,
        state: next,
        materials,
        gold: if free { 0.0 } else { stage.cost.gold as f64 },
    })
}
