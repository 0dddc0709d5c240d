//! Attempt-by-attempt refining runs.
//!
//! A run is a small state machine: every `step` resolves one attempt and
//! moves the run to its next [`RunStatus`]. Batches of seeded runs give a
//! Monte Carlo estimate to set against the closed-form aggregator.

use std::mem;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use crate::aggregator::ProjectionInput;
use crate::booster::{BoosterCombo, BoosterPolicy};
use crate::data::{LEVELS_PER_STAGE, Regime};
use crate::ledger::MaterialLedger;
use crate::resolver::{AdvancedState, BasicState, resolve_advanced_attempt, resolve_basic_attempt};
use crate::tables::{AdvancedTable, BasicTable, TableError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("gave up on level {target} after {attempts} attempts, reached level {reached}")]
    NonConvergence {
        target: u32,
        reached: u32,
        attempts: u64,
    },

    #[error("target level {target} is below current level {current}")]
    InvalidTarget { current: u32, target: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RunStatus {
    InProgress,
    LevelComplete { level: u32 },
    /// `stage` (0-based) was finished by the last attempt.
    StageComplete { stage: u32 },
    /// The run reached its target level.
    MaxLevelReached,
    /// The attempt cap was hit before the target.
    NonConvergent,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::MaxLevelReached | RunStatus::NonConvergent)
    }
}

/// Status after an attempt moved the item from `before` to `after`.
///
/// The cap is hard: a run short of `target` after `max_attempts` attempts is
/// `NonConvergent` even if the last attempt gained a level. That level is
/// kept in the run's state and summary.
pub fn next_status(
    regime: Regime,
    before: u32,
    after: u32,
    target: u32,
    attempts: u64,
    max_attempts: u64,
) -> RunStatus {
    if after >= target {
        return RunStatus::MaxLevelReached;
    }
    if attempts >= max_attempts {
        return RunStatus::NonConvergent;
    }
    if after > before {
        if regime == Regime::Advanced && after % LEVELS_PER_STAGE == 0 {
            return RunStatus::StageComplete {
                stage: after / LEVELS_PER_STAGE - 1,
            };
        }
        return RunStatus::LevelComplete { level: after };
    }
    RunStatus::InProgress
}

/// What a finished level cost, in the shape run statistics are logged in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub from_level: u32,
    pub to_level: u32,
    pub attempts: u64,
    pub materials: MaterialLedger,
    pub gold: f64,
    pub breath_used: u64,
    pub tome_used: u64,
    /// Pity meter going into the successful attempt. Basic runs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_pity: Option<f64>,
}

impl AttemptRecord {
    fn starting_at(level: u32) -> Self {
        Self {
            from_level: level,
            to_level: level,
            attempts: 0,
            materials: MaterialLedger::new(),
            gold: 0.0,
            breath_used: 0,
            tome_used: 0,
            final_pity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub start_level: u32,
    pub final_level: u32,
    pub status: RunStatus,
    pub attempts: u64,
    pub paid_attempts: u64,
    pub materials: MaterialLedger,
    pub gold: f64,
    pub records: Vec<AttemptRecord>,
}

#[derive(Debug, Clone)]
struct Progress {
    regime: Regime,
    start_level: u32,
    target: u32,
    max_attempts: u64,
    attempts: u64,
    paid_attempts: u64,
    materials: MaterialLedger,
    gold: f64,
    status: RunStatus,
    pending: AttemptRecord,
    records: Vec<AttemptRecord>,
}

impl Progress {
    fn new(regime: Regime, level: u32, target: u32, max_attempts: u64) -> Self {
        Self {
            regime,
            start_level: level,
            target,
            max_attempts,
            attempts: 0,
            paid_attempts: 0,
            materials: MaterialLedger::new(),
            gold: 0.0,
            status: if level >= target {
                RunStatus::MaxLevelReached
            } else {
                RunStatus::InProgress
            },
            pending: AttemptRecord::starting_at(level),
            records: Vec::new(),
        }
    }

    fn charge(&mut self, materials: &MaterialLedger, gold: f64, combo: BoosterCombo, paid: bool) {
        self.attempts += 1;
        if paid {
            self.paid_attempts += 1;
        }
        self.materials += *materials;
        self.gold += gold;

        self.pending.attempts += 1;
        self.pending.materials += *materials;
        self.pending.gold += gold;
        if combo.uses_breath() {
            self.pending.breath_used += 1;
        }
        if combo.uses_tome() {
            self.pending.tome_used += 1;
        }
    }

    fn close_level(&mut self, to_level: u32, final_pity: Option<f64>) {
        let mut record = mem::replace(&mut self.pending, AttemptRecord::starting_at(to_level));
        record.to_level = to_level;
        record.final_pity = final_pity;
        self.records.push(record);
    }

    fn advance(&mut self, before: u32, after: u32) -> RunStatus {
        self.status = next_status(
            self.regime,
            before,
            after,
            self.target,
            self.attempts,
            self.max_attempts,
        );
        self.status
    }

    fn summary(&self, final_level: u32) -> RunSummary {
        RunSummary {
            start_level: self.start_level,
            final_level,
            status: self.status,
            attempts: self.attempts,
            paid_attempts: self.paid_attempts,
            materials: self.materials,
            gold: self.gold,
            records: self.records.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BasicRun {
    table: &'static BasicTable,
    combo: BoosterCombo,
    state: BasicState,
    progress: Progress,
}

impl BasicRun {
    pub fn state(&self) -> &BasicState {
        &self.state
    }

    fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<RunStatus, SimulationError> {
        let before = self.state.level;
        let attempt = resolve_basic_attempt(self.table, &self.state, self.combo, rng)?;
        self.progress
            .charge(&attempt.materials, attempt.gold, attempt.combo, true);
        if attempt.success {
            self.progress
                .close_level(attempt.state.level, Some(self.state.pity));
        }
        self.state = attempt.state;
        Ok(self.progress.advance(before, self.state.level))
    }
}

#[derive(Debug, Clone)]
pub struct AdvancedRun {
    table: &'static AdvancedTable,
    policy: BoosterPolicy,
    state: AdvancedState,
    progress: Progress,
}

impl AdvancedRun {
    pub fn state(&self) -> &AdvancedState {
        &self.state
    }

    fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<RunStatus, SimulationError> {
        let before = self.state.level;
        let attempt = resolve_advanced_attempt(self.table, &self.state, &self.policy, rng)?;
        self.progress
            .charge(&attempt.materials, attempt.gold, attempt.combo, !attempt.free);
        if attempt.levels_gained > 0 {
            self.progress.close_level(attempt.state.level, None);
        }
        self.state = attempt.state;
        Ok(self.progress.advance(before, self.state.level))
    }
}

/// One item being refined from its current level towards a target.
#[derive(Debug, Clone)]
pub enum SimulationRun {
    Basic(BasicRun),
    Advanced(AdvancedRun),
}

impl SimulationRun {
    /// Start a run for `input`, giving up after `max_attempts` attempts.
    pub fn new(input: &ProjectionInput, max_attempts: u64) -> Result<Self, SimulationError> {
        let (min, max) = input.regime.level_bounds();
        for level in [input.current_level, input.target_level] {
            if !(min..=max).contains(&level) {
                return Err(TableError::InvalidLevel { level, min, max }.into());
            }
        }
        if input.target_level < input.current_level {
            return Err(SimulationError::InvalidTarget {
                current: input.current_level,
                target: input.target_level,
            });
        }

        let progress = Progress::new(
            input.regime,
            input.current_level,
            input.target_level,
            max_attempts,
        );
        let run = match input.regime.basic_variant() {
            Some(variant) => SimulationRun::Basic(BasicRun {
                table: BasicTable::get(input.equipment, variant),
                combo: input.policy.normal,
                state: BasicState::new(input.current_level),
                progress,
            }),
            None => SimulationRun::Advanced(AdvancedRun {
                table: AdvancedTable::get(input.equipment),
                policy: input.policy,
                state: AdvancedState::new(input.current_level),
                progress,
            }),
        };
        Ok(run)
    }

    fn progress(&self) -> &Progress {
        match self {
            SimulationRun::Basic(run) => &run.progress,
            SimulationRun::Advanced(run) => &run.progress,
        }
    }

    pub fn level(&self) -> u32 {
        match self {
            SimulationRun::Basic(run) => run.state.level,
            SimulationRun::Advanced(run) => run.state.level,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.progress().status
    }

    /// Resolve one attempt. Terminal runs stay where they are.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<RunStatus, SimulationError> {
        if self.status().is_terminal() {
            return Ok(self.status());
        }
        match self {
            SimulationRun::Basic(run) => run.step(rng),
            SimulationRun::Advanced(run) => run.step(rng),
        }
    }

    /// Step until the target is reached.
    ///
    /// Hitting the attempt cap is reported as `NonConvergence`: with the
    /// shipped tables every run terminates, so it means a broken table.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<RunSummary, SimulationError> {
        loop {
            match self.step(rng)? {
                RunStatus::MaxLevelReached => return Ok(self.summary()),
                RunStatus::NonConvergent => {
                    let progress = self.progress();
                    tracing::warn!(
                        target_level = progress.target,
                        reached = self.level(),
                        attempts = progress.attempts,
                        "refining run hit the attempt cap"
                    );
                    return Err(SimulationError::NonConvergence {
                        target: progress.target,
                        reached: self.level(),
                        attempts: progress.attempts,
                    });
                }
                _ => {}
            }
        }
    }

    pub fn summary(&self) -> RunSummary {
        self.progress().summary(self.level())
    }
}

/// Monte Carlo batch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    pub runs: usize,
    /// Run `i` is seeded with `seed + i`; `None` draws a fresh base seed.
    pub seed: Option<u64>,
    pub max_attempts: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            runs: 1000,
            seed: None,
            max_attempts: 100_000,
        }
    }
}

impl SimulationConfig {
    pub fn quick(seed: u64) -> Self {
        Self {
            runs: 200,
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn thorough(seed: u64) -> Self {
        Self {
            runs: 10_000,
            seed: Some(seed),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub runs: usize,
    pub seed: u64,
    pub mean_attempts: f64,
    pub median_attempts: u64,
    pub p90_attempts: u64,
    pub min_attempts: u64,
    pub max_attempts: u64,
    pub mean_paid_attempts: f64,
    pub mean_materials: MaterialLedger,
    pub mean_gold: f64,
}

fn percentile(sorted: &[u64], fraction: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let index = ((sorted.len() - 1) as f64 * fraction).round() as usize;
    sorted[index.min(sorted.len() - 1)]
}

impl SimulationReport {
    pub fn from_runs(runs: &[RunSummary], seed: u64) -> Self {
        let count = runs.len();
        let scale = if count == 0 { 0.0 } else { 1.0 / count as f64 };

        let mut attempts: Vec<u64> = runs.iter().map(|run| run.attempts).collect();
        attempts.sort_unstable();
        let total_attempts: u64 = attempts.iter().sum();
        let total_paid: u64 = runs.iter().map(|run| run.paid_attempts).sum();
        let materials: MaterialLedger = runs.iter().fold(MaterialLedger::new(), |acc, run| acc + run.materials);
        let gold: f64 = runs.iter().map(|run| run.gold).sum();

        Self {
            runs: count,
            seed,
            mean_attempts: total_attempts as f64 * scale,
            median_attempts: percentile(&attempts, 0.5),
            p90_attempts: percentile(&attempts, 0.9),
            min_attempts: attempts.first().copied().unwrap_or(0),
            max_attempts: attempts.last().copied().unwrap_or(0),
            mean_paid_attempts: total_paid as f64 * scale,
            mean_materials: materials.scaled(scale),
            mean_gold: gold * scale,
        }
    }
}

/// Run `config.runs` independent simulations of `input` in parallel.
pub fn simulate_runs(
    input: &ProjectionInput,
    config: &SimulationConfig,
) -> Result<SimulationReport, SimulationError> {
    // Reject bad input once instead of once per run.
    SimulationRun::new(input, config.max_attempts)?;

    let seed = config.seed.unwrap_or_else(rand::random);
    let summaries = (0..config.runs)
        .into_par_iter()
        .map(|index| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(index as u64));
            SimulationRun::new(input, config.max_attempts)?.run(&mut rng)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let report = SimulationReport::from_runs(&summaries, seed);
    tracing::info!(
        equipment = input.equipment.name(),
        regime = ?input.regime,
        from = input.current_level,
        to = input.target_level,
        runs = report.runs,
        seed,
        mean_attempts = report.mean_attempts,
        "simulation batch finished"
    );
    Ok(report)
}
