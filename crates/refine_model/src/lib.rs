mod aggregator;
mod booster;
mod cost;
mod data;
mod ledger;
mod request;
mod resolver;
mod simulation;
mod tables;

pub use aggregator::{
    CostProjection, ExpectedResourceCost, LevelExpectation, ProjectionError, ProjectionInput,
    Segment, StageExpectation, expected_resources, level_expectation, level_expectations, project,
    project_batch, stage_expectation, stage_expectations,
};
pub use booster::{BoosterCombo, BoosterPolicy, NUM_BOOSTER_COMBOS, NUM_BOOSTERS};
pub use cost::{CostError, PriceSnapshot};
pub use data::{
    ADVANCED_MAX_LEVEL, BASIC_MAX_LEVEL, BASIC_MIN_LEVEL, BONUS_TURN_INTERVAL, BasicVariant,
    EXP_PER_LEVEL, EXP_PER_STAGE, EquipmentType, LEVELS_PER_STAGE, MaterialKind, NUM_BASIC_LEVELS,
    NUM_MATERIALS, NUM_STAGES, Regime,
};
pub use ledger::MaterialLedger;
pub use request::{
    AttemptResponse, PityState, ProjectionRequest, ProjectionResponse, handle_projection,
};
pub use resolver::{
    AdvancedAttempt, AdvancedState, AncestorDraw, BasicAttempt, BasicState, gain_exp,
    resolve_advanced_attempt, resolve_basic_attempt,
};
pub use simulation::{
    AdvancedRun, AttemptRecord, BasicRun, RunStatus, RunSummary, SimulationConfig,
    SimulationError, SimulationReport, SimulationRun, next_status, simulate_runs,
};
pub use tables::{
    AdvancedStageData, AdvancedTable, Ancestor, AncestorCard, AttemptCost, BREATH_BONUS_RATIO,
    BasicLevelData, BasicTable, ExpEffect, FAILURE_BONUS_RATIO, GRADE_PROBABILITIES, Grade,
    NUM_GRADES, PITY_DIVISOR, SideEffect, StageGroup, TableError, attempt_probability,
    expected_grade_exp, grade_distribution, is_pity_full, stage_of, validate_tables,
};
