//! Integration test: simulated runs against the closed-form model
//!
//! Seeded Monte Carlo batches should land near the aggregator's
//! expectations, and the per-attempt resolver should honour its guarantees
//! for any random stream.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use refine_model::{
    AdvancedState, AdvancedTable, BasicState, BasicTable, BasicVariant, BoosterCombo,
    BoosterPolicy, EXP_PER_LEVEL, EquipmentType, ProjectionInput, Regime, SimulationConfig,
    SimulationError, SimulationRun, expected_resources, resolve_advanced_attempt,
    resolve_basic_attempt, simulate_runs,
};

fn input(regime: Regime, current_level: u32, target_level: u32) -> ProjectionInput {
    ProjectionInput {
        equipment: EquipmentType::Armor,
        regime,
        current_level,
        target_level,
        policy: BoosterPolicy::default(),
    }
}

fn relative_gap(simulated: f64, analytic: f64) -> f64 {
    (simulated - analytic).abs() / analytic
}

// =============================================================================
// Monte Carlo vs closed form
// =============================================================================

#[test]
fn basic_mean_matches_exact_expectation() {
    let request = input(Regime::Basic, 11, 12);
    let analytic = expected_resources(&request).unwrap().expected_attempts;
    let report = simulate_runs(&request, &SimulationConfig::thorough(7)).unwrap();
    assert!(
        relative_gap(report.mean_attempts, analytic) < 0.03,
        "simulated {} vs analytic {analytic}",
        report.mean_attempts
    );
    assert!(report.max_attempts <= 15);
}

#[test]
fn advanced_stage_mean_is_near_closed_form() {
    // The closed form ignores exp lost at the stage boundary and the empty
    // meter at the start, so simulated runs come out slightly longer.
    let request = input(Regime::Advanced, 0, 10);
    let analytic = expected_resources(&request).unwrap();
    let report = simulate_runs(
        &request,
        &SimulationConfig {
            runs: 2000,
            ..SimulationConfig::quick(2024)
        },
    )
    .unwrap();
    assert!(
        relative_gap(report.mean_attempts, analytic.expected_attempts) < 0.05,
        "simulated {} vs analytic {}",
        report.mean_attempts,
        analytic.expected_attempts
    );
    assert!(report.mean_paid_attempts < report.mean_attempts);
}

#[test]
fn unreachable_cap_is_reported_not_truncated() {
    let config = SimulationConfig {
        runs: 8,
        seed: Some(1),
        max_attempts: 3,
    };
    let result = simulate_runs(&input(Regime::Advanced, 0, 40), &config);
    assert!(matches!(
        result,
        Err(SimulationError::NonConvergence {
            target: 40,
            attempts: 3,
            ..
        })
    ));
}

// =============================================================================
// Resolver guarantees under random streams
// =============================================================================

#[test]
fn full_pity_always_succeeds() {
    let table = BasicTable::get(EquipmentType::Weapon, BasicVariant::Succession);
    for seed in 0..200 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let state = BasicState {
            level: 11 + (seed % 14) as u32,
            pity: 1.0,
            probability_bonus: 0.0,
        };
        let attempt = resolve_basic_attempt(table, &state, BoosterCombo::NONE, &mut rng).unwrap();
        assert!(attempt.success);
        assert_eq!(attempt.state.level, state.level + 1);
    }
}

#[test]
fn capped_exp_always_levels_up() {
    let table = AdvancedTable::get(EquipmentType::Weapon);
    let policy = BoosterPolicy::new(BoosterCombo::NONE, BoosterCombo::BREATH);
    for seed in 0..200 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let state = AdvancedState {
            level: (seed % 40) as u32,
            exp: EXP_PER_LEVEL,
            bonus_turn_ready: seed % 3 == 0,
            ..Default::default()
        };
        let attempt = resolve_advanced_attempt(table, &state, &policy, &mut rng).unwrap();
        assert!(attempt.state.level > state.level);
        assert!(attempt.state.exp < EXP_PER_LEVEL);
    }
}

#[test]
fn basic_probability_stays_in_unit_interval() {
    for table in BasicTable::all() {
        for combo in BoosterCombo::ALL {
            let mut state = BasicState::new(24);
            let mut rng = ChaCha8Rng::seed_from_u64(5);
            for _ in 0..50 {
                let Ok(attempt) = resolve_basic_attempt(table, &state, combo, &mut rng) else {
                    break;
                };
                assert!(attempt.probability > 0.0 && attempt.probability <= 1.0);
                if attempt.success {
                    break;
                }
                state = attempt.state;
            }
        }
    }
}

#[test]
fn stepping_a_run_by_hand_matches_run() {
    let request = input(Regime::Advanced, 20, 23);
    let mut stepped = SimulationRun::new(&request, 10_000).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    while !stepped.step(&mut rng).unwrap().is_terminal() {}

    let mut whole = SimulationRun::new(&request, 10_000).unwrap();
    let summary = whole.run(&mut ChaCha8Rng::seed_from_u64(3)).unwrap();
    assert_eq!(stepped.summary(), summary);
    assert_eq!(summary.final_level, 23);
}
