use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use refine_model::{
    BASIC_MAX_LEVEL, BASIC_MIN_LEVEL, BasicTable, BasicVariant, BoosterCombo, BoosterPolicy,
    EquipmentType, MaterialKind, ProjectionRequest, SimulationConfig, handle_projection,
    level_expectations, simulate_runs, stage_expectations, validate_tables,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "refine")]
#[command(about = "Expected attempts and costs for equipment refining", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn parse_equipment(name: &str) -> Result<EquipmentType, String> {
    EquipmentType::from_name(name).ok_or_else(|| format!("expected armor or weapon, got '{name}'"))
}

fn parse_variant(name: &str) -> Result<BasicVariant, String> {
    BasicVariant::from_name(name)
        .ok_or_else(|| format!("expected standard or succession, got '{name}'"))
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Project expected attempts, materials and gold for a request file
    Project {
        /// Request JSON (equipmentType, regime, currentLevel, targetLevel, ...)
        #[arg(short, long)]
        request: PathBuf,

        /// Price JSON mapping material kinds to gold, merged over the request's unitPrices
        #[arg(short, long)]
        prices: Option<PathBuf>,
    },

    /// Simulate many runs of a request and summarise the attempts they took
    Simulate {
        #[arg(short, long)]
        request: PathBuf,

        #[arg(long, default_value_t = 1000)]
        runs: usize,

        /// Base seed; run i uses seed + i
        #[arg(long)]
        seed: Option<u64>,

        /// Attempts per run before it is reported as non-convergent
        #[arg(long, default_value_t = 100_000)]
        max_attempts: u64,
    },

    /// Print per-stage advanced refining constants for a booster policy
    Stages {
        #[arg(short, long, value_parser = parse_equipment)]
        equipment: EquipmentType,

        /// Policy key, e.g. none_none or breath_both
        #[arg(short, long, default_value = "none_none")]
        policy: String,
    },

    /// Print per-level basic refining expectations
    Levels {
        #[arg(short, long, value_parser = parse_equipment)]
        equipment: EquipmentType,

        #[arg(short, long, value_parser = parse_variant, default_value = "standard")]
        variant: BasicVariant,

        #[arg(short, long, default_value = "none")]
        combo: String,
    },
}

fn read_request(path: &Path) -> Result<ProjectionRequest> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read request {}", path.display()))?;
    ProjectionRequest::from_json(&json)
        .with_context(|| format!("Failed to parse request {}", path.display()))
}

fn read_prices(path: &Path) -> Result<BTreeMap<MaterialKind, f64>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read prices {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse prices {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "refine_model=info,refine_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    validate_tables().context("Shipped refining tables are inconsistent")?;

    let cli = Cli::parse();
    match cli.command {
        Command::Project { request, prices } => {
            let mut request = read_request(&request)?;
            if let Some(path) = prices {
                request.merge_prices(read_prices(&path)?);
            }
            let response = handle_projection(&request).context("Projection failed")?;
            print_json(&response)?;
        }

        Command::Simulate {
            request,
            runs,
            seed,
            max_attempts,
        } => {
            let request = read_request(&request)?;
            let config = SimulationConfig {
                runs,
                seed,
                max_attempts,
            };
            tracing::info!(runs, ?seed, max_attempts, "starting simulation");
            let report = simulate_runs(&request.input(), &config).context("Simulation failed")?;
            print_json(&report)?;
        }

        Command::Stages { equipment, policy } => {
            let policy = BoosterPolicy::from_key(&policy)
                .ok_or_else(|| anyhow!("Unknown booster policy '{policy}'"))?;
            let stages = stage_expectations(equipment, &policy)
                .with_context(|| format!("No stage constants for '{}'", policy.key()))?;
            print_json(&stages)?;
        }

        Command::Levels {
            equipment,
            variant,
            combo,
        } => {
            let combo = BoosterCombo::from_name(&combo)
                .ok_or_else(|| anyhow!("Unknown booster combo '{combo}'"))?;
            let table = BasicTable::get(equipment, variant);
            let levels = level_expectations(table, BASIC_MIN_LEVEL, BASIC_MAX_LEVEL, combo)
                .with_context(|| format!("No level expectations for '{combo}'"))?;
            print_json(&levels)?;
        }
    }

    Ok(())
}
