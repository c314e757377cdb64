//! PV headless simulator — runs one environment's pipeline in the terminal.
//!
//! Drives an `EnvironmentController` on a Tokio clock, logging each stage
//! transition and log line as it happens, then prints a summary (or a JSON
//! snapshot with `--json`).

mod runner;

use anyhow::{Context, Result};
use clap::Parser;
use pv_core::{Environment, PipelineCatalog};
use pv_engine::{EnvironmentController, RunStatus, SeededEntropy};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "pv-sim")]
#[command(about = "Simulate a pipeline run for one environment", long_about = None)]
#[command(version)]
struct Cli {
    /// Environment to run (dev, beta, preprod, prod)
    #[arg(short, long, default_value = "dev", value_parser = parse_environment)]
    env: Environment,

    /// JSON catalog to load instead of the built-in one
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for delay jitter, failure rolls and generated metrics
    #[arg(long, default_value_t = pv_engine::DEFAULT_SEED)]
    seed: u64,

    /// Let each stage fail with probability 1 - RATE
    #[arg(long, value_name = "RATE", value_parser = parse_rate)]
    success_rate: Option<f64>,

    /// Clock speed multiplier; 0 runs instantly
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Print the final state as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn parse_environment(s: &str) -> Result<Environment, String> {
    s.parse().map_err(|e: pv_core::ConfigError| e.to_string())
}

fn parse_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|_| format!("not a number: {s}"))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("success rate must be within 0..=1, got {rate}"))
    }
}

fn load_catalog(path: Option<&std::path::Path>) -> Result<PipelineCatalog> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            PipelineCatalog::from_json(&json)
                .with_context(|| format!("loading catalog {}", path.display()))
        }
        None => Ok(PipelineCatalog::builtin()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let catalog = load_catalog(cli.config.as_deref())?;
    let mut controller = EnvironmentController::from_catalog(&catalog, cli.env)
        .with_context(|| format!("mounting {}", cli.env))?
        .with_entropy(SeededEntropy::new(cli.seed))
        .with_settings(runner::settings(cli.success_rate));

    runner::drive(&mut controller, cli.speed).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&controller.snapshot())?);
    } else {
        print!("{}", runner::summary(&controller));
    }

    Ok(match controller.status() {
        RunStatus::Failed => ExitCode::from(2),
        _ => ExitCode::SUCCESS,
    })
}
