//! Scenario Runner CLI
//!
//! Drives a [`marketsim_kernel::Kernel`] end-to-end from a JSON scenario file:
//! a run configuration, a seed, and an ordered action log. Prints the final
//! event-chain hash and a run summary, the way `backtest_run` drives a
//! `BacktestOrchestrator` over a historical dataset.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin run_scenario -- --scenario scenario.json --verbose
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success, event chain verifies
//! - 2: Scenario file could not be parsed
//! - 3: Hash-chain verification failed after the run (internal fault)

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use marketsim_kernel::kernel::{Action, Kernel};
use marketsim_kernel::RunConfig;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Replay a deterministic market-simulation scenario and report its event chain.
#[derive(Parser, Debug)]
#[command(name = "run_scenario")]
#[command(about = "Drive the market simulation kernel through a scripted scenario")]
struct Cli {
    /// Path to a scenario JSON file (config, seed, agents, ordered ticks).
    #[arg(short, long)]
    scenario: PathBuf,

    /// Emit per-tick progress to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Export the full event log as NDJSON to this path.
    #[arg(short, long)]
    export: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    run_id: String,
    seed: u32,
    config: RunConfig,
    agents: Vec<String>,
    /// One entry per tick: the actions each named agent submits that tick.
    ticks: Vec<HashMap<String, Vec<Action>>>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let raw = fs::read_to_string(&cli.scenario)
        .with_context(|| format!("reading scenario file {}", cli.scenario.display()))?;
    let scenario: ScenarioFile = match cli.scenario.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&raw)
            .with_context(|| format!("parsing scenario file {}", cli.scenario.display()))?,
        _ => serde_json::from_str(&raw)
            .with_context(|| format!("parsing scenario file {}", cli.scenario.display()))?,
    };

    let mut kernel = Kernel::new(scenario.run_id.clone(), scenario.config, scenario.seed)
        .context("constructing kernel from scenario config")?;
    kernel.start().context("starting run")?;

    let mut agent_ids = HashMap::with_capacity(scenario.agents.len());
    for name in &scenario.agents {
        let created = kernel.create_agent(name.clone());
        if cli.verbose {
            eprintln!("agent {name} -> id {} (api key {})", created.agent_id, created.api_key);
        }
        agent_ids.insert(name.clone(), created.agent_id);
    }

    for (tick_idx, submissions) in scenario.ticks.into_iter().enumerate() {
        for (agent_name, actions) in submissions {
            let agent_id = agent_ids
                .get(&agent_name)
                .with_context(|| format!("scenario references unknown agent '{agent_name}'"))?;
            let idempotency_key = format!("{}-{}-{}", scenario.run_id, tick_idx, agent_name);
            kernel.submit_actions(agent_id, actions, &idempotency_key);
        }
        kernel.advance_tick().context("advancing tick")?;
        if cli.verbose {
            eprintln!(
                "tick {} complete; best_bid={:?} best_ask={:?}",
                tick_idx,
                kernel.best_bid(),
                kernel.best_ask()
            );
        }
    }

    kernel.stop("scenario complete").context("stopping run")?;

    let verification = kernel.events().verify_chain();
    if !verification.is_valid() {
        eprintln!("event chain verification FAILED: {verification:?}");
        std::process::exit(3);
    }

    if let Some(export_path) = &cli.export {
        fs::write(export_path, kernel.events().export_ndjson())
            .with_context(|| format!("writing export to {}", export_path.display()))?;
    }

    println!("run_id:          {}", kernel.run_id());
    println!("ticks processed: {}", kernel.current_tick());
    println!("events:          {}", kernel.events().len());
    println!("last_hash:       {}", kernel.events().last_hash());
    println!("active agents:   {}", kernel.active_agent_count());
    println!("bankrupt agents: {}", kernel.bankrupt_agent_count());

    Ok(())
}
