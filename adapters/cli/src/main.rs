#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays observations through the platformer agent.

mod scenario;
mod snapshot_transfer;
mod soak;

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use platformer_agent::{decide, Agent, AgentConfig, AgentState};
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

/// Command-line arguments accepted by the binary.
#[derive(Debug, Parser)]
#[command(name = "platformer-agent", about = "Reactive platformer agent tools")]
struct Cli {
    /// Agent configuration TOML; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replays a scripted scenario and prints the controls chosen each tick.
    Run {
        /// Scenario TOML describing the frames to replay.
        #[arg(long)]
        scenario: PathBuf,
    },
    /// Prints the transfer string for one frame of a scenario.
    Encode {
        /// Scenario TOML describing the frames.
        #[arg(long)]
        scenario: PathBuf,
        /// Zero-based frame index after repeats are expanded.
        #[arg(long, default_value_t = 0)]
        frame: usize,
    },
    /// Decodes a transfer string and runs a single fresh decision on it.
    Decide {
        /// Transfer string produced by `encode`.
        #[arg(long)]
        snapshot: String,
    },
    /// Feeds seeded random observations through the pipeline and checks its
    /// invariants on every tick.
    Soak {
        /// Seed for the observation generator.
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Ticks to simulate.
        #[arg(long, default_value_t = 10_000)]
        ticks: u64,
    },
}

/// Entry point for the platformer agent command-line interface.
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run { scenario } => run(config, &scenario),
        Command::Encode { scenario, frame } => encode(&scenario, frame),
        Command::Decide { snapshot } => decide_snapshot(&config, &snapshot),
        Command::Soak { seed, ticks } => {
            let report = soak::soak(&config, seed, ticks)?;
            let json =
                serde_json::to_string_pretty(&report).context("failed to serialise soak report")?;
            println!("{json}");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AgentConfig> {
    match path {
        Some(path) => AgentConfig::load(path)
            .with_context(|| format!("failed to load agent config {}", path.display())),
        None => Ok(AgentConfig::default()),
    }
}

fn run(config: AgentConfig, path: &Path) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let mut agent = Agent::try_new(config).context("agent config rejected")?;
    let Some(first) = scenario.frames().first() else {
        return Ok(());
    };
    agent.initialize(first);

    for (tick, frame) in scenario.frames().iter().enumerate() {
        let actions = agent.get_actions(frame).to_string();
        println!("tick {tick:04}  {actions:<18} {}", describe(agent.state()));
    }
    Ok(())
}

fn encode(path: &Path, frame: usize) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let frames = scenario.frames();
    ensure!(
        frame < frames.len(),
        "frame {frame} is out of range; the scenario has {} frames",
        frames.len()
    );
    let encoded = snapshot_transfer::encode(&frames[frame]).context("failed to encode frame")?;
    println!("{encoded}");
    Ok(())
}

fn decide_snapshot(config: &AgentConfig, snapshot: &str) -> Result<()> {
    let observation =
        snapshot_transfer::decode(snapshot).context("failed to decode observation snapshot")?;
    let decision = decide(config, &observation, &AgentState::default());
    println!("{}  {}", decision.actions, describe(&decision.state));
    Ok(())
}

fn describe(state: &AgentState) -> String {
    let jump = match state.jump.target_duration() {
        Some(target) => format!(
            "{} {}/{target}",
            state.jump.cause().label(),
            state.jump.elapsed()
        ),
        None => "-".to_owned(),
    };
    format!("jump={jump} drift={}", state.drift)
}
