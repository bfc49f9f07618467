//! Closed-loop exploration demo.
//!
//! Runs a swarm on an ASCII map or a seeded random grid until every agent
//! has found its way out, then prints per-agent map dumps and a summary.
//!
//! Usage:
//!   cargo run --bin explore_sim -- --map maps/chamber.txt
//!   cargo run --bin explore_sim -- --width 20 --height 20 --agents 3
//!
//! Enable logging to watch the protocol:
//!   RUST_LOG=debug cargo run --bin explore_sim

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use anvesha_nav::{Scenario, SwarmConfig, SwarmRunner};

/// Cooperative grid exploration demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// ASCII map file ('.' open, '#' obstacle, 'E' exit, digits = agents)
    #[arg(long)]
    map: Option<PathBuf>,

    /// Swarm configuration YAML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random map width (ignored with --map)
    #[arg(long, default_value_t = 15)]
    width: i32,

    /// Random map height (ignored with --map)
    #[arg(long, default_value_t = 15)]
    height: i32,

    /// Number of agents on a random map
    #[arg(long, default_value_t = 2)]
    agents: usize,

    /// Obstacle density on a random map (0.0 - 1.0)
    #[arg(long, default_value_t = 0.08)]
    obstacle_density: f64,

    /// Random map seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Agents (by id, from 0) with unbounded communication
    #[arg(long, default_value_t = 0)]
    super_agents: usize,

    /// Tick cap
    #[arg(long, default_value_t = 2000)]
    max_ticks: u64,

    /// Print each agent's final matrix
    #[arg(long)]
    dump: bool,
}

fn run(args: Args) -> anvesha_nav::error::Result<()> {
    let config = match &args.config {
        Some(path) => SwarmConfig::load(path)?,
        None => SwarmConfig::default(),
    };

    let mut scenario = match &args.map {
        Some(path) => Scenario::from_ascii(&std::fs::read_to_string(path)?)?,
        None => Scenario::random(
            args.width,
            args.height,
            args.agents,
            args.obstacle_density,
            args.seed,
        ),
    };
    scenario.super_agents = args.super_agents;

    let mut runner = SwarmRunner::new(&scenario, config)?;
    let summary = runner.run(args.max_ticks);

    if args.dump {
        for explorer in runner.explorers() {
            println!("{}", explorer.matrix().render());
        }
    }

    println!(
        "{} / {} agents out after {} ticks{}",
        summary.finished,
        summary.agents,
        summary.ticks,
        if summary.complete() { "" } else { " (tick cap hit)" }
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
