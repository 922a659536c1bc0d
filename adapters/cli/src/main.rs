#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays the skull event on a simulated clock.

mod scenario;
mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crate::{
    scenario::{parse_stage_cues, Scenario},
    simulation::Simulation,
};

#[derive(Debug, Parser)]
#[command(name = "skull-event")]
#[command(about = "Replays the stage-driven skull pickup event on a simulated clock")]
struct Cli {
    /// Scenario TOML with `[stage]`, `[area]` and `[template]` tables.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Seed for the scheduler's random source.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Simulated frames per second.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,
    /// Simulated seconds to run.
    #[arg(long, default_value_t = 120.0)]
    duration: f32,
    /// Stage schedule as `seconds:stage` pairs, e.g. `0:1,60:2,90:0`.
    #[arg(long, default_value = "0:1")]
    stages: String,
    /// Collects each skull once it has been alive this many seconds.
    #[arg(long, value_name = "SECONDS")]
    collect_after: Option<f32>,
}

/// Entry point for the skull event command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let duration = Duration::try_from_secs_f32(cli.duration)
        .context("--duration must be a non-negative number of seconds")?;
    let collect_after = cli
        .collect_after
        .map(Duration::try_from_secs_f32)
        .transpose()
        .context("--collect-after must be a non-negative number of seconds")?;

    let scenario = match &cli.config {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };
    let cues = parse_stage_cues(&cli.stages).context("invalid --stages schedule")?;

    info!(
        "simulating {:.1}s at {} fps with seed {}",
        cli.duration, cli.fps, cli.seed
    );
    let mut simulation = Simulation::new(
        scenario,
        cli.seed,
        cues,
        collect_after,
    )
    .context("invalid stage tuning")?;
    simulation.run(duration, Duration::from_secs(1) / cli.fps);

    for entry in simulation.timeline() {
        println!("{entry}");
    }
    println!("{}", simulation.summary());
    Ok(())
}
