#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless runner that plays a skirmish scenario frame by frame.

mod scenario;
mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{scenario::Scenario, simulation::Simulation};

/// Command-line options.
#[derive(Debug, Parser)]
#[command(name = "skirmish", about = "Runs a skirmish scenario without rendering")]
struct Cli {
    /// Scenario TOML file.
    #[arg(long)]
    scenario: PathBuf,
    /// Number of frames to simulate; overrides the scenario.
    #[arg(long)]
    frames: Option<u32>,
    /// Frame length in milliseconds; overrides the scenario.
    #[arg(long)]
    frame_ms: Option<u64>,
    /// Seed used to scatter extra AI walls.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let scenario = Scenario::load(&cli.scenario)?;
    let frames = cli.frames.unwrap_or(scenario.frames);
    let frame_ms = cli.frame_ms.unwrap_or(scenario.frame_ms);
    if frame_ms == 0 {
        bail!("--frame-ms must be at least 1");
    }

    let mut simulation = Simulation::new(&scenario, cli.seed)?;
    let report = simulation.run(frames, Duration::from_millis(frame_ms));
    tracing::info!(
        frames = report.frames_run,
        arrived = report.arrived_at.is_some(),
        "scenario finished"
    );
    println!("{report}");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skirmish=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_are_optional() {
        let cli = Cli::try_parse_from(["skirmish", "--scenario", "arena.toml"])
            .expect("arguments parse");

        assert_eq!(cli.scenario, PathBuf::from("arena.toml"));
        assert_eq!(cli.frames, None);
        assert_eq!(cli.frame_ms, None);
        assert_eq!(cli.seed, 0);

        let cli = Cli::try_parse_from([
            "skirmish",
            "--scenario",
            "arena.toml",
            "--frames",
            "30",
            "--frame-ms",
            "125",
            "--seed",
            "7",
        ])
        .expect("arguments parse");
        assert_eq!(cli.frames, Some(30));
        assert_eq!(cli.frame_ms, Some(125));
        assert_eq!(cli.seed, 7);
    }
}
