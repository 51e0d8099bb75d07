#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Bastion level headlessly and reports the
//! outcome.

mod level_file;
mod settings;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use bastion_core::{BuildOrder, CellCoord, Event, TowerClassId};
use bastion_simulation::{Outcome, Simulation};
use bastion_world::query;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "bastion", about = "Plays a Bastion level without a display")]
struct Args {
    /// Level file to play.
    level: PathBuf,

    /// TOML settings file with world tuning and tower classes.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Simulated frame length in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Stops the run after this many simulated seconds.
    #[arg(long, default_value_t = 900)]
    max_seconds: u64,

    /// Overrides the spawn seed from the settings file.
    #[arg(long)]
    seed: Option<u64>,

    /// Places a tower before the first wave, as CLASS@ROW,COLUMN. Repeatable.
    #[arg(long = "tower", value_parser = parse_placement)]
    towers: Vec<Placement>,

    /// Sends every wave as soon as possible instead of waiting for timers.
    #[arg(long)]
    rush: bool,
}

#[derive(Clone, Debug)]
struct Placement {
    class: TowerClassId,
    origin: CellCoord,
}

fn parse_placement(text: &str) -> Result<Placement, String> {
    let (class, cell) = text
        .split_once('@')
        .ok_or_else(|| format!("expected CLASS@ROW,COLUMN, got `{text}`"))?;
    let (row, column) = cell
        .split_once(',')
        .ok_or_else(|| format!("expected ROW,COLUMN after `@`, got `{cell}`"))?;
    let row = row
        .trim()
        .parse()
        .map_err(|_| format!("invalid row `{row}`"))?;
    let column = column
        .trim()
        .parse()
        .map_err(|_| format!("invalid column `{column}`"))?;
    Ok(Placement {
        class: TowerClassId::new(class.trim()),
        origin: CellCoord::new(row, column),
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bastion=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.frame_ms == 0 {
        bail!("--frame-ms must be positive");
    }

    let contents = fs::read_to_string(&args.level)
        .with_context(|| format!("failed to read level file {}", args.level.display()))?;
    let level_file = level_file::parse(&contents)
        .with_context(|| format!("failed to load level file {}", args.level.display()))?;
    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let catalog = settings.catalog()?;

    println!(
        "{} by {} (version {})",
        level_file.level.name(),
        if level_file.author.is_empty() {
            "unknown"
        } else {
            level_file.author.as_str()
        },
        level_file.version
    );
    if !level_file.description.is_empty() {
        println!("{}", level_file.description);
    }

    let mut simulation = Simulation::new(
        level_file.level,
        catalog,
        settings.simulation_config(args.seed),
    );

    for placement in args.towers {
        let order = BuildOrder::PlaceTower {
            class: placement.class,
            origin: placement.origin,
        };
        for event in simulation.build(order) {
            match event {
                Event::TowerPlaced { tower, class, cost, .. } => {
                    tracing::info!(?tower, %class, cost, "tower placed");
                }
                Event::TowerPlacementRejected {
                    class,
                    origin,
                    reason,
                } => {
                    eprintln!(
                        "skipping {class} at row {}, column {}: {reason}",
                        origin.row(),
                        origin.column()
                    );
                }
                _ => {}
            }
        }
    }

    let frame = Duration::from_millis(args.frame_ms);
    let limit = Duration::from_secs(args.max_seconds);
    let mut elapsed = Duration::ZERO;
    let mut frames: u64 = 0;
    simulation.start();
    while simulation.outcome() == Outcome::InProgress && elapsed < limit {
        if args.rush {
            while simulation.send_next_wave() {}
        }
        let _ = simulation.step(frame);
        elapsed += frame;
        frames += 1;
    }

    let session = simulation.session();
    let outcome = match simulation.outcome() {
        Outcome::Victory => "victory",
        Outcome::Defeat => "defeat",
        Outcome::InProgress => "unfinished",
    };
    println!(
        "outcome: {outcome} after {:.1} s ({frames} frames)",
        elapsed.as_secs_f32()
    );
    println!(
        "lives: {}  bucks: {}  destroyed: {}  leaked: {}",
        session.lives(),
        session.bucks(),
        session.destroyed(),
        session.leaked()
    );
    println!(
        "towers: {}  waves started: {}",
        query::tower_count(simulation.world()),
        simulation.scheduler().waves_started()
    );
    Ok(())
}
