#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for inspecting and simulating Dash Runner races.

mod simulate;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dash_runner_config::{AssetCatalog, GameConfig};
use dash_runner_core::{Placement, SessionSeed, SpawnCategory, TrackIndex, ZoneBlock};
use dash_runner_system_spawning::SpawnPolicy;
use dash_runner_system_zones::ZoneSequencer;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Deterministic world generation and sync tooling for Dash Runner.
#[derive(Debug, Parser)]
#[command(name = "dash-runner", version, about)]
struct Cli {
    /// TOML configuration file layered over the built-in defaults.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Server overrides as inline JSON or `@path/to/file.json`.
    #[arg(long, global = true, value_name = "JSON")]
    overrides: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Prints the zone of each block for a seed.
    Zones {
        /// Session seed.
        #[arg(long)]
        seed: Option<String>,
        /// Number of blocks to print.
        #[arg(long, default_value_t = 10)]
        blocks: u64,
    },
    /// Prints spawn decisions over a range of track indices.
    Spawns {
        /// Session seed.
        #[arg(long)]
        seed: Option<String>,
        /// First track index.
        #[arg(long, default_value_t = 0)]
        from: u64,
        /// Number of track indices.
        #[arg(long, default_value_t = 40)]
        count: u64,
        /// Restricts output to one category.
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,
    },
    /// Prints every model URL to preload.
    Assets,
    /// Runs a headless race between simulated peers.
    Simulate {
        /// Session seed.
        #[arg(long)]
        seed: Option<String>,
        /// Number of simulated peers.
        #[arg(long, default_value_t = 2)]
        peers: u64,
        /// Number of frames to simulate.
        #[arg(long, default_value_t = 3_600)]
        frames: u64,
        /// Frame length in milliseconds.
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CategoryArg {
    Obstacle,
    Collectible,
    Date,
    Traffic,
    Light,
    Decoration,
}

impl From<CategoryArg> for SpawnCategory {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Obstacle => Self::Obstacle,
            CategoryArg::Collectible => Self::Collectible,
            CategoryArg::Date => Self::Date,
            CategoryArg::Traffic => Self::Traffic,
            CategoryArg::Light => Self::Light,
            CategoryArg::Decoration => Self::Decoration,
        }
    }
}

/// Entry point for the Dash Runner command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let overrides = cli.overrides.as_deref().map(parse_overrides).transpose()?;
    let config = load_config(cli.config.as_ref(), overrides.as_ref())?;

    match cli.command {
        Commands::Zones { seed, blocks } => {
            print_zones(&config, resolve_seed(&config, seed), blocks)
        }
        Commands::Spawns {
            seed,
            from,
            count,
            category,
        } => print_spawns(
            &config,
            resolve_seed(&config, seed),
            from,
            count,
            category.map(SpawnCategory::from),
        ),
        Commands::Assets => {
            for url in AssetCatalog::default().flatten() {
                println!("{url}");
            }
        }
        Commands::Simulate {
            seed,
            peers,
            frames,
            frame_ms,
        } => {
            if peers == 0 {
                bail!("a race needs at least one peer");
            }
            let seed = resolve_seed(&config, seed);
            info!(%seed, peers, frames, "starting headless race");
            let race = simulate::Race::new(&config, overrides, seed, peers)?;
            let summaries = simulate::run(race, frames, Duration::from_millis(frame_ms))?;
            println!("peer  tile  distance  score  crashed  rivals  dropped");
            for summary in summaries {
                println!(
                    "{:>4}  {:>4}  {:>8.1}  {:>5}  {:>7}  {:>6}  {:>7}",
                    summary.peer.get(),
                    summary.track_index.get(),
                    summary.distance,
                    summary.score,
                    summary.crashed,
                    summary.rivals_visible,
                    summary.dropped,
                );
            }
        }
    }
    Ok(())
}

fn parse_overrides(raw: &str) -> Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read overrides from {path}"))?,
        None => raw.to_owned(),
    };
    serde_json::from_str(&text).context("overrides are not valid JSON")
}

fn load_config(path: Option<&PathBuf>, overrides: Option<&Value>) -> Result<GameConfig> {
    let base = match path {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => GameConfig::default(),
    };
    match overrides {
        Some(overrides) => base
            .with_overrides(overrides)
            .context("failed to apply configuration overrides"),
        None => Ok(base),
    }
}

fn resolve_seed(config: &GameConfig, seed: Option<String>) -> SessionSeed {
    SessionSeed::new(seed.unwrap_or_else(|| config.world.seed.clone()))
}

fn print_zones(config: &GameConfig, seed: SessionSeed, blocks: u64) {
    let sequencer = ZoneSequencer::new(seed, config);
    println!("block  first  zone");
    for block in (0..blocks).map(ZoneBlock::new) {
        println!(
            "{:>5}  {:>5}  {}",
            block.get(),
            block.first_index(sequencer.segment_length()).get(),
            sequencer.zone_of_block(block)
        );
    }
}

fn print_spawns(
    config: &GameConfig,
    seed: SessionSeed,
    from: u64,
    count: u64,
    category: Option<SpawnCategory>,
) {
    let catalog = AssetCatalog::default();
    let policy = SpawnPolicy::new(seed, config, &catalog);
    println!("index  zone        category     placement        model");
    for index in (from..from.saturating_add(count)).map(TrackIndex::new) {
        for spawn in policy.decide_all(index) {
            if category.is_some_and(|wanted| wanted != spawn.category) {
                continue;
            }
            let placement = match spawn.placement {
                Placement::Lane(lane) => format!("lane {}", lane.get()),
                Placement::Roadside {
                    side,
                    lateral_offset,
                    scale,
                } => format!("{side:?} {lateral_offset:.1}m x{scale:.1}"),
            };
            let model = catalog
                .resolve(spawn.category, spawn.zone, spawn.variant)
                .unwrap_or("?");
            println!(
                "{:>5}  {:<10}  {:<11}  {:<15}  {}",
                index.get(),
                spawn.zone,
                spawn.category,
                placement,
                model
            );
        }
    }
}
