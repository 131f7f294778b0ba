//! anchor-sim: run an anchor-sync session against a simulated device.
//!
//! Usage:
//!   anchor-sim                              # Generated walk, 500ms asset load
//!   anchor-sim --script frames.toml         # Timed frames from a TOML script
//!   anchor-sim --fail-asset --json          # Missing asset, JSON summary
//!   anchor-sim --no-body-tracking           # Unsupported device (exits 1)

use anchor_sync_core::SessionConfig;
use anchor_sync_sim::feed::{walking_feed, WalkOptions};
use anchor_sync_sim::script::Script;
use anchor_sync_sim::SimOptions;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "anchor-sim")]
#[command(about = "Drive a body-tracked anchor session from a simulated tracking feed")]
struct Cli {
    /// Session config file (TOML). Defaults to $ANCHOR_SYNC_CONFIG or the user config dir
    #[arg(long)]
    config: Option<PathBuf>,

    /// Timed tracking frames (TOML). Replaces the generated walk
    #[arg(long)]
    script: Option<PathBuf>,

    /// Number of generated walk frames
    #[arg(long, default_value = "120")]
    frames: usize,

    /// Milliseconds between generated frames
    #[arg(long, default_value = "16")]
    interval_ms: u64,

    /// Seed for pose jitter in the generated walk
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Simulated character load latency
    #[arg(long, default_value = "500")]
    asset_delay_ms: u64,

    /// Make the character asset unavailable
    #[arg(long)]
    fail_asset: bool,

    /// Simulate a device without body tracking
    #[arg(long)]
    no_body_tracking: bool,

    /// Print the session summary as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SessionConfig::from_path(path)?,
        None => SessionConfig::load()?,
    };

    let frames = match &cli.script {
        Some(path) => Script::from_path(path)?.into_frames(),
        None => walking_feed(WalkOptions {
            frames: cli.frames,
            interval: Duration::from_millis(cli.interval_ms),
            seed: cli.seed,
            ..WalkOptions::default()
        }),
    };

    let options = SimOptions {
        asset_delay: Duration::from_millis(cli.asset_delay_ms),
        fail_asset: cli.fail_asset,
        body_tracking: !cli.no_body_tracking,
        ..SimOptions::default()
    };

    let summary = anchor_sync_sim::run(config, options, frames).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let p = summary.character_position;
        let r = summary.reality_position;
        println!("=== Session Summary ===");
        println!("Batches:          {}", summary.batches);
        println!("Asset:            {:?}", summary.asset);
        println!("Character link:   {:?}", summary.character_link);
        println!("Prop link:        {:?}", summary.prop_link);
        println!("Character at:     ({:.3}, {:.3}, {:.3})", p.x, p.y, p.z);
        println!("Reality at:       ({:.3}, {:.3}, {:.3})", r.x, r.y, r.z);
        println!(
            "Anchors:          {} added, {} body updates, {} plane updates, {} ignored, {} dropped",
            summary.stats.added,
            summary.stats.body_updates,
            summary.stats.plane_updates,
            summary.stats.ignored,
            summary.stats.dropped
        );
    }

    Ok(())
}
