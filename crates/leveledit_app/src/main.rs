// SPDX-License-Identifier: MIT OR Apache-2.0
//! `leveledit` - replays a recorded input script against a scene.
//!
//! The binary loads a RON scene, runs one editor frame per scripted input
//! frame and writes the edited scene back out.

mod replay;

use clap::Parser;
use leveledit_core::config::{EditorConfig, CONFIG_FILE_NAME};
use replay::{AppError, ReplayScript};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "leveledit")]
#[command(about = "Replay an input script against a leveledit scene")]
struct Cli {
    /// Scene file to edit
    scene: PathBuf,

    /// Input script (RON)
    script: PathBuf,

    /// Editor config file
    #[arg(short, long, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Where to write the edited scene; defaults to the input scene
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("leveledit=debug,leveledit_core=debug,leveledit_app=debug"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    tracing::info!("Starting leveledit v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(Cli::parse()) {
        tracing::error!("leveledit error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config = EditorConfig::load_or_default(&cli.config)?;
    let script = ReplayScript::load(&cli.script)?;
    let out = cli.out.unwrap_or_else(|| cli.scene.clone());

    let summary = replay::run_replay(config, &cli.scene, &script, &out)?;
    tracing::info!(
        "Replayed {} frames: {} history entries, {} errors",
        summary.frames,
        summary.history_entries,
        summary.errors
    );
    Ok(())
}
