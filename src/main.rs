// SPDX-License-Identifier: GPL-3.0-only

use camera_preview::FilterType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-preview")]
#[command(about = "Camera preview render pipeline demo")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline headlessly against the simulated stack
    Preview {
        /// Number of simulated camera frames to stream
        #[arg(short, long, default_value = "30")]
        frames: u64,

        /// Effect filter to install (see 'camera-preview filters')
        #[arg(long)]
        filter: Option<FilterType>,

        /// Path to a JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List available filters
    Filters,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=camera_preview=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Preview {
            frames,
            filter,
            config,
        }) => cli::run_preview(frames, filter, config),
        Some(Commands::Filters) | None => cli::list_filters(),
    }
}
