// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "stereo-camera")]
#[command(about = "Capture snapshots and recordings from a stereo depth camera")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// JSON configuration file (see `stereo-camera config`)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take snapshots while streaming without recording
    Snapshot {
        /// Number of snapshots to take
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,

        /// Delay between snapshots in milliseconds
        #[arg(short, long, default_value = "0")]
        interval: u64,

        /// Output directory (default: ~/Pictures/stereo-camera)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record to the configured video directory
    Record {
        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,
    },

    /// Print the configuration in effect, or write it to a file
    Config {
        /// Write to this file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=stereo_camera=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Snapshot {
            count,
            interval,
            output,
        } => cli::take_snapshots(&config, count, interval, output),
        Commands::Record { duration } => cli::record(&config, duration),
        Commands::Config { output } => cli::write_config(&config, output),
    }
}
