//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Depth Sync - depth/color frame synchronizer for Kinect-class cameras
#[derive(Parser, Debug)]
#[command(
    name = "depth-sync",
    author,
    version,
    about = "Depth/color frame synchronization engine",
    long_about = "Aligns the depth and color streams of a Kinect-class camera by frame index,\n\
                  converts depth samples to world-space points and publishes each pair\n\
                  through a double buffer to a polling reader."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DEPTH_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DEPTH_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the device and run the synchronizer
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "DEPTH_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the device URI from configuration
    #[arg(long, env = "DEPTH_SYNC_DEVICE_URI")]
    pub uri: Option<String>,

    /// Override the reader poll rate (Hz)
    #[arg(long)]
    pub reader_fps: Option<f64>,

    /// Stop after this many published pairs (0 = unlimited)
    #[arg(long, default_value = "0", env = "DEPTH_SYNC_MAX_PAIRS")]
    pub max_pairs: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "DEPTH_SYNC_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without opening the device
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "DEPTH_SYNC_METRICS_PORT")]
    pub metrics_port: u16,

    /// Print the session report as JSON instead of the summary
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "depth-sync.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "depth-sync.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show simulated device settings
    #[arg(long)]
    pub mock: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
