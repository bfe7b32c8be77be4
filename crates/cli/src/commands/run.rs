//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::EngineConfig;
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::session::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_acquisition(args: &RunArgs) -> Result<()> {
    let config = load_config(args)?;

    info!(
        uri = %config.device.uri,
        depth = ?config.device.depth,
        color = ?config.device.color,
        registration = ?config.device.registration,
        queue_capacity = config.sync.queue_capacity,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let session = Session::new(SessionConfig {
        engine: config,
        max_pairs: (args.max_pairs > 0).then_some(args.max_pairs),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting acquisition...");
    let stats = session.run().await.context("Acquisition session failed")?;

    info!(
        reason = %stats.reason,
        pairs_published = stats.sync.pairs_published,
        duration_secs = stats.duration.as_secs_f64(),
        pairs_per_second = format!("{:.2}", stats.pairs_per_second()),
        "Session finished"
    );

    if args.json {
        let json = serde_json::to_string_pretty(&stats.report())
            .context("Failed to serialize session report")?;
        println!("{}", json);
    } else {
        stats.print_summary();
    }

    Ok(())
}

/// Load the config file (or defaults) and apply CLI overrides
fn load_config(args: &RunArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            if !path.exists() {
                return Err(CliError::config_not_found(path).into());
            }
            config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("No configuration file given, using defaults");
            EngineConfig::default()
        }
    };

    if let Some(ref uri) = args.uri {
        info!(uri = %uri, "Overriding device URI from CLI");
        config.device.uri = uri.clone();
    }
    if let Some(fps) = args.reader_fps {
        if !config_loader::is_valid_reader_fps(fps) {
            return Err(CliError::invalid_argument(
                "--reader-fps",
                format!(
                    "expected a rate within (0, {}], got {fps}",
                    config_loader::MAX_READER_FPS
                ),
            )
            .into());
        }
        info!(fps, "Overriding reader rate from CLI");
        config.reader.fps = fps;
    }

    // Overrides bypass the loader, so check the result again.
    config_loader::ConfigLoader::validate(&config).context("Invalid configuration")?;

    Ok(config)
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &EngineConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Device:");
    println!("  URI: {}", config.device.uri);
    println!(
        "  Depth: {}x{} @ {} fps",
        config.device.depth.width, config.device.depth.height, config.device.depth.fps
    );
    println!(
        "  Color: {}x{} @ {} fps",
        config.device.color.width, config.device.color.height, config.device.color.fps
    );
    println!("  Depth/color sync: {}", config.device.depth_color_sync);
    println!("  Registration: {:?}", config.device.registration);

    println!("\nSync Settings:");
    println!("  Channel capacity: {}", config.ingestion.channel_capacity);
    println!("  Drop policy: {:?}", config.ingestion.drop_policy);
    println!("  Queue capacity: {}", config.sync.queue_capacity);
    println!("  Reader rate: {} Hz", config.reader.fps);

    println!();
}
