//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{EngineConfig, MockConfig, VideoMode};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    device: DeviceInfo,
    pipeline: PipelineInfo,
    converter: ConverterInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    mock: Option<MockConfig>,
}

#[derive(Serialize)]
struct DeviceInfo {
    uri: String,
    depth: VideoMode,
    color: VideoMode,
    depth_color_sync: bool,
    registration: String,
    init_timeout_ms: u64,
}

#[derive(Serialize)]
struct PipelineInfo {
    channel_capacity: usize,
    drop_policy: String,
    queue_capacity: usize,
    reader_fps: f64,
}

#[derive(Serialize)]
struct ConverterInfo {
    horizontal_fov_deg: f32,
    vertical_fov_deg: f32,
    depth_unit_m: f32,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &EngineConfig, args: &InfoArgs) -> ConfigInfo {
    ConfigInfo {
        device: DeviceInfo {
            uri: config.device.uri.clone(),
            depth: config.device.depth,
            color: config.device.color,
            depth_color_sync: config.device.depth_color_sync,
            registration: format!("{:?}", config.device.registration),
            init_timeout_ms: config.device.init_timeout_ms,
        },
        pipeline: PipelineInfo {
            channel_capacity: config.ingestion.channel_capacity,
            drop_policy: format!("{:?}", config.ingestion.drop_policy),
            queue_capacity: config.sync.queue_capacity,
            reader_fps: config.reader.fps,
        },
        converter: ConverterInfo {
            horizontal_fov_deg: config.converter.horizontal_fov_deg,
            vertical_fov_deg: config.converter.vertical_fov_deg,
            depth_unit_m: config.converter.depth_unit_m,
        },
        mock: args.mock.then(|| config.mock.clone()),
    }
}

fn print_config_info(config: &EngineConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Depth Sync Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let device = &config.device;
    println!("📷 Device");
    println!("   ├─ URI: {}", device.uri);
    println!(
        "   ├─ Depth: {}x{} @ {} fps",
        device.depth.width, device.depth.height, device.depth.fps
    );
    println!(
        "   ├─ Color: {}x{} @ {} fps",
        device.color.width, device.color.height, device.color.fps
    );
    println!("   ├─ Depth/color sync: {}", device.depth_color_sync);
    println!("   ├─ Registration: {:?}", device.registration);
    println!("   └─ Init timeout: {} ms", device.init_timeout_ms);

    println!("\n⚙️  Pipeline");
    println!("   ├─ Channel capacity: {}", config.ingestion.channel_capacity);
    println!("   ├─ Drop policy: {:?}", config.ingestion.drop_policy);
    println!("   ├─ Queue capacity: {}", config.sync.queue_capacity);
    println!("   └─ Reader rate: {} Hz", config.reader.fps);

    let converter = &config.converter;
    println!("\n📐 Converter");
    println!(
        "   ├─ FOV: {}° x {}°",
        converter.horizontal_fov_deg, converter.vertical_fov_deg
    );
    println!("   └─ Depth unit: {} m", converter.depth_unit_m);

    if args.mock {
        let mock = &config.mock;
        println!("\n🧪 Simulated Device");
        println!("   ├─ Depth skip every: {}", mock.depth_skip_every);
        println!("   ├─ Color skip every: {}", mock.color_skip_every);
        println!("   └─ Fetch failure every: {}", mock.fetch_failure_every);
    }

    println!();
}
