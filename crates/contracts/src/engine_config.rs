//! Engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

use crate::VideoMode;

/// Top-level engine configuration
///
/// Every section has defaults, so an empty TOML document is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Device and stream settings
    #[serde(default)]
    pub device: DeviceConfig,

    /// Listener backpressure
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Synchronizer settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Depth-to-world projection
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Reader polling
    #[serde(default)]
    pub reader: ReaderConfig,

    /// Simulated device behavior
    #[serde(default)]
    pub mock: MockConfig,
}

/// Device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device URI (`mock://` selects the simulated device)
    #[serde(default = "default_device_uri")]
    pub uri: String,

    /// Depth stream video mode
    #[serde(default)]
    pub depth: VideoMode,

    /// Color stream video mode
    #[serde(default)]
    pub color: VideoMode,

    /// Ask the device to emit depth and color frames with shared indices
    #[serde(default = "default_true")]
    pub depth_color_sync: bool,

    /// Image registration mode
    #[serde(default)]
    pub registration: RegistrationMode,

    /// How long to wait for the first depth frame at startup (ms)
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,
}

fn default_device_uri() -> String {
    "mock://kinect".to_string()
}

fn default_true() -> bool {
    true
}

fn default_init_timeout_ms() -> u64 {
    2000
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            uri: default_device_uri(),
            depth: VideoMode::default(),
            color: VideoMode::default(),
            depth_color_sync: true,
            registration: RegistrationMode::default(),
            init_timeout_ms: default_init_timeout_ms(),
        }
    }
}

/// Image registration between depth and color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    /// Depth image is transformed to the color camera's vantage point
    #[default]
    DepthToColor,
    /// No registration
    Off,
}

/// Drop policy when a stream channel is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Drop the oldest queued frame
    #[default]
    DropOldest,
    /// Drop the incoming frame
    DropNewest,
}

/// Listener backpressure configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Per-stream channel capacity
    pub channel_capacity: usize,
    /// Drop policy when the channel is full
    pub drop_policy: DropPolicy,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 8,
            drop_policy: DropPolicy::DropOldest,
        }
    }
}

/// Synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum pending frames per stream before the oldest is evicted
    pub queue_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { queue_capacity: 32 }
    }
}

/// Field-of-view projection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Horizontal field of view (degrees)
    pub horizontal_fov_deg: f32,
    /// Vertical field of view (degrees)
    pub vertical_fov_deg: f32,
    /// Meters per raw depth unit
    pub depth_unit_m: f32,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            horizontal_fov_deg: 58.0,
            vertical_fov_deg: 45.0,
            depth_unit_m: 0.001,
        }
    }
}

/// Reader polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Poll rate of the reader loop (Hz)
    pub fps: f64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { fps: 30.0 }
    }
}

/// Simulated device behavior
///
/// `0` disables the corresponding fault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockConfig {
    /// Skip every n-th depth index
    #[serde(default)]
    pub depth_skip_every: u64,
    /// Skip every n-th color index
    #[serde(default)]
    pub color_skip_every: u64,
    /// Fail every n-th fetch on either stream
    #[serde(default)]
    pub fetch_failure_every: u64,
}
