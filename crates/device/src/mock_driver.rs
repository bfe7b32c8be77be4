//! Mock device driver
//!
//! Walks through the same initialization stages as a real depth camera and
//! supports injecting a failure at any of them.

use contracts::{
    ContractError, DeviceConfig, DeviceDriver, MockConfig, OpenedDevice, RegistrationMode,
    StreamKind, VideoMode,
};
use tracing::{debug, instrument, warn};

use crate::mock_stream::{MockStream, MockStreamConfig};

/// URI scheme handled by the mock driver
pub const MOCK_URI_SCHEME: &str = "mock://";

/// Initialization stage at which the mock device fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    OpenDevice,
    StartDepth,
    StartColor,
    EnableSync,
    SetRegistration,
}

/// Mock device driver
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    mock: MockConfig,
    fail_at: Option<MockFailure>,
}

impl MockDriver {
    pub fn new(mock: MockConfig) -> Self {
        Self {
            mock,
            fail_at: None,
        }
    }

    /// Fail initialization at the given stage
    pub fn failing_at(mut self, stage: MockFailure) -> Self {
        self.fail_at = Some(stage);
        self
    }

    fn check(&self, stage: MockFailure, message: &str) -> Result<(), ContractError> {
        if self.fail_at == Some(stage) {
            warn!(?stage, "mock device initialization failure injected");
            return Err(ContractError::initialization(stage_name(stage), message));
        }
        Ok(())
    }

    fn stream_config(&self, kind: StreamKind, mode: VideoMode, clock_fps: u32) -> MockStreamConfig {
        let mut config = MockStreamConfig::new(kind, mode);
        // Both streams count on a clock running at the faster stream's rate.
        config.clock_fps = clock_fps;
        config.skip_every = match kind {
            StreamKind::Depth => self.mock.depth_skip_every,
            StreamKind::Color => self.mock.color_skip_every,
        };
        config.fetch_failure_every = self.mock.fetch_failure_every;
        config
    }
}

fn stage_name(stage: MockFailure) -> &'static str {
    match stage {
        MockFailure::OpenDevice => "open device",
        MockFailure::StartDepth => "start depth stream",
        MockFailure::StartColor => "start color stream",
        MockFailure::EnableSync => "enable depth/color sync",
        MockFailure::SetRegistration => "set image registration",
    }
}

impl DeviceDriver for MockDriver {
    #[instrument(name = "mock_device_open", skip(self, config), fields(uri = %config.uri))]
    fn open(&self, config: &DeviceConfig) -> Result<OpenedDevice, ContractError> {
        if !config.uri.starts_with(MOCK_URI_SCHEME) {
            return Err(ContractError::initialization(
                "open device",
                format!("unsupported device uri '{}'", config.uri),
            ));
        }
        self.check(MockFailure::OpenDevice, "device open failed")?;

        let clock_fps = config.depth.fps.max(config.color.fps);

        self.check(MockFailure::StartDepth, "couldn't start depth stream")?;
        let depth = MockStream::start(self.stream_config(StreamKind::Depth, config.depth, clock_fps));
        debug!(mode = ?config.depth, "depth stream started");

        // Streams started so far are stopped by Drop on every early return.
        self.check(MockFailure::StartColor, "couldn't start color stream")?;
        let color = MockStream::start(self.stream_config(StreamKind::Color, config.color, clock_fps));
        debug!(mode = ?config.color, "color stream started");

        if config.depth_color_sync {
            self.check(MockFailure::EnableSync, "could not synchronise device")?;
            debug!("depth/color frame sync enabled");
        }

        if config.registration == RegistrationMode::DepthToColor {
            self.check(MockFailure::SetRegistration, "could not set image registration mode")?;
            debug!("depth-to-color registration enabled");
        }

        Ok(OpenedDevice {
            depth: Box::new(depth),
            color: Box::new(color),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn small_device() -> DeviceConfig {
        DeviceConfig {
            depth: VideoMode::new(8, 4, 100),
            color: VideoMode::new(8, 4, 50),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_mock_device() {
        let device = MockDriver::default().open(&small_device()).unwrap();
        assert_eq!(device.depth.kind(), StreamKind::Depth);
        assert_eq!(device.color.video_mode(), VideoMode::new(8, 4, 50));

        let frame = device.color.wait_for_frame(Duration::from_millis(500)).unwrap();
        assert_eq!(frame.index % 2, 0, "color runs at half rate on the shared clock");

        device.depth.stop();
        device.color.stop();
    }

    #[test]
    fn test_uneven_rates_share_indices() {
        let config = DeviceConfig {
            depth: VideoMode::new(8, 4, 30),
            color: VideoMode::new(8, 4, 25),
            ..Default::default()
        };
        let device = MockDriver::default().open(&config).unwrap();
        std::thread::sleep(Duration::from_millis(400));

        let depth = device.depth.read_latest_frame().unwrap().index;
        let color = device.color.read_latest_frame().unwrap().index;
        // Both streams started together, so they sit within a few clock ticks.
        assert!(depth.abs_diff(color) <= 3, "depth {depth}, color {color}");

        device.depth.stop();
        device.color.stop();
    }

    #[test]
    fn test_rejects_unknown_uri() {
        let config = DeviceConfig {
            uri: "openni://any".to_string(),
            ..small_device()
        };
        let err = MockDriver::default().open(&config).unwrap_err();
        assert!(err.is_initialization());
    }

    #[test]
    fn test_injected_failures() {
        for stage in [
            MockFailure::OpenDevice,
            MockFailure::StartDepth,
            MockFailure::StartColor,
            MockFailure::EnableSync,
            MockFailure::SetRegistration,
        ] {
            let err = MockDriver::default()
                .failing_at(stage)
                .open(&small_device())
                .unwrap_err();
            assert!(err.to_string().contains(stage_name(stage)), "{err}");
        }
    }

    #[test]
    fn test_sync_stage_skipped_when_disabled() {
        let config = DeviceConfig {
            depth_color_sync: false,
            ..small_device()
        };
        let device = MockDriver::default()
            .failing_at(MockFailure::EnableSync)
            .open(&config);
        assert!(device.is_ok());
    }
}
