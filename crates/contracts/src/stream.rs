//! FrameStream / DeviceDriver traits - sensor abstraction
//!
//! Decouples listeners and the engine from concrete devices. Mock and real
//! devices implement the same interface.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::{ContractError, DeviceConfig, Frame, StreamKind, VideoMode};

/// Frame-ready notification
///
/// Carries no payload; the handler must pull the frame itself with
/// [`FrameStream::read_latest_frame`]. Invoked on the stream's own thread.
pub type FrameReadyCallback = Arc<dyn Fn() + Send + Sync>;

/// A started sensor stream
pub trait FrameStream: Send + Sync {
    /// Which stream this is
    fn kind(&self) -> StreamKind;

    /// Configured resolution and rate
    fn video_mode(&self) -> VideoMode;

    /// Fetch the most recent frame
    ///
    /// Fails transiently if no frame is available or the read hiccups.
    fn read_latest_frame(&self) -> Result<Frame, ContractError>;

    /// Register the frame-ready notification, replacing any previous one
    fn set_listener(&self, callback: FrameReadyCallback);

    /// Remove the notification; no callback is running or starts after this returns
    ///
    /// Must not be called from within the notification itself.
    fn clear_listener(&self);

    /// Stop producing frames (idempotent)
    fn stop(&self);

    /// Block until a frame can be read or `timeout` elapses
    fn wait_for_frame(&self, timeout: Duration) -> Result<Frame, ContractError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.read_latest_frame() {
                Ok(frame) => return Ok(frame),
                Err(e) if Instant::now() >= deadline => return Err(e),
                Err(_) => thread::sleep(Duration::from_millis(1)),
            }
        }
    }
}

/// Streams handed out by a successfully opened device
pub struct OpenedDevice {
    pub depth: Box<dyn FrameStream>,
    pub color: Box<dyn FrameStream>,
}

impl std::fmt::Debug for OpenedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedDevice")
            .field("depth", &self.depth.video_mode())
            .field("color", &self.color.video_mode())
            .finish()
    }
}

/// Opens a device and starts both streams
///
/// Any failure is reported as [`ContractError::Initialization`]; a driver
/// never returns a half-initialized device.
pub trait DeviceDriver {
    fn open(&self, config: &DeviceConfig) -> Result<OpenedDevice, ContractError>;
}
