//! Manually driven stream and driver
//!
//! Frames are pushed by the caller and notifications fire synchronously on
//! the calling thread. Lets tests script exact arrival orders.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{
    ContractError, DeviceConfig, DeviceDriver, Frame, FrameReadyCallback, FrameStream,
    OpenedDevice, StreamKind, VideoMode,
};
use tracing::trace;

struct ManualShared {
    kind: StreamKind,
    mode: VideoMode,
    latest: Mutex<Option<Frame>>,
    listener: Mutex<Option<FrameReadyCallback>>,
    failing_fetches: AtomicU32,
    stopped: AtomicBool,
}

/// Stream side handed to the consumer
pub struct ManualStream {
    shared: Arc<ManualShared>,
}

/// Producer side used by the test to emit frames
#[derive(Clone)]
pub struct ManualStreamHandle {
    shared: Arc<ManualShared>,
}

/// Create a connected stream / handle pair
pub fn manual_stream(kind: StreamKind, mode: VideoMode) -> (ManualStream, ManualStreamHandle) {
    let shared = Arc::new(ManualShared {
        kind,
        mode,
        latest: Mutex::new(None),
        listener: Mutex::new(None),
        failing_fetches: AtomicU32::new(0),
        stopped: AtomicBool::new(false),
    });
    (
        ManualStream {
            shared: Arc::clone(&shared),
        },
        ManualStreamHandle { shared },
    )
}

impl ManualStreamHandle {
    /// Store `frame` as the latest and fire the notification
    ///
    /// Ignored once the stream is stopped.
    pub fn emit(&self, frame: Frame) {
        if self.shared.stopped.load(Ordering::SeqCst) {
            return;
        }
        trace!(stream = %self.shared.kind, index = frame.index, "manual frame emitted");
        *self
            .shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(frame);

        let listener = self
            .shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(callback) = listener.as_ref() {
            callback();
        }
    }

    /// Make the next `count` fetches fail
    pub fn fail_next_fetches(&self, count: u32) {
        self.shared.failing_fetches.store(count, Ordering::SeqCst);
    }

    /// Whether a listener is currently attached
    pub fn has_listener(&self) -> bool {
        self.shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }
}

impl FrameStream for ManualStream {
    fn kind(&self) -> StreamKind {
        self.shared.kind
    }

    fn video_mode(&self) -> VideoMode {
        self.shared.mode
    }

    fn read_latest_frame(&self) -> Result<Frame, ContractError> {
        let failing = self
            .shared
            .failing_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(ContractError::frame_fetch(self.shared.kind, "scripted read failure"));
        }
        self.shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ContractError::frame_fetch(self.shared.kind, "no frame available"))
    }

    fn set_listener(&self, callback: FrameReadyCallback) {
        *self
            .shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn clear_listener(&self) {
        self.shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
    }
}

/// Driver handing out a pre-built pair of manual streams
///
/// The streams can be taken once; a second `open` fails.
pub struct ManualDriver {
    streams: Mutex<Option<(ManualStream, ManualStream)>>,
}

impl ManualDriver {
    /// Build a driver plus the depth and color producer handles
    pub fn new(depth: VideoMode, color: VideoMode) -> (Self, ManualStreamHandle, ManualStreamHandle) {
        let (depth_stream, depth_handle) = manual_stream(StreamKind::Depth, depth);
        let (color_stream, color_handle) = manual_stream(StreamKind::Color, color);
        let driver = Self {
            streams: Mutex::new(Some((depth_stream, color_stream))),
        };
        (driver, depth_handle, color_handle)
    }
}

impl DeviceDriver for ManualDriver {
    fn open(&self, _config: &DeviceConfig) -> Result<OpenedDevice, ContractError> {
        let (depth, color) = self
            .streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| ContractError::initialization("open device", "device already opened"))?;
        Ok(OpenedDevice {
            depth: Box::new(depth),
            color: Box::new(color),
        })
    }
}
