//! Mock stream implementation
//!
//! Implements `FrameStream`, generating synthetic frames at the configured
//! rate on a background thread. Notifications are dispatched on that thread,
//! consistent with real device callback behavior.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{ContractError, Frame, FrameReadyCallback, FrameStream, StreamKind, VideoMode};
use tracing::{debug, trace};

use crate::scene;

/// Mock stream configuration
#[derive(Debug, Clone)]
pub struct MockStreamConfig {
    /// Stream kind
    pub kind: StreamKind,
    /// Resolution and rate
    pub mode: VideoMode,
    /// Rate of the index clock shared with the other stream; indices of a
    /// slower stream advance by `clock_fps / fps` per frame, rounded
    pub clock_fps: u32,
    /// Added to every index (models unsynchronized numbering)
    pub index_offset: u64,
    /// Skip every n-th index, 0 = never
    pub skip_every: u64,
    /// Fail every n-th fetch, 0 = never
    pub fetch_failure_every: u64,
}

impl MockStreamConfig {
    pub fn new(kind: StreamKind, mode: VideoMode) -> Self {
        Self {
            kind,
            mode,
            clock_fps: mode.fps,
            index_offset: 0,
            skip_every: 0,
            fetch_failure_every: 0,
        }
    }
}

struct StreamShared {
    config: MockStreamConfig,
    running: AtomicBool,
    latest: Mutex<Option<Frame>>,
    listener: Mutex<Option<FrameReadyCallback>>,
    fetches: AtomicU64,
}

/// Mock stream
///
/// Starts producing as soon as it is created, like a started device stream.
pub struct MockStream {
    shared: Arc<StreamShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MockStream {
    /// Create and start a mock stream
    pub fn start(config: MockStreamConfig) -> Self {
        let shared = Arc::new(StreamShared {
            config,
            running: AtomicBool::new(true),
            latest: Mutex::new(None),
            listener: Mutex::new(None),
            fetches: AtomicU64::new(0),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("mock-{}", shared.config.kind))
            .spawn(move || generate(worker_shared))
            .ok();

        if handle.is_none() {
            shared.running.store(false, Ordering::SeqCst);
        }

        Self {
            shared,
            worker: Mutex::new(handle),
        }
    }

    /// Whether the generator thread is still producing
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }
}

/// Index of the `tick`-th frame of a `fps` stream on a `clock_fps` clock
///
/// The clock never runs slower than the stream itself.
fn clock_index(tick: u64, fps: u32, clock_fps: u32) -> u64 {
    let fps = u64::from(fps.max(1));
    let clock = u64::from(clock_fps).max(fps);
    (tick * clock + fps / 2) / fps
}

fn generate(shared: Arc<StreamShared>) {
    let config = &shared.config;
    let interval = Duration::from_secs_f64(1.0 / f64::from(config.mode.fps.max(1)));
    let start_time = Instant::now();
    let mut tick: u64 = 0;

    debug!(
        stream = %config.kind,
        width = config.mode.width,
        height = config.mode.height,
        fps = config.mode.fps,
        "mock stream started"
    );

    while shared.running.load(Ordering::Relaxed) {
        tick += 1;
        let index = clock_index(tick, config.mode.fps, config.clock_fps) + config.index_offset;

        if config.skip_every > 0 && index % config.skip_every == 0 {
            trace!(stream = %config.kind, index, "mock frame skipped");
            thread::sleep(interval);
            continue;
        }

        let payload = match config.kind {
            StreamKind::Depth => scene::depth_payload(&config.mode, index),
            StreamKind::Color => scene::color_payload(&config.mode, index),
        };
        let frame = Frame {
            stream: config.kind,
            index,
            width: config.mode.width,
            height: config.mode.height,
            timestamp_us: start_time.elapsed().as_micros() as u64,
            payload,
        };

        *shared.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);

        {
            let listener = shared.listener.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(callback) = listener.as_ref() {
                callback();
            }
        }

        trace!(stream = %config.kind, index, "mock frame ready");
        thread::sleep(interval);
    }

    debug!(stream = %config.kind, "mock stream stopped");
}

impl FrameStream for MockStream {
    fn kind(&self) -> StreamKind {
        self.shared.config.kind
    }

    fn video_mode(&self) -> VideoMode {
        self.shared.config.mode
    }

    fn read_latest_frame(&self) -> Result<Frame, ContractError> {
        let kind = self.shared.config.kind;
        let fetch = self.shared.fetches.fetch_add(1, Ordering::Relaxed) + 1;
        let every = self.shared.config.fetch_failure_every;
        if every > 0 && fetch % every == 0 {
            return Err(ContractError::frame_fetch(kind, "simulated read failure"));
        }

        self.shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ContractError::frame_fetch(kind, "no frame available"))
    }

    fn set_listener(&self, callback: FrameReadyCallback) {
        *self
            .shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn clear_listener(&self) {
        // Blocks until an in-flight notification has returned.
        self.shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn stop(&self) {
        if self.shared.running.swap(false, Ordering::SeqCst) {
            debug!(stream = %self.shared.config.kind, "stopping mock stream");
        }
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.stop();
    }
}
