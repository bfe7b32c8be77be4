//! Frame listener
//!
//! Attaches to a `FrameStream` notification, pulls the latest frame and
//! forwards it to a bounded channel. Runs on the stream's own thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use contracts::{DropPolicy, Frame, FrameReadyCallback, FrameStream, StreamKind};
use tracing::{debug, trace, warn};

use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};

/// Called after each frame has been queued
pub type FrameHook = Arc<dyn Fn() + Send + Sync>;

/// Listener for one stream
pub struct FrameListener {
    kind: StreamKind,
    stream: Arc<dyn FrameStream>,
    config: BackpressureConfig,
    tx: Sender<Frame>,
    rx: Receiver<Frame>,
    metrics: Arc<IngestionMetrics>,
    listening: Arc<AtomicBool>,
}

impl FrameListener {
    /// Create a listener with its own bounded channel
    pub fn new(stream: Arc<dyn FrameStream>, config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));
        Self {
            kind: stream.kind(),
            stream,
            config,
            tx,
            rx,
            metrics: Arc::new(IngestionMetrics::new()),
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Receiving end of the channel
    pub fn receiver(&self) -> Receiver<Frame> {
        self.rx.clone()
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    /// Attach to the stream notification
    ///
    /// `hook` runs on the stream thread after every queued frame.
    pub fn start(&self, hook: Option<FrameHook>) -> Result<()> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(IngestionError::AlreadyListening { stream: self.kind });
        }

        debug!(stream = %self.kind, "attaching frame listener");

        let kind = self.kind;
        let stream = Arc::downgrade(&self.stream);
        let tx = self.tx.clone();
        let rx = self.rx.clone();
        let metrics = self.metrics.clone();
        let listening = self.listening.clone();
        let drop_policy = self.config.drop_policy;
        let last_index: Mutex<Option<u64>> = Mutex::new(None);

        let callback: FrameReadyCallback = Arc::new(move || {
            if !listening.load(Ordering::Relaxed) {
                return;
            }
            let Some(stream) = stream.upgrade() else {
                return;
            };

            let frame = match stream.read_latest_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    metrics.record_fetch_failure();
                    metrics::counter!("depth_sync_fetch_failures_total", "stream" => kind.as_str())
                        .increment(1);
                    trace!(stream = %kind, error = %e, "frame fetch failed");
                    return;
                }
            };

            {
                let mut last = last_index.lock().unwrap_or_else(PoisonError::into_inner);
                if *last == Some(frame.index) {
                    trace!(stream = %kind, index = frame.index, "duplicate notification");
                    return;
                }
                *last = Some(frame.index);
            }

            metrics.record_received();
            metrics::counter!("depth_sync_frames_received_total", "stream" => kind.as_str())
                .increment(1);
            trace!(stream = %kind, index = frame.index, "frame received");

            send_frame(&tx, &rx, frame, &metrics, drop_policy);

            if let Some(hook) = &hook {
                hook();
            }
        });

        self.stream.set_listener(callback);
        Ok(())
    }

    /// Detach from the stream notification
    ///
    /// Once this returns no callback of this listener is running.
    pub fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(stream = %self.kind, "detaching frame listener");
            self.stream.clear_listener();
        }
    }
}

impl Drop for FrameListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Send frame, handling backpressure policy
///
/// Returns whether `frame` ended up in the channel.
#[inline]
pub fn send_frame(
    tx: &Sender<Frame>,
    rx: &Receiver<Frame>,
    frame: Frame,
    metrics: &IngestionMetrics,
    drop_policy: DropPolicy,
) -> bool {
    let kind = frame.stream;
    match tx.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(frame)) => {
            metrics.record_dropped();
            metrics::counter!("depth_sync_frames_dropped_total", "stream" => kind.as_str())
                .increment(1);
            match drop_policy {
                DropPolicy::DropNewest => {
                    trace!(stream = %kind, index = frame.index, "frame dropped (newest)");
                    false
                }
                DropPolicy::DropOldest => {
                    match rx.try_recv() {
                        Ok(oldest) => {
                            trace!(stream = %kind, index = oldest.index, "frame dropped (oldest)")
                        }
                        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => {}
                    }
                    match tx.try_send(frame) {
                        Ok(()) => true,
                        Err(e) => {
                            // A concurrent sender refilled the slot.
                            trace!(stream = %kind, index = e.into_inner().index, "frame dropped (newest)");
                            false
                        }
                    }
                }
            }
        }
        Err(TrySendError::Closed(_)) => {
            warn!(stream = %kind, "channel closed");
            false
        }
    }
}
