//! Ingestion Pipeline main entry

use std::sync::Arc;

use async_channel::Receiver;
use contracts::{Frame, FrameStream, OpenedDevice, StreamKind};
use tracing::{info, instrument};

use crate::config::{BackpressureConfig, MetricsSnapshot};
use crate::error::Result;
use crate::listener::{FrameHook, FrameListener};

/// Receiving ends of both stream channels
#[derive(Debug, Clone)]
pub struct FrameInputs {
    pub depth: Receiver<Frame>,
    pub color: Receiver<Frame>,
}

/// Ingestion Pipeline
///
/// Owns one listener per stream of an opened device.
pub struct IngestionPipeline {
    depth: FrameListener,
    color: FrameListener,
    streams: [Arc<dyn FrameStream>; 2],
}

impl IngestionPipeline {
    /// Create listeners for both streams of `device`
    pub fn new(device: OpenedDevice, config: BackpressureConfig) -> Self {
        let depth: Arc<dyn FrameStream> = Arc::from(device.depth);
        let color: Arc<dyn FrameStream> = Arc::from(device.color);
        Self {
            depth: FrameListener::new(depth.clone(), config.clone()),
            color: FrameListener::new(color.clone(), config),
            streams: [depth, color],
        }
    }

    /// Attach both listeners
    #[instrument(name = "ingestion_start_all", skip(self, hook))]
    pub fn start_all(&self, hook: Option<FrameHook>) -> Result<()> {
        info!("starting frame listeners");
        self.depth.start(hook.clone())?;
        if let Err(e) = self.color.start(hook) {
            self.depth.stop();
            return Err(e);
        }
        Ok(())
    }

    /// Detach both listeners
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        if self.is_listening() {
            info!("stopping frame listeners");
        }
        self.depth.stop();
        self.color.stop();
    }

    /// Stop frame production on both streams
    pub fn stop_streams(&self) {
        for stream in &self.streams {
            stream.stop();
        }
    }

    pub fn is_listening(&self) -> bool {
        self.depth.is_listening() || self.color.is_listening()
    }

    /// Channel receivers
    pub fn inputs(&self) -> FrameInputs {
        FrameInputs {
            depth: self.depth.receiver(),
            color: self.color.receiver(),
        }
    }

    /// Stream handle
    pub fn stream(&self, kind: StreamKind) -> &Arc<dyn FrameStream> {
        match kind {
            StreamKind::Depth => &self.streams[0],
            StreamKind::Color => &self.streams[1],
        }
    }

    /// Metrics snapshot of one stream's listener
    pub fn metrics(&self, kind: StreamKind) -> MetricsSnapshot {
        match kind {
            StreamKind::Depth => self.depth.metrics().snapshot(),
            StreamKind::Color => self.color.metrics().snapshot(),
        }
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
