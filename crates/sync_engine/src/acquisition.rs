//! Acquisition lifecycle.
//!
//! Opens the device, sizes the buffers from the first depth frame, computes
//! the bounding box and wires the stream listeners to the engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    BoundingBox, ContractError, DeviceDriver, EngineConfig, EngineState, StreamKind,
};
use ingestion::{BackpressureConfig, FrameHook, IngestionPipeline, MetricsSnapshot};
use tracing::{debug, info, instrument};

use crate::convert::{compute_frame_bbox, DepthToWorld, FovConverter};
use crate::engine::{SyncEngine, SyncStats};
use crate::exchange::{FrameExchange, FrameReader};

/// A running depth/color acquisition
pub struct Acquisition {
    pipeline: IngestionPipeline,
    engine: Arc<SyncEngine>,
    bbox: BoundingBox,
    stopped: AtomicBool,
}

impl std::fmt::Debug for Acquisition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acquisition")
            .field("bbox", &self.bbox)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

impl Acquisition {
    /// Open the device and prepare the engine
    ///
    /// Blocks until the first depth frame arrives or the configured init
    /// timeout elapses. Streams are running afterwards, but frames are only
    /// consumed once [`start`](Self::start) is called.
    #[instrument(name = "acquisition_open", skip(config, driver), fields(uri = %config.device.uri))]
    pub fn open(config: &EngineConfig, driver: &dyn DeviceDriver) -> Result<Self, ContractError> {
        let device = driver.open(&config.device)?;

        let timeout = Duration::from_millis(config.device.init_timeout_ms);
        let first = device.depth.wait_for_frame(timeout).map_err(|e| {
            device.depth.stop();
            device.color.stop();
            ContractError::initialization("first depth frame", e.to_string())
        })?;
        if let Err(e) = first.validate_payload() {
            device.depth.stop();
            device.color.stop();
            return Err(ContractError::initialization("first depth frame", e.to_string()));
        }

        let converter: Arc<dyn DepthToWorld> = Arc::new(FovConverter::new(
            first.width,
            first.height,
            &config.converter,
        ));
        let bbox = compute_frame_bbox(&first, converter.as_ref());
        let color_mode = device.color.video_mode();

        info!(
            depth = %format!("{}x{}", first.width, first.height),
            color = %format!("{}x{}", color_mode.width, color_mode.height),
            bbox_min = ?bbox.min,
            bbox_max = ?bbox.max,
            "device opened"
        );

        let exchange = Arc::new(FrameExchange::new(
            (first.width, first.height),
            (color_mode.width, color_mode.height),
            bbox,
        ));
        let engine = Arc::new(SyncEngine::new(
            exchange,
            converter,
            config.sync.queue_capacity,
        ));
        let pipeline =
            IngestionPipeline::new(device, BackpressureConfig::from(config.ingestion.clone()));

        Ok(Self {
            pipeline,
            engine,
            bbox,
            stopped: AtomicBool::new(false),
        })
    }

    /// Attach the listeners and begin publishing
    ///
    /// No-op when already running.
    #[instrument(name = "acquisition_start", skip(self))]
    pub fn start(&self) -> Result<(), ContractError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(ContractError::invalid_state("acquisition already stopped"));
        }
        if self.pipeline.is_listening() {
            debug!("acquisition already started");
            return Ok(());
        }
        self.engine.start()?;

        let engine = Arc::downgrade(&self.engine);
        let inputs = self.pipeline.inputs();
        let hook: FrameHook = Arc::new(move || {
            if let Some(engine) = engine.upgrade() {
                engine.pump(&inputs);
            }
        });

        self.pipeline
            .start_all(Some(hook))
            .map_err(|e| ContractError::invalid_state(e.to_string()))?;
        info!("acquisition started");
        Ok(())
    }

    /// Detach listeners, stop the streams and the engine
    ///
    /// No publish is in flight once this returns. Idempotent.
    #[instrument(name = "acquisition_stop", skip(self))]
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.pipeline.stop_all();
        self.pipeline.stop_streams();
        self.engine.stop();
        debug!(stats = ?self.engine.stats(), "acquisition stopped");
    }

    /// Reader handle for the published buffers
    pub fn reader(&self) -> FrameReader {
        self.engine.reader()
    }

    /// Bounding box of the first depth frame
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    /// Synchronizer counters
    pub fn stats(&self) -> SyncStats {
        self.engine.stats()
    }

    /// Listener counters of one stream
    pub fn ingestion_metrics(&self, kind: StreamKind) -> MetricsSnapshot {
        self.pipeline.metrics(kind)
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        self.stop();
    }
}
