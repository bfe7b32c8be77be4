//! Main sync engine implementation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use async_channel::Receiver;
use contracts::{ContractError, EngineState, Frame, StreamKind};
use ingestion::FrameInputs;
use observability::metrics as sync_metrics;
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::aligner::{FrameAligner, MatchedPair};
use crate::convert::{check_frame, convert_color_frame, convert_depth_frame, DepthToWorld};
use crate::exchange::{FrameExchange, FrameReader};
use crate::queue::PushOutcome;

/// Synchronizer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Pairs converted and flipped to the front
    pub pairs_published: u64,
    /// Depth frames discarded without being published
    pub depth_dropped: u64,
    /// Color frames discarded without being published
    pub color_dropped: u64,
    /// Frames rejected for arriving out of order
    pub out_of_order: u64,
    /// Matched pairs that did not fit the buffers
    pub rejected_pairs: u64,
    /// Index of the most recently published pair
    pub last_published_index: Option<u64>,
}

/// Everything owned by the single writer
#[derive(Debug)]
struct WriterState {
    aligner: FrameAligner,
    pairs_published: u64,
    rejected_pairs: u64,
    last_published_index: Option<u64>,
}

/// Depth/color synchronization engine
///
/// Frames arrive from any thread; alignment, conversion and publishing are
/// serialized by the writer lock. Readers only contend on the exchange lock,
/// which the writer takes just for the flip.
pub struct SyncEngine {
    writer: Mutex<WriterState>,
    exchange: Arc<FrameExchange>,
    converter: Arc<dyn DepthToWorld>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("state", &self.exchange.engine_state())
            .field("stats", &self.stats())
            .finish()
    }
}

impl SyncEngine {
    /// Create an engine publishing into `exchange`
    pub fn new(
        exchange: Arc<FrameExchange>,
        converter: Arc<dyn DepthToWorld>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            writer: Mutex::new(WriterState {
                aligner: FrameAligner::new(queue_capacity),
                pairs_published: 0,
                rejected_pairs: 0,
                last_published_index: None,
            }),
            exchange,
            converter,
        }
    }

    fn lock_writer(&self) -> MutexGuard<'_, WriterState> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begin accepting frames
    pub fn start(&self) -> Result<(), ContractError> {
        let _writer = self.lock_writer();
        let mut allowed = true;
        let state = self.exchange.transition(|s| {
            s.started().unwrap_or_else(|| {
                allowed = false;
                s
            })
        });
        if !allowed {
            return Err(ContractError::invalid_state(format!(
                "cannot start from {state:?}"
            )));
        }
        debug!(?state, "sync engine started");
        Ok(())
    }

    /// Stop accepting frames
    ///
    /// Waits for an in-flight publish to finish. Idempotent.
    pub fn stop(&self) {
        let _writer = self.lock_writer();
        let state = self.exchange.transition(EngineState::stopped);
        debug!(?state, "sync engine stopped");
    }

    pub fn state(&self) -> EngineState {
        self.exchange.engine_state()
    }

    /// Reader handle for the published buffers
    pub fn reader(&self) -> FrameReader {
        FrameReader::new(self.exchange.clone())
    }

    /// Drain both channels, then publish every pair that can be matched
    ///
    /// Returns the number of pairs published.
    #[instrument(level = "trace", name = "sync_engine_pump", skip(self, inputs))]
    pub fn pump(&self, inputs: &FrameInputs) -> usize {
        let mut writer = self.lock_writer();
        if !self.exchange.engine_state().is_streaming() {
            drain(&inputs.depth);
            drain(&inputs.color);
            return 0;
        }

        while let Ok(frame) = inputs.depth.try_recv() {
            writer.aligner.push(frame);
        }
        while let Ok(frame) = inputs.color.try_recv() {
            writer.aligner.push(frame);
        }
        self.publish_ready(&mut writer)
    }

    /// Feed a single frame
    ///
    /// Returns the number of pairs published as a result.
    #[instrument(
        level = "trace",
        name = "sync_engine_push",
        skip(self, frame),
        fields(stream = %frame.stream, index = frame.index)
    )]
    pub fn push(&self, frame: Frame) -> usize {
        let mut writer = self.lock_writer();
        if !self.exchange.engine_state().is_streaming() {
            trace!("engine not streaming, frame ignored");
            return 0;
        }
        if writer.aligner.push(frame) == PushOutcome::OutOfOrder {
            return 0;
        }
        self.publish_ready(&mut writer)
    }

    fn publish_ready(&self, writer: &mut WriterState) -> usize {
        let mut published = 0;
        while let Some(pair) = writer.aligner.next_pair() {
            let index = pair.index();
            match self.publish(pair) {
                Ok(()) => {
                    writer.pairs_published += 1;
                    writer.last_published_index = Some(index);
                    published += 1;
                }
                Err(e) => {
                    writer.rejected_pairs += 1;
                    sync_metrics::record_pair_rejected();
                    warn!(index, error = %e, "matched pair rejected");
                }
            }
        }
        for kind in [StreamKind::Depth, StreamKind::Color] {
            sync_metrics::record_queue_depth(kind.as_str(), writer.aligner.queue(kind).len());
        }
        published
    }

    fn publish(&self, pair: MatchedPair) -> Result<(), ContractError> {
        let index = pair.index();
        let started = Instant::now();
        let converter = self.converter.as_ref();

        self.exchange.publish_with(index, |grid, image| {
            // Check both frames before writing either buffer.
            check_frame(&pair.depth, grid.width(), grid.height())?;
            let (width, height) = image.dimensions();
            check_frame(&pair.color, width, height)?;

            convert_depth_frame(&pair.depth, converter, grid)?;
            convert_color_frame(&pair.color, image)
        })?;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        sync_metrics::record_pair_published(index, elapsed_ms);
        trace!(index, elapsed_ms, "pair published");
        Ok(())
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> SyncStats {
        let writer = self.lock_writer();
        SyncStats {
            pairs_published: writer.pairs_published,
            depth_dropped: writer.aligner.dropped(StreamKind::Depth),
            color_dropped: writer.aligner.dropped(StreamKind::Color),
            out_of_order: writer.aligner.out_of_order(),
            rejected_pairs: writer.rejected_pairs,
            last_published_index: writer.last_published_index,
        }
    }
}

fn drain(rx: &Receiver<Frame>) {
    while rx.try_recv().is_ok() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::FovConverter;
    use contracts::{is_valid_point, BoundingBox, ConverterConfig};
    use std::thread;

    const W: u32 = 4;
    const H: u32 = 3;

    fn engine() -> SyncEngine {
        let exchange = Arc::new(FrameExchange::new((W, H), (W, H), BoundingBox::empty()));
        let converter = Arc::new(FovConverter::new(W, H, &ConverterConfig::default()));
        let engine = SyncEngine::new(exchange, converter, 32);
        engine.start().unwrap();
        engine
    }

    fn depth(index: u64) -> Frame {
        let samples: Vec<u16> = (0..W * H).map(|i| 1000 + i as u16 + index as u16).collect();
        Frame::depth(index, W, H, &samples)
    }

    fn color(index: u64) -> Frame {
        Frame::color(index, W, H, vec![(index % 256) as u8; (W * H * 3) as usize])
    }

    #[test]
    fn test_publishes_matching_pairs() {
        let engine = engine();
        for i in [1, 2, 3, 5] {
            engine.push(depth(i));
        }
        for i in [2, 3, 4, 5] {
            engine.push(color(i));
        }

        let stats = engine.stats();
        assert_eq!(stats.pairs_published, 3);
        assert_eq!(stats.last_published_index, Some(5));
        assert_eq!(stats.depth_dropped, 1);
        assert_eq!(stats.color_dropped, 1);

        let reader = engine.reader();
        let guard = reader.lock();
        assert!(guard.is_ready());
        assert_eq!(guard.published_index(), Some(5));
        assert_eq!(guard.color().get_pixel(0, 0).0, [5, 5, 5]);
        assert!(is_valid_point(guard.geometry().get(1, 1).unwrap()));
    }

    #[test]
    fn test_frames_ignored_before_start_and_after_stop() {
        let exchange = Arc::new(FrameExchange::new((W, H), (W, H), BoundingBox::empty()));
        let converter = Arc::new(FovConverter::new(W, H, &ConverterConfig::default()));
        let engine = SyncEngine::new(exchange, converter, 32);

        engine.push(depth(1));
        engine.push(color(1));
        assert_eq!(engine.stats().pairs_published, 0);

        engine.start().unwrap();
        engine.push(depth(2));
        engine.push(color(2));
        assert_eq!(engine.stats().pairs_published, 1);

        engine.stop();
        engine.stop();
        engine.push(depth(3));
        engine.push(color(3));
        assert_eq!(engine.stats().pairs_published, 1);
        assert!(engine.reader().is_ready(), "last pair stays readable");
        assert!(engine.start().is_err());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let engine = engine();
        engine.push(Frame::depth(1, 2, 2, &[1000; 4]));
        engine.push(color(1));

        let stats = engine.stats();
        assert_eq!(stats.pairs_published, 0);
        assert_eq!(stats.rejected_pairs, 1);

        let reader = engine.reader();
        let guard = reader.lock();
        assert!(!guard.is_ready());
        assert_eq!(guard.geometry().dimensions(), (W, H));
        drop(guard);

        // The engine keeps going with the next pair.
        engine.push(depth(2));
        engine.push(color(2));
        assert_eq!(engine.stats().pairs_published, 1);
    }

    #[test]
    fn test_pump_drains_channels() {
        let engine = engine();
        let (depth_tx, depth_rx) = async_channel::bounded(8);
        let (color_tx, color_rx) = async_channel::bounded(8);
        let inputs = FrameInputs {
            depth: depth_rx,
            color: color_rx,
        };

        depth_tx.try_send(depth(1)).unwrap();
        assert_eq!(engine.pump(&inputs), 0);
        color_tx.try_send(color(1)).unwrap();
        depth_tx.try_send(depth(2)).unwrap();
        color_tx.try_send(color(2)).unwrap();
        assert_eq!(engine.pump(&inputs), 2);
        assert!(inputs.depth.is_empty() && inputs.color.is_empty());
    }

    #[test]
    fn test_concurrent_producers_and_readers() {
        let engine = Arc::new(engine());
        let frames = 200u64;

        let producers: Vec<_> = [StreamKind::Depth, StreamKind::Color]
            .into_iter()
            .map(|kind| {
                let engine = engine.clone();
                thread::spawn(move || {
                    for i in 1..=frames {
                        let frame = match kind {
                            StreamKind::Depth => depth(i),
                            StreamKind::Color => color(i),
                        };
                        engine.push(frame);
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let reader = engine.reader();
                thread::spawn(move || {
                    let mut last = None;
                    for _ in 0..500 {
                        let guard = reader.lock();
                        if !guard.is_ready() {
                            continue;
                        }
                        assert_eq!(guard.geometry().dimensions(), (W, H));
                        let index = guard.published_index().unwrap();
                        // Color and geometry come from the same pair.
                        assert_eq!(guard.color().get_pixel(0, 0).0[0], (index % 256) as u8);
                        let expected_z = f32::from(1000 + index as u16) * 0.001;
                        assert!((guard.geometry().get(0, 0).unwrap().z - expected_z).abs() < 1e-6);
                        assert!(last.map_or(true, |l| l <= index));
                        last = Some(index);
                    }
                })
            })
            .collect();

        for handle in producers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        let stats = engine.stats();
        assert!(stats.pairs_published > 0);
        assert_eq!(
            stats.pairs_published + stats.depth_dropped,
            frames,
            "every depth frame is either published or dropped: {stats:?}"
        );
    }
}
