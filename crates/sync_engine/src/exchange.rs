//! Frame exchange between the synchronizer and readers.
//!
//! Holds the geometry and color double buffers plus the shared state behind
//! one exchange lock. Both buffers flip inside the same critical section, so
//! a reader never sees geometry and color from different pairs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{BoundingBox, ContractError, EngineState, PointGrid};
use image::RgbImage;

use crate::double_buffer::DoubleBuffer;

/// State guarded by the exchange lock
#[derive(Debug)]
pub(crate) struct ExchangeState {
    engine: EngineState,
    published_index: Option<u64>,
    published_count: u64,
}

impl ExchangeState {
    pub(crate) fn new() -> Self {
        Self {
            engine: EngineState::Uninitialized,
            published_index: None,
            published_count: 0,
        }
    }
}

/// Double-buffered geometry and color image
#[derive(Debug)]
pub struct FrameExchange {
    state: Mutex<ExchangeState>,
    geometry: DoubleBuffer<PointGrid>,
    color: DoubleBuffer<RgbImage>,
    bbox: BoundingBox,
}

impl FrameExchange {
    /// Allocate both buffer pairs once
    ///
    /// Geometry starts as invalid points, color as black.
    pub fn new(depth_size: (u32, u32), color_size: (u32, u32), bbox: BoundingBox) -> Self {
        Self {
            state: Mutex::new(ExchangeState::new()),
            geometry: DoubleBuffer::new(PointGrid::new(depth_size.0, depth_size.1)),
            color: DoubleBuffer::new(RgbImage::new(color_size.0, color_size.1)),
            bbox,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ExchangeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fill both back buffers and publish them as pair `index`
    ///
    /// `fill` runs without the exchange lock. If it fails nothing is flipped
    /// and the readers keep the previous pair.
    pub(crate) fn publish_with<F>(&self, index: u64, fill: F) -> Result<(), ContractError>
    where
        F: FnOnce(&mut PointGrid, &mut RgbImage) -> Result<(), ContractError>,
    {
        {
            let mut geometry = self.geometry.lock_back();
            let mut color = self.color.lock_back();
            fill(&mut geometry, &mut color)?;
        }

        let mut state = self.lock_state();
        self.geometry.flip(&state);
        self.color.flip(&state);
        state.engine = state.engine.published();
        state.published_index = Some(index);
        state.published_count += 1;
        Ok(())
    }

    /// Apply a lifecycle transition
    pub(crate) fn transition<F>(&self, f: F) -> EngineState
    where
        F: FnOnce(EngineState) -> EngineState,
    {
        let mut state = self.lock_state();
        state.engine = f(state.engine);
        state.engine
    }

    pub fn engine_state(&self) -> EngineState {
        self.lock_state().engine
    }

    /// Lock the front buffers for reading
    pub fn read(&self) -> FrameReadGuard<'_> {
        let state = self.lock_state();
        let geometry = self.geometry.lock_front(&state);
        let color = self.color.lock_front(&state);
        FrameReadGuard {
            geometry,
            color,
            state,
        }
    }

    /// Number of pairs published so far
    pub fn published_count(&self) -> u64 {
        self.lock_state().published_count
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }
}

/// Read access to the current front buffers
///
/// Holds the exchange lock: the synchronizer cannot flip until the guard is
/// dropped, so keep it short-lived.
pub struct FrameReadGuard<'a> {
    // Declared before `state` so the slot locks are released first.
    geometry: MutexGuard<'a, PointGrid>,
    color: MutexGuard<'a, RgbImage>,
    state: MutexGuard<'a, ExchangeState>,
}

impl FrameReadGuard<'_> {
    /// World-space points of the front pair
    pub fn geometry(&self) -> &PointGrid {
        &self.geometry
    }

    /// Color image of the front pair
    pub fn color(&self) -> &RgbImage {
        &self.color
    }

    /// False until the first pair has been published
    pub fn is_ready(&self) -> bool {
        self.state.engine.is_ready()
    }

    /// Index of the front pair
    pub fn published_index(&self) -> Option<u64> {
        self.state.published_index
    }

    pub fn engine_state(&self) -> EngineState {
        self.state.engine
    }
}

/// Reader-side handle
///
/// Cheap to clone; every clone sees the same buffers.
#[derive(Debug, Clone)]
pub struct FrameReader {
    exchange: Arc<FrameExchange>,
}

impl FrameReader {
    pub fn new(exchange: Arc<FrameExchange>) -> Self {
        Self { exchange }
    }

    /// Lock the most recently published pair
    pub fn lock(&self) -> FrameReadGuard<'_> {
        self.exchange.read()
    }

    /// Whether a pair has been published
    pub fn is_ready(&self) -> bool {
        self.exchange.engine_state().is_ready()
    }

    pub fn published_count(&self) -> u64 {
        self.exchange.published_count()
    }

    /// Bounding box of the first depth frame
    pub fn bounding_box(&self) -> BoundingBox {
        self.exchange.bounding_box()
    }
}
