//! # Sync Engine
//!
//! Depth/color frame synchronization and double-buffered publishing.
//!
//! Responsibilities:
//! - Queue frames per stream and pair them by frame index
//! - Convert depth samples to world-space points
//! - Publish geometry and color together through a double buffer
//! - Hand readers a lock guard over the most recent pair
//!
//! ## Usage Example
//!
//! ```ignore
//! use sync_engine::Acquisition;
//!
//! let acquisition = Acquisition::open(&config, &driver)?;
//! acquisition.start()?;
//!
//! let reader = acquisition.reader();
//! let guard = reader.lock();
//! if guard.is_ready() {
//!     render(guard.geometry(), guard.color());
//! }
//! ```

mod acquisition;
mod aligner;
mod convert;
mod double_buffer;
mod engine;
mod exchange;
mod queue;

// Re-exports
pub use acquisition::Acquisition;
pub use aligner::{FrameAligner, MatchedPair, TrimReport};
pub use convert::{
    check_frame, compute_frame_bbox, convert_color_frame, convert_depth_frame, DepthToWorld,
    FovConverter,
};
pub use double_buffer::DoubleBuffer;
pub use engine::{SyncEngine, SyncStats};
pub use exchange::{FrameExchange, FrameReadGuard, FrameReader};
pub use queue::{PendingQueue, PushOutcome};

// Re-export contracts types
pub use contracts::{BoundingBox, EngineState, Frame, PointGrid, StreamKind, WorldPoint};
