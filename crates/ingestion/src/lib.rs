//! # Ingestion Pipeline
//!
//! Frame ingestion module.
//!
//! Responsibilities:
//! - Attach a listener to the depth and color streams of an opened device
//! - Pull the latest frame on every frame-ready notification
//! - Backpressure management and drop policy
//! - Send to downstream via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{BackpressureConfig, IngestionPipeline};
//!
//! let pipeline = IngestionPipeline::new(device, BackpressureConfig::default());
//! let inputs = pipeline.inputs();
//! pipeline.start_all(None)?;
//!
//! while let Ok(frame) = inputs.depth.recv_blocking() {
//!     // Process frame
//! }
//! ```

mod config;
mod error;
mod listener;
mod pipeline;

// Re-exports
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use error::{IngestionError, Result};
pub use listener::{FrameHook, FrameListener, send_frame};
pub use pipeline::{FrameInputs, IngestionPipeline};
