//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Frame model
//! - Each stream (depth, color) numbers its frames with a monotonically
//!   increasing `index`; depth and color frames captured at the same instant
//!   share the same index.
//! - Depth payloads are little-endian `u16` samples, color payloads are
//!   packed RGB triplets.

mod engine_config;
mod error;
mod frame;
mod geometry;
mod state;
mod stream;

pub use engine_config::*;
pub use error::*;
pub use frame::*;
pub use geometry::*;
pub use state::*;
pub use stream::*;
