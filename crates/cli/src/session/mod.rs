//! Acquisition session: open, poll the reader, stop.

mod runner;
mod stats;

pub use runner::{Session, SessionConfig, StopReason};
pub use stats::SessionStats;
