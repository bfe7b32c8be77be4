//! # Device
//!
//! Depth camera drivers.
//!
//! Responsibilities:
//! - Open a device and start its depth and color streams
//! - Report any initialization failure with the stage that failed
//! - Provide a simulated device with fault injection
//! - Provide manually driven streams for deterministic tests

pub mod manual;
pub mod mock_driver;
pub mod mock_stream;
pub mod scene;

pub use manual::{ManualDriver, ManualStream, ManualStreamHandle, manual_stream};
pub use mock_driver::{MOCK_URI_SCHEME, MockDriver, MockFailure};
pub use mock_stream::{MockStream, MockStreamConfig};
