//! Layered error definitions
//!
//! Categorized by source: config / device / frame / engine

use thiserror::Error;

use crate::StreamKind;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Device Errors =====
    /// Device or stream could not be opened, started or validated
    #[error("initialization failed during {stage}: {message}")]
    Initialization { stage: String, message: String },

    /// A stream notified readiness but the frame could not be read
    #[error("failed to fetch {stream} frame: {message}")]
    FrameFetch { stream: StreamKind, message: String },

    // ===== Frame Errors =====
    /// Payload length does not match the frame geometry
    #[error("{stream} frame #{index}: payload is {actual} bytes, expected {expected}")]
    PayloadSize {
        stream: StreamKind,
        index: u64,
        expected: usize,
        actual: usize,
    },

    /// Frame dimensions do not match the allocated buffer
    #[error(
        "{stream} frame #{index}: {width}x{height} does not match buffer {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        stream: StreamKind,
        index: u64,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    // ===== Engine Errors =====
    /// Operation not allowed in the current engine state
    #[error("invalid engine state: {message}")]
    InvalidState { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create initialization error
    pub fn initialization(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Initialization {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create frame fetch error
    pub fn frame_fetch(stream: StreamKind, message: impl Into<String>) -> Self {
        Self::FrameFetch {
            stream,
            message: message.into(),
        }
    }

    /// Create invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Whether this error is an initialization failure (fatal at startup)
    pub fn is_initialization(&self) -> bool {
        matches!(self, Self::Initialization { .. })
    }
}
