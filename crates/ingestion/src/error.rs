//! Ingestion error types

use contracts::StreamKind;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Listener already attached
    #[error("{stream} listener is already attached")]
    AlreadyListening {
        /// Stream kind
        stream: StreamKind,
    },
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
