//! Engine readiness state machine.

use serde::{Deserialize, Serialize};

/// Whether a synchronized pair has been published yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Buffers hold their initial contents
    AwaitingFirstPair,
    /// At least one pair has been published
    Ready,
}

/// Engine lifecycle state
///
/// `Uninitialized -> Streaming(AwaitingFirstPair) -> Streaming(Ready) -> Stopped(_)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Constructed, not accepting frames yet
    #[default]
    Uninitialized,
    /// Accepting frames
    Streaming(Readiness),
    /// Detached from the streams; the last published pair stays readable
    Stopped(Readiness),
}

impl EngineState {
    /// Readers must skip rendering while this is false
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            EngineState::Streaming(Readiness::Ready) | EngineState::Stopped(Readiness::Ready)
        )
    }

    /// Whether new frames are accepted
    pub fn is_streaming(&self) -> bool {
        matches!(self, EngineState::Streaming(_))
    }

    /// Transition on `start()`; `None` if the transition is not allowed
    pub fn started(self) -> Option<Self> {
        match self {
            EngineState::Uninitialized => Some(EngineState::Streaming(Readiness::AwaitingFirstPair)),
            EngineState::Streaming(_) => Some(self),
            EngineState::Stopped(_) => None,
        }
    }

    /// Transition after a pair is published (idempotent)
    pub fn published(self) -> Self {
        match self {
            EngineState::Streaming(_) => EngineState::Streaming(Readiness::Ready),
            other => other,
        }
    }

    /// Transition on `stop()` (idempotent)
    pub fn stopped(self) -> Self {
        match self {
            EngineState::Uninitialized => EngineState::Stopped(Readiness::AwaitingFirstPair),
            EngineState::Streaming(r) | EngineState::Stopped(r) => EngineState::Stopped(r),
        }
    }
}
