//! # Playback Error Types
//!
//! Slot-level failures (`AcquisitionFailed`, `PlaybackFailed`) are contained
//! in the controller and surfaced as state events; the rest are returned to
//! whoever issued the command.

use thiserror::Error;

use crate::state::PlayerState;

/// Errors that can occur in the playback engine.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Slot Errors
    // ========================================================================
    /// The backend could not allocate a surface.
    #[error("Failed to acquire player resource: {0}")]
    AcquisitionFailed(String),

    /// The surface reported an error while opening or playing.
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    // ========================================================================
    // Control Errors
    // ========================================================================
    /// Operation is not legal from the controller's current state.
    #[error("Cannot {operation} while {from}")]
    InvalidTransition {
        from: &'static str,
        operation: &'static str,
    },

    /// `retry()` on a failure that never had a playable URL.
    #[error("No playable source to retry")]
    NoRetryTarget,

    /// Command addressed an index outside the current sequence.
    #[error("Index {index} out of range for feed of {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("Invalid playback configuration: {0}")]
    Config(String),
}

impl PlaybackError {
    pub(crate) fn invalid_transition(from: &PlayerState, operation: &'static str) -> Self {
        PlaybackError::InvalidTransition {
            from: from.name(),
            operation,
        }
    }

    /// Returns `true` for failures that belong to a single slot and are
    /// reported through state events rather than to the caller.
    pub fn is_slot_failure(&self) -> bool {
        matches!(
            self,
            PlaybackError::AcquisitionFailed(_) | PlaybackError::PlaybackFailed(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
