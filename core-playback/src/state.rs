//! Player state machine vocabulary.

use bridge_traits::playback::Readiness;
use core_library::models::VideoId;
use core_runtime::events::PlaybackStatus;
use std::fmt;
use url::Url;

/// Stable identifier of a playback slot within one coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// Monotonic counter bumped on every `prepare()` and `release()`.
///
/// Readiness signals carry the generation current when the open was issued;
/// a mismatch means the signal is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }

    pub(crate) fn bump(&mut self) -> Generation {
        self.0 = self.0.wrapping_add(1);
        *self
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a controller is asked to prepare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackTarget {
    pub id: VideoId,
    pub index: usize,
    pub url: Option<Url>,
}

impl PlaybackTarget {
    pub fn new(id: VideoId, index: usize, url: Option<Url>) -> Self {
        Self { id, index, url }
    }

    /// Same item and same URL. The index is positional and ignored.
    pub fn same_source(&self, other: &PlaybackTarget) -> bool {
        self.id == other.id && self.url == other.url
    }
}

/// Play/pause requested while the surface was still opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackIntent {
    Play,
    Pause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The cache could not hand out a surface.
    AcquisitionFailed,
    /// The surface reported an error.
    PlaybackFailed,
    /// The item has nothing to play.
    MissingSource,
}

impl FailureKind {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::MissingSource)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerState {
    /// No resource held.
    Idle,
    /// Surface acquired and opening, muted.
    Preparing,
    Ready,
    Playing,
    Paused,
    Failed {
        kind: FailureKind,
        reason: String,
        /// Target URL to reopen on retry.
        url: Option<Url>,
    },
}

impl PlayerState {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerState::Idle => "idle",
            PlayerState::Preparing => "preparing",
            PlayerState::Ready => "ready",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Failed { .. } => "failed",
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlayerState::Playing)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PlayerState::Failed { .. })
    }

    /// States in which a resource is held for the current target.
    pub fn holds_target(&self) -> bool {
        matches!(
            self,
            PlayerState::Preparing | PlayerState::Ready | PlayerState::Playing | PlayerState::Paused
        )
    }

    pub fn status(&self) -> PlaybackStatus {
        match self {
            PlayerState::Idle => PlaybackStatus::Idle,
            PlayerState::Preparing => PlaybackStatus::Preparing,
            PlayerState::Ready => PlaybackStatus::Ready,
            PlayerState::Playing => PlaybackStatus::Playing,
            PlayerState::Paused => PlaybackStatus::Paused,
            PlayerState::Failed { kind, reason, .. } => PlaybackStatus::Failed {
                reason: reason.clone(),
                retryable: kind.is_retryable(),
            },
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerState::Failed { reason, .. } => write!(f, "failed ({})", reason),
            other => f.write_str(other.name()),
        }
    }
}

/// Completion signal sent from a surface's readiness callback back to the
/// control path.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSignal {
    pub slot: SlotId,
    pub generation: Generation,
    pub readiness: Readiness,
}
