//! Video surface bridge traits.
//!
//! The host platform owns the actual decoders (AVPlayer, ExoPlayer, a
//! GStreamer pipeline). The core only asks for a surface, points it at a URL
//! and toggles play/pause/mute. Readiness is reported back asynchronously
//! through a one-shot callback, which may fire on any thread.
//!
//! All surface calls are synchronous and must return promptly: opening a
//! surface starts buffering in the background and returns immediately.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome reported by a surface once it finished opening its URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readiness {
    /// First frame decoded; the surface can play.
    Ready,
    /// Opening failed (network, unsupported codec, 404).
    Failed(String),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Ready => write!(f, "ready"),
            Readiness::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

/// One-shot readiness observer handed to [`VideoSurface::open`].
///
/// Implementations call it at most once per `open`. Calling it after the
/// surface was closed is allowed; the core discards such late reports.
pub type ReadinessCallback = Box<dyn FnOnce(Readiness) + Send + 'static>;

/// A single platform player instance bound to a render target.
pub trait VideoSurface: Send {
    /// Start loading `url`. Any previously opened URL is dropped first.
    ///
    /// # Errors
    ///
    /// Returns an error only when the load could not even be started; load
    /// failures after this call returns are reported through `notify`.
    fn open(&mut self, url: &str, notify: ReadinessCallback) -> Result<()>;

    /// Begin or resume playback.
    fn play(&mut self);

    /// Pause playback, keeping the buffered media.
    fn pause(&mut self);

    fn set_muted(&mut self, muted: bool);

    /// Stop and drop the loaded media. The surface may be opened again.
    fn close(&mut self);
}

/// Factory for platform video surfaces.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::playback::{VideoBackend, Readiness};
///
/// let mut surface = backend.allocate()?;
/// surface.set_muted(true);
/// surface.open("https://cdn.example.com/clip.mp4", Box::new(|readiness| {
///     println!("clip: {}", readiness);
/// }))?;
/// ```
pub trait VideoBackend: Send + Sync {
    /// Allocate a fresh surface.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::SurfaceUnavailable`](crate::error::BridgeError::SurfaceUnavailable)
    /// when the platform refuses another decoder instance.
    fn allocate(&self) -> Result<Box<dyn VideoSurface>>;
}
