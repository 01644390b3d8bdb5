//! Checked-out player resource.

use bridge_traits::playback::{ReadinessCallback, VideoSurface};
use core_library::models::VideoId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use crate::error::{PlaybackError, Result};

/// A cloneable reference to one surface owned by the resource cache.
///
/// When the cache reclaims the surface every clone becomes detached and its
/// calls turn into no-ops, so a controller holding a stale handle can never
/// drive a surface that now belongs to another item.
#[derive(Clone)]
pub struct PlayerHandle {
    id: VideoId,
    surface: Arc<Mutex<Option<Box<dyn VideoSurface>>>>,
}

impl PlayerHandle {
    pub(crate) fn new(id: VideoId, surface: Box<dyn VideoSurface>) -> Self {
        Self {
            id,
            surface: Arc::new(Mutex::new(Some(surface))),
        }
    }

    pub fn id(&self) -> VideoId {
        self.id
    }

    pub fn is_attached(&self) -> bool {
        self.surface.lock().is_some()
    }

    pub fn open(&self, url: &str, notify: ReadinessCallback) -> Result<()> {
        let mut guard = self.surface.lock();
        let surface = guard
            .as_mut()
            .ok_or_else(|| PlaybackError::PlaybackFailed("Player resource was reclaimed".to_string()))?;
        surface
            .open(url, notify)
            .map_err(|e| PlaybackError::PlaybackFailed(e.to_string()))
    }

    pub fn play(&self) {
        self.with_surface(|s| s.play());
    }

    pub fn pause(&self) {
        self.with_surface(|s| s.pause());
    }

    pub fn set_muted(&self, muted: bool) {
        self.with_surface(|s| s.set_muted(muted));
    }

    /// Detach the surface from every clone and hand it back to the caller.
    pub(crate) fn detach(&self) -> Option<Box<dyn VideoSurface>> {
        self.surface.lock().take()
    }

    fn with_surface(&self, f: impl FnOnce(&mut dyn VideoSurface)) {
        if let Some(surface) = self.surface.lock().as_mut() {
            f(surface.as_mut());
        }
    }
}

impl fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .finish()
    }
}
