//! # Player Resource Cache Manager
//!
//! Owns every platform surface of one feed session.
//!
//! Residents are keyed by item id and remember the index they were acquired
//! for, so eviction can order them by distance from the center. Closed
//! surfaces go to a free pool of `pool_size` entries before being dropped.

use bridge_traits::playback::{VideoBackend, VideoSurface};
use core_library::models::VideoId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::cache::{config::CacheConfig, stats::CacheStats};
use crate::error::{PlaybackError, Result};
use crate::handle::PlayerHandle;

/// The cache as shared between the coordinator and its controllers.
///
/// Never hold the lock across a call into a controller.
pub type SharedCache = Arc<Mutex<PlayerResourceCache>>;

struct Resident {
    handle: PlayerHandle,
    index: usize,
}

/// Window-bounded pool of player handles.
pub struct PlayerResourceCache {
    config: CacheConfig,
    backend: Arc<dyn VideoBackend>,
    residents: HashMap<VideoId, Resident>,
    free_pool: Vec<Box<dyn VideoSurface>>,
    last_center: Option<usize>,
    displaced: Vec<VideoId>,
    stats: CacheStats,
}

impl PlayerResourceCache {
    /// Create a cache allocating through `backend`.
    pub fn new(backend: Arc<dyn VideoBackend>, config: CacheConfig) -> Result<Self> {
        config.validate().map_err(PlaybackError::Config)?;

        Ok(Self {
            config,
            backend,
            residents: HashMap::new(),
            free_pool: Vec::new(),
            last_center: None,
            displaced: Vec::new(),
            stats: CacheStats::default(),
        })
    }

    /// Wrap into the shared form used by controllers.
    pub fn into_shared(self) -> SharedCache {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the resident handle for `id`, or allocate one.
    ///
    /// On a full cache the resident farthest from the last known center is
    /// displaced first and queued for [`take_displaced`](Self::take_displaced).
    pub fn acquire(&mut self, id: VideoId, index: usize) -> Result<PlayerHandle> {
        if let Some(resident) = self.residents.get_mut(&id) {
            resident.index = index;
            self.stats.hits += 1;
            return Ok(resident.handle.clone());
        }

        while self.residents.len() >= self.config.max_residents() {
            let reference = self.last_center.unwrap_or(index);
            let Some(victim) = self.farthest_from(reference) else {
                break;
            };
            debug!(video_id = %victim, reference, "Displacing resident from full cache");
            self.close_resident(victim);
            self.stats.displacements += 1;
            self.displaced.push(victim);
        }

        let surface = match self.free_pool.pop() {
            Some(surface) => {
                self.stats.reuses += 1;
                surface
            }
            None => match self.backend.allocate() {
                Ok(surface) => {
                    self.stats.allocations += 1;
                    surface
                }
                Err(e) => {
                    self.stats.allocation_failures += 1;
                    error!(video_id = %id, error = %e, "Surface allocation failed");
                    return Err(PlaybackError::AcquisitionFailed(e.to_string()));
                }
            },
        };

        let handle = PlayerHandle::new(id, surface);
        self.residents.insert(
            id,
            Resident {
                handle: handle.clone(),
                index,
            },
        );
        debug!(video_id = %id, index, residents = self.residents.len(), "Resident acquired");
        Ok(handle)
    }

    /// Close the handle for `id` and park its surface. Unknown ids are a no-op.
    pub fn release(&mut self, id: VideoId) -> bool {
        self.close_resident(id)
    }

    /// Release every resident outside `[center - radius, center + radius]`,
    /// farthest first. Returns the released ids in that order.
    pub fn evict_outside_window(&mut self, center: usize, radius: usize) -> Vec<VideoId> {
        self.last_center = Some(center);

        let low = center.saturating_sub(radius);
        let high = center.saturating_add(radius);

        let mut outside: Vec<(usize, usize, VideoId)> = self
            .residents
            .iter()
            .filter(|(_, r)| r.index < low || r.index > high)
            .map(|(id, r)| (r.index.abs_diff(center), r.index, *id))
            .collect();
        // Farthest first; ties broken by index so the order is deterministic.
        outside.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let evicted: Vec<VideoId> = outside.into_iter().map(|(_, _, id)| id).collect();
        for id in &evicted {
            self.close_resident(*id);
            self.stats.evictions += 1;
        }

        if !evicted.is_empty() {
            debug!(center, radius, evicted = evicted.len(), "Evicted residents outside window");
        }
        evicted
    }

    /// Record the current center without evicting.
    pub fn note_center(&mut self, center: usize) {
        self.last_center = Some(center);
    }

    /// Ids displaced by `acquire` since the last call.
    pub fn take_displaced(&mut self) -> Vec<VideoId> {
        std::mem::take(&mut self.displaced)
    }

    /// Release every resident and forget the center.
    pub fn clear(&mut self) {
        let ids: Vec<VideoId> = self.residents.keys().copied().collect();
        for id in ids {
            self.close_resident(id);
        }
        self.displaced.clear();
        self.last_center = None;
    }

    pub fn contains(&self, id: VideoId) -> bool {
        self.residents.contains_key(&id)
    }

    pub fn resident_count(&self) -> usize {
        self.residents.len()
    }

    pub fn pooled_count(&self) -> usize {
        self.free_pool.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn farthest_from(&self, reference: usize) -> Option<VideoId> {
        self.residents
            .iter()
            .max_by(|(_, a), (_, b)| {
                a.index
                    .abs_diff(reference)
                    .cmp(&b.index.abs_diff(reference))
                    .then(b.index.cmp(&a.index))
            })
            .map(|(id, _)| *id)
    }

    fn close_resident(&mut self, id: VideoId) -> bool {
        let Some(resident) = self.residents.remove(&id) else {
            return false;
        };

        self.stats.releases += 1;
        match resident.handle.detach() {
            Some(mut surface) => {
                surface.close();
                if self.free_pool.len() < self.config.pool_size {
                    self.free_pool.push(surface);
                }
            }
            None => warn!(video_id = %id, "Resident handle was already detached"),
        }
        true
    }
}

impl Drop for PlayerResourceCache {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for PlayerResourceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerResourceCache")
            .field("config", &self.config)
            .field("residents", &self.residents.len())
            .field("pooled", &self.free_pool.len())
            .field("last_center", &self.last_center)
            .finish()
    }
}
