//! # Playback Configuration
//!
//! Window and preroll settings for the feed coordinator.

use core_runtime::config::{FeedConfig, DEFAULT_POOL_SIZE, DEFAULT_WINDOW_RADIUS};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::cache::CacheConfig;

/// Playback engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Items kept alive on each side of the active index.
    ///
    /// Default: 1 (previous, current and next).
    #[serde(default = "default_window_radius")]
    pub window_radius: usize,

    /// Closed surfaces parked for reuse.
    ///
    /// Default: 1.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Prepare the in-window neighbours whenever the center changes.
    ///
    /// Default: true.
    #[serde(default = "default_preroll_neighbors")]
    pub preroll_neighbors: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            window_radius: default_window_radius(),
            pool_size: default_pool_size(),
            preroll_neighbors: default_preroll_neighbors(),
        }
    }
}

impl PlaybackConfig {
    pub fn with_window_radius(mut self, radius: usize) -> Self {
        self.window_radius = radius;
        self
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_preroll(mut self, enabled: bool) -> Self {
        self.preroll_neighbors = enabled;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        self.cache().validate()
    }

    pub fn cache(&self) -> CacheConfig {
        CacheConfig::new()
            .with_window_radius(self.window_radius)
            .with_pool_size(self.pool_size)
    }

    pub fn max_residents(&self) -> usize {
        2 * self.window_radius + 1
    }

    /// Indices of the window around `center`, clipped to a feed of `len` items.
    pub fn window(&self, center: usize, len: usize) -> RangeInclusive<usize> {
        let low = center.saturating_sub(self.window_radius);
        let high = center
            .saturating_add(self.window_radius)
            .min(len.saturating_sub(1));
        low..=high
    }

    pub fn in_window(&self, center: usize, index: usize) -> bool {
        center.abs_diff(index) <= self.window_radius
    }
}

impl From<&FeedConfig> for PlaybackConfig {
    fn from(config: &FeedConfig) -> Self {
        Self {
            window_radius: config.window_radius,
            pool_size: config.pool_size,
            preroll_neighbors: config.preroll_neighbors,
        }
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_window_radius() -> usize {
    DEFAULT_WINDOW_RADIUS
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

fn default_preroll_neighbors() -> bool {
    true
}
