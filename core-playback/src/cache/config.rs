//! Cache configuration

use core_runtime::config::{DEFAULT_POOL_SIZE, DEFAULT_WINDOW_RADIUS};

/// Configuration for the player resource cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Items kept resident on each side of the center (default: 1)
    pub window_radius: usize,

    /// Closed surfaces parked for reuse (default: 1)
    pub pool_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            window_radius: DEFAULT_WINDOW_RADIUS,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_radius(mut self, radius: usize) -> Self {
        self.window_radius = radius;
        self
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Upper bound on resident handles.
    pub fn max_residents(&self) -> usize {
        2 * self.window_radius + 1
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_radius > 8 {
            return Err(format!(
                "window_radius {} exceeds the maximum of 8",
                self.window_radius
            ));
        }

        if self.pool_size > 16 {
            return Err(format!("pool_size {} exceeds the maximum of 16", self.pool_size));
        }

        Ok(())
    }
}
