//! Cache statistics

use serde::{Deserialize, Serialize};

/// Counters accumulated over the cache's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Surfaces freshly allocated from the backend
    pub allocations: u64,

    /// Surfaces taken from the free pool instead of allocating
    pub reuses: u64,

    /// `acquire` calls answered by an existing resident
    pub hits: u64,

    /// Residents released by `evict_outside_window`
    pub evictions: u64,

    /// Residents pushed out to make room on a full cache
    pub displacements: u64,

    /// Every resident closed, whatever the cause
    pub releases: u64,

    /// Backend allocation errors
    pub allocation_failures: u64,
}

impl CacheStats {
    /// Total successful `acquire` calls.
    pub fn acquisitions(&self) -> u64 {
        self.allocations + self.reuses + self.hits
    }

    /// Share of new residents served from the free pool, in percent.
    pub fn reuse_rate(&self) -> f64 {
        let fresh = self.allocations + self.reuses;
        if fresh == 0 {
            return 0.0;
        }

        (self.reuses as f64 / fresh as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuse_rate() {
        let stats = CacheStats {
            allocations: 3,
            reuses: 1,
            hits: 4,
            ..Default::default()
        };
        assert_eq!(stats.acquisitions(), 8);
        assert!((stats.reuse_rate() - 25.0).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().reuse_rate(), 0.0);
    }
}
