//! # Player Resource Cache
//!
//! Bounds how many platform surfaces are alive at once.
//!
//! ## Overview
//!
//! Only the items around the active index hold a surface. Everything else is
//! closed and its surface either parked in a small free pool or dropped.
//! Key features:
//! - Window-bounded residency (`2 * window_radius + 1`)
//! - Distance-ordered eviction, farthest from the center first
//! - Surface reuse through a free pool
//! - Displacement queue for residents pushed out on a full cache
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     PlayerResourceCache                │
//! │  - acquire(id, index)                  │
//! │  - release(id)                         │
//! │  - evict_outside_window(center, r)     │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> residents: VideoId -> PlayerHandle
//!          ├──> free pool: Vec<Box<dyn VideoSurface>>
//!          └──> VideoBackend (allocation)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::{CacheConfig, PlayerResourceCache};
//!
//! let mut cache = PlayerResourceCache::new(backend, CacheConfig::default())?;
//! let handle = cache.acquire(item.id, 0)?;
//! let evicted = cache.evict_outside_window(5, 1);
//! ```

pub mod config;
pub mod manager;
pub mod stats;

pub use config::CacheConfig;
pub use manager::{PlayerResourceCache, SharedCache};
pub use stats::CacheStats;
