//! Workspace placeholder crate.
//!
//! Exposes feature flags that map onto the individual workspace crates so a
//! host application can depend on `reelfeed-workspace` alone:
//!
//! - `desktop-shims` (default): the full `core-service` façade with the
//!   reqwest/SQLite desktop bridges.
//! - `engine-only`: just the playback engine (`core-playback`), for hosts that
//!   bring their own catalog and persistence.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "engine-only")]
pub use core_playback as playback;
