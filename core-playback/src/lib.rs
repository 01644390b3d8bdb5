//! # Feed Playback Engine
//!
//! Keeps exactly one feed item playing while the user scrolls, and bounds
//! the number of live platform players.
//!
//! ## Overview
//!
//! This module handles:
//! - The per-slot player state machine ([`PlayerController`])
//! - Window-bounded surface reuse ([`PlayerResourceCache`])
//! - The single-active-item policy driven by visibility commands
//!   ([`FeedPlaybackCoordinator`])
//!
//! Platform surfaces are reached only through
//! [`bridge_traits::playback::VideoBackend`].

pub mod cache;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod handle;
pub mod state;

pub use cache::{CacheConfig, CacheStats, PlayerResourceCache, SharedCache};
pub use config::PlaybackConfig;
pub use controller::{PlaybackControl, PlayerController, SlotContext};
pub use coordinator::{ControllerFactory, FeedCommand, FeedPlaybackCoordinator};
pub use error::{PlaybackError, Result};
pub use handle::PlayerHandle;
pub use state::{
    FailureKind, Generation, PlaybackIntent, PlaybackTarget, PlayerSignal, PlayerState, SlotId,
};
