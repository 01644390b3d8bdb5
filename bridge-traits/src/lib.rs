//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the feed core and platform-specific
//! implementations. Each trait represents a capability the core requires but
//! that is implemented differently per platform (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Networking & Storage
//! - [`HttpClient`](http::HttpClient) - Async HTTP used to pull the video catalog
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences (liked videos)
//!
//! ### Playback
//! - [`VideoBackend`](playback::VideoBackend) - Allocates platform player surfaces
//! - [`VideoSurface`](playback::VideoSurface) - One decoder bound to a feed row
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | HTTP + settings |
//! | iOS      | host app            | Planned |
//! | Android  | host app            | Planned |
//!
//! `VideoBackend` has no desktop implementation in this workspace; hosts
//! inject their own and tests use a recording fake.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it with actionable messages.
//!
//! ## Thread Safety
//!
//! Capability traits require `Send + Sync`. Surfaces are only `Send`: each one
//! is owned by a single playback slot at a time.

pub mod error;
pub mod http;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use playback::{Readiness, ReadinessCallback, VideoBackend, VideoSurface};
pub use storage::SettingsStore;
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
