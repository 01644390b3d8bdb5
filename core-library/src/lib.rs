//! # Feed Library Module
//!
//! Data side of the feed: what the items are and where they come from.
//!
//! ## Overview
//!
//! This module manages:
//! - Domain models ([`VideoItem`], [`FeedSequence`]) and the catalog wire format
//! - Caption derivation from page URLs
//! - Catalog sources with remote/bundled fallback
//! - Like persistence and profile aggregation

pub mod caption;
pub mod error;
pub mod likes;
pub mod models;
pub mod profile;
pub mod source;
pub mod wire;

pub use caption::caption_for;
pub use error::{LibraryError, Result};
pub use likes::{InMemoryLikeStore, LikeStore, SettingsLikeStore};
pub use models::{Author, FeedSequence, VideoId, VideoItem};
pub use profile::ProfileSummary;
pub use source::{BundledVideoSource, Catalog, FallbackVideoSource, RemoteVideoSource, VideoSource};
