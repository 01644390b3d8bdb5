//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the feed core:
//! - Logging and tracing setup ([`logging`])
//! - Feed configuration and bridge injection ([`config`])
//! - Event bus shared by the playback engine and the service layer ([`events`])

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
