//! Integration tests for logging setup.
//!
//! The global subscriber can be installed once per process, so everything that
//! touches it lives in a single test.

use bridge_traits::time::LogLevel;
use core_runtime::logging::{init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_init_logging_once_per_process() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);
    init_logging(config).unwrap();

    tracing::info!(target: "core_service", items = 3, "Feed loaded");

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_invalid_filter_is_rejected_before_install() {
    let config = LoggingConfig::default().with_filter("core_playback=loud");
    assert!(matches!(init_logging(config), Err(Error::Config(_))));
}

#[test]
fn test_default_format_follows_build_profile() {
    let config = LoggingConfig::default();

    #[cfg(debug_assertions)]
    assert_eq!(config.format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(config.format, LogFormat::Json);

    assert!(config.redact_secrets);
    assert_eq!(config.level, LogLevel::Info);
}

#[test]
fn test_catalog_credentials_never_logged() {
    assert_eq!(redact_if_sensitive("api_key", "563492ad6f917"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("x-api-token", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("playable_url", "https://cdn.example.com/1.mp4"), "https://cdn.example.com/1.mp4");
    assert_eq!(strip_path("/var/app/bundle/videos.json"), "videos.json");
}
