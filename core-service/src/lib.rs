//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges (HTTP, settings, video
//! surfaces) into one feed session. Desktop apps typically enable the
//! `desktop-shims` feature, which lets [`FeedConfig`] fall back to the
//! reqwest and SQLite adapters from `bridge-desktop`.

pub mod error;
pub mod service;

pub use error::{CoreError, Result};
pub use service::{FeedService, SessionId};

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore};

use std::sync::Arc;

use bridge_traits::playback::VideoBackend;
use bridge_traits::time::{Clock, SystemClock};
use core_library::likes::{InMemoryLikeStore, LikeStore, SettingsLikeStore};
use core_library::source::{
    BundledVideoSource, FallbackVideoSource, RemoteVideoSource, VideoSource,
};
use core_runtime::config::FeedConfig;
use tracing::{debug, warn};

/// Aggregated handle to everything a feed session consumes.
pub struct FeedDependencies {
    pub source: Arc<dyn VideoSource>,
    pub likes: Arc<dyn LikeStore>,
    pub backend: Arc<dyn VideoBackend>,
    /// Stamps session start and catalog loads.
    pub clock: Arc<dyn Clock>,
}

impl FeedDependencies {
    /// Construct a dependency bundle from explicit handles.
    pub fn new(
        source: Arc<dyn VideoSource>,
        likes: Arc<dyn LikeStore>,
        backend: Arc<dyn VideoBackend>,
    ) -> Self {
        Self {
            source,
            likes,
            backend,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Derive the source chain and like store from `config`.
    ///
    /// The remote catalog is primary and the bundled one its fallback when
    /// both are configured. Likes persist through the settings store when
    /// one is available and live in memory otherwise.
    pub fn from_config(config: &FeedConfig, backend: Arc<dyn VideoBackend>) -> Result<Self> {
        let remote: Option<Arc<dyn VideoSource>> =
            match (&config.remote_endpoint, &config.http_client) {
                (Some(endpoint), Some(http)) => {
                    let mut source = RemoteVideoSource::new(Arc::clone(http), endpoint.clone())
                        .with_timeout(config.request_timeout);
                    if let Some(key) = &config.api_key {
                        source = source.with_api_key(key.clone());
                    }
                    Some(Arc::new(source) as Arc<dyn VideoSource>)
                }
                (Some(_), None) => {
                    return Err(CoreError::CapabilityMissing {
                        capability: "http_client".to_string(),
                        message: "A remote endpoint needs an HTTP client".to_string(),
                    })
                }
                (None, _) => None,
            };

        let bundled: Option<Arc<dyn VideoSource>> = config
            .bundled_catalog
            .as_ref()
            .map(|path| Arc::new(BundledVideoSource::new(path.clone())) as Arc<dyn VideoSource>);

        let source: Arc<dyn VideoSource> = match (remote, bundled) {
            (Some(remote), Some(bundled)) => Arc::new(FallbackVideoSource::new(remote, bundled)),
            (Some(remote), None) => remote,
            (None, Some(bundled)) => bundled,
            (None, None) => {
                return Err(CoreError::InitializationFailed(
                    "No video source configured".to_string(),
                ))
            }
        };

        let likes: Arc<dyn LikeStore> = match &config.settings_store {
            Some(store) => Arc::new(SettingsLikeStore::new(Arc::clone(store))),
            None => {
                warn!("No settings store configured, likes will not persist");
                Arc::new(InMemoryLikeStore::new())
            }
        };

        debug!(
            remote = config.remote_endpoint.is_some(),
            bundled = config.bundled_catalog.is_some(),
            "Feed dependencies resolved"
        );
        Ok(Self::new(source, likes, backend))
    }
}

/// Resolve dependencies from `config` and start a session.
///
/// ```no_run
/// # async fn example(backend: std::sync::Arc<dyn bridge_traits::playback::VideoBackend>) -> core_service::Result<()> {
/// use core_runtime::config::FeedConfig;
///
/// let config = FeedConfig::builder().bundled_catalog("videos.json").build()?;
/// let service = core_service::bootstrap(&config, backend)?;
/// service.load().await?;
/// service.center_changed(0).await?;
/// # Ok(())
/// # }
/// ```
pub fn bootstrap(config: &FeedConfig, backend: Arc<dyn VideoBackend>) -> Result<FeedService> {
    let deps = FeedDependencies::from_config(config, backend)?;
    FeedService::start(config, deps)
}
