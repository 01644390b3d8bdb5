//! # Feed Configuration
//!
//! Configuration for one feed session: window sizing for the playback
//! engine, catalog sources, and the host bridges the core talks through.
//!
//! ## Overview
//!
//! [`FeedConfig`] is assembled with [`FeedConfigBuilder`] and validated
//! fail-fast in [`build()`](FeedConfigBuilder::build). Plain settings live in
//! [`FeedSettings`], which is serde-friendly so hosts can ship a JSON file:
//!
//! ```json
//! { "window_radius": 1, "pool_size": 1, "request_timeout_ms": 8000,
//!   "bundled_catalog": "Resources/videos.json" }
//! ```
//!
//! ## Bridges
//!
//! - `HttpClient` - required when a remote endpoint is configured
//!   (desktop default: reqwest)
//! - `SettingsStore` - optional; persists likes across launches
//!   (desktop default: SQLite at `settings_db_path`)
//!
//! With the `desktop-shims` feature the defaults are injected automatically.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::FeedConfig;
//! use std::sync::Arc;
//!
//! let config = FeedConfig::builder()
//!     .api_key(std::env::var("PEXELS_API_KEY")?)
//!     .bundled_catalog("/app/Resources/videos.json")
//!     .http_client(Arc::new(my_http_client))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, SettingsStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Portrait nature clips from the Pexels video search API.
pub const DEFAULT_REMOTE_ENDPOINT: &str =
    "https://api.pexels.com/videos/search?query=nature&per_page=10&orientation=portrait";

pub const DEFAULT_WINDOW_RADIUS: usize = 1;
pub const DEFAULT_POOL_SIZE: usize = 1;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

const MAX_WINDOW_RADIUS: usize = 8;
const MAX_POOL_SIZE: usize = 16;
const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================================
// Plain settings
// ============================================================================

/// Serializable subset of [`FeedConfig`].
///
/// The API key is accepted on input but never written back out.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Items kept resident on each side of the active index.
    pub window_radius: usize,
    /// Closed surfaces kept around for reuse.
    pub pool_size: usize,
    /// Event bus buffer per subscriber.
    pub event_buffer: usize,
    /// Remote catalog endpoint; `None` disables the remote source.
    pub remote_endpoint: Option<Url>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    /// JSON catalog shipped with the app, used when the remote source fails.
    pub bundled_catalog: Option<PathBuf>,
    /// Prepare the neighbours of the active item without playing them.
    pub preroll_neighbors: bool,
    /// Where the desktop settings database lives.
    pub settings_db_path: Option<PathBuf>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            window_radius: DEFAULT_WINDOW_RADIUS,
            pool_size: DEFAULT_POOL_SIZE,
            event_buffer: crate::events::DEFAULT_EVENT_BUFFER_SIZE,
            remote_endpoint: Url::parse(DEFAULT_REMOTE_ENDPOINT).ok(),
            api_key: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            bundled_catalog: None,
            preroll_neighbors: true,
            settings_db_path: None,
        }
    }
}

impl fmt::Debug for FeedSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedSettings")
            .field("window_radius", &self.window_radius)
            .field("pool_size", &self.pool_size)
            .field("event_buffer", &self.event_buffer)
            .field("remote_endpoint", &self.remote_endpoint.as_ref().map(Url::as_str))
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("bundled_catalog", &self.bundled_catalog)
            .field("preroll_neighbors", &self.preroll_neighbors)
            .field("settings_db_path", &self.settings_db_path)
            .finish()
    }
}

impl FeedSettings {
    /// Parse settings from a JSON document. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.window_radius > MAX_WINDOW_RADIUS {
            return Err(Error::Config(format!(
                "window_radius {} exceeds maximum of {}",
                self.window_radius, MAX_WINDOW_RADIUS
            )));
        }

        if self.pool_size > MAX_POOL_SIZE {
            return Err(Error::Config(format!(
                "pool_size {} exceeds maximum of {}",
                self.pool_size, MAX_POOL_SIZE
            )));
        }

        if self.event_buffer == 0 {
            return Err(Error::Config(
                "event_buffer must be greater than 0".to_string(),
            ));
        }

        let timeout = Duration::from_millis(self.request_timeout_ms);
        if timeout.is_zero() || timeout > MAX_REQUEST_TIMEOUT {
            return Err(Error::Config(format!(
                "request_timeout_ms must be between 1 and {}",
                MAX_REQUEST_TIMEOUT.as_millis()
            )));
        }

        if let Some(endpoint) = &self.remote_endpoint {
            if !matches!(endpoint.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "remote_endpoint must be http(s), got '{}'",
                    endpoint.scheme()
                )));
            }
        }

        if matches!(&self.api_key, Some(key) if key.trim().is_empty()) {
            return Err(Error::Config("api_key cannot be empty".to_string()));
        }

        if self.remote_endpoint.is_none() && self.bundled_catalog.is_none() {
            return Err(Error::Config(
                "No video source configured. Set remote_endpoint or bundled_catalog.".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Full configuration
// ============================================================================

/// Configuration for a feed session. Use [`FeedConfigBuilder`] to construct.
#[derive(Clone)]
pub struct FeedConfig {
    pub window_radius: usize,
    pub pool_size: usize,
    pub event_buffer: usize,
    pub remote_endpoint: Option<Url>,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub bundled_catalog: Option<PathBuf>,
    pub preroll_neighbors: bool,
    pub settings_db_path: Option<PathBuf>,

    /// Present whenever `remote_endpoint` is set.
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Likes are kept in memory only when absent.
    pub settings_store: Option<Arc<dyn SettingsStore>>,
}

impl fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedConfig")
            .field("settings", &self.settings())
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field(
                "settings_store",
                &self.settings_store.as_ref().map(|_| "SettingsStore { ... }"),
            )
            .finish()
    }
}

impl FeedConfig {
    pub fn builder() -> FeedConfigBuilder {
        FeedConfigBuilder::default()
    }

    /// Maximum number of resident players: the active item plus the window on both sides.
    pub fn max_residents(&self) -> usize {
        2 * self.window_radius + 1
    }

    /// Plain settings view of this configuration.
    pub fn settings(&self) -> FeedSettings {
        FeedSettings {
            window_radius: self.window_radius,
            pool_size: self.pool_size,
            event_buffer: self.event_buffer,
            remote_endpoint: self.remote_endpoint.clone(),
            api_key: self.api_key.clone(),
            request_timeout_ms: self.request_timeout.as_millis() as u64,
            bundled_catalog: self.bundled_catalog.clone(),
            preroll_neighbors: self.preroll_neighbors,
            settings_db_path: self.settings_db_path.clone(),
        }
    }

    /// Validates the configuration and bridge consistency.
    pub fn validate(&self) -> Result<()> {
        self.settings().validate()?;

        if self.remote_endpoint.is_some() && self.http_client.is_none() {
            return Err(http_client_missing_error());
        }

        Ok(())
    }
}

fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "A remote endpoint is configured but no HttpClient was provided. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Mobile: inject the platform HTTP stack (URLSession/OkHttp), \
                 or disable the remote source."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout).map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(path: &Path) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Builder, Handle};

    let init_store = |path: PathBuf| -> Result<SqliteSettingsStore> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::Internal(format!(
                    "Failed to create Tokio runtime for default settings store: {}",
                    e
                ))
            })?;

        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
    };

    let path = path.to_path_buf();
    // block_on panics inside a runtime, so hop to a plain thread there.
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(path))
            .join()
            .map_err(|_| {
                Error::Internal(
                    "Worker thread panicked while creating default SettingsStore".to_string(),
                )
            })??,
        Err(_) => init_store(path)?,
    };

    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_path: &Path) -> Result<Arc<dyn SettingsStore>> {
    Err(Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "settings_db_path is set but no SettingsStore was provided. \
                 Desktop: enable the 'desktop-shims' feature to use SqliteSettingsStore. \
                 Mobile: inject UserDefaults/DataStore-backed settings."
            .to_string(),
    })
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`FeedConfig`].
#[derive(Default)]
pub struct FeedConfigBuilder {
    settings: FeedSettings,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
}

impl FeedConfigBuilder {
    /// Start from previously loaded settings (e.g. [`FeedSettings::from_file`]).
    pub fn settings(mut self, settings: FeedSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Items kept resident on each side of the active one. Default: 1.
    pub fn window_radius(mut self, radius: usize) -> Self {
        self.settings.window_radius = radius;
        self
    }

    /// Closed surfaces retained for reuse. Default: 1.
    pub fn pool_size(mut self, size: usize) -> Self {
        self.settings.pool_size = size;
        self
    }

    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.settings.event_buffer = capacity;
        self
    }

    /// Override the remote catalog endpoint.
    ///
    /// # Errors
    ///
    /// An unparsable URL is reported by [`build()`](Self::build).
    pub fn remote_endpoint(mut self, endpoint: Url) -> Self {
        self.settings.remote_endpoint = Some(endpoint);
        self
    }

    /// Serve the feed from the bundled catalog only.
    pub fn disable_remote(mut self) -> Self {
        self.settings.remote_endpoint = None;
        self
    }

    /// API key sent as the raw `Authorization` header.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.settings.api_key = Some(key.into());
        self
    }

    /// Remote catalog request timeout. Default: 8 seconds.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.settings.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn bundled_catalog<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings.bundled_catalog = Some(path.into());
        self
    }

    pub fn preroll_neighbors(mut self, enabled: bool) -> Self {
        self.settings.preroll_neighbors = enabled;
        self
    }

    /// Location of the desktop settings database, used when no
    /// `SettingsStore` is injected.
    pub fn settings_db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings.settings_db_path = Some(path.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for out-of-range values or when no source is configured
    /// - [`Error::CapabilityMissing`] when a required bridge has no implementation
    pub fn build(self) -> Result<FeedConfig> {
        let settings = self.settings;
        settings.validate()?;

        let request_timeout = Duration::from_millis(settings.request_timeout_ms);

        let http_client = match (self.http_client, &settings.remote_endpoint) {
            (Some(client), _) => Some(client),
            (None, Some(_)) => Some(provide_default_http_client(request_timeout)?),
            (None, None) => None,
        };

        let settings_store = match (self.settings_store, &settings.settings_db_path) {
            (Some(store), _) => Some(store),
            (None, Some(path)) => Some(provide_default_settings_store(path)?),
            (None, None) => None,
        };

        let config = FeedConfig {
            window_radius: settings.window_radius,
            pool_size: settings.pool_size,
            event_buffer: settings.event_buffer,
            remote_endpoint: settings.remote_endpoint,
            api_key: settings.api_key,
            request_timeout,
            bundled_catalog: settings.bundled_catalog,
            preroll_neighbors: settings.preroll_neighbors,
            settings_db_path: settings.settings_db_path,
            http_client,
            settings_store,
        };

        config.validate()?;
        Ok(config)
    }
}
