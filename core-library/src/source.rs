//! Video catalog sources.
//!
//! - [`RemoteVideoSource`]: HTTP catalog behind an optional API key
//! - [`BundledVideoSource`]: JSON file shipped with the app
//! - [`FallbackVideoSource`]: primary first, fallback on any error
//!
//! None of them retry; the caller decides what an error means for the feed.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{LibraryError, Result};
use crate::models::VideoItem;
use crate::wire::VideoResponse;

/// Items returned by one fetch, tagged with where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub items: Vec<VideoItem>,
    /// The primary source failed and a fallback served these items.
    pub from_fallback: bool,
}

/// A provider of feed items.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Fetch the full list of items in display order.
    async fn fetch(&self) -> Result<Vec<VideoItem>>;

    /// Fetch and report provenance. Sources without a fallback never set
    /// `from_fallback`.
    async fn fetch_catalog(&self) -> Result<Catalog> {
        Ok(Catalog {
            items: self.fetch().await?,
            from_fallback: false,
        })
    }
}

// =============================================================================
// Remote
// =============================================================================

/// Fetches the catalog over HTTP.
pub struct RemoteVideoSource {
    http: Arc<dyn HttpClient>,
    endpoint: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl RemoteVideoSource {
    pub fn new(http: Arc<dyn HttpClient>, endpoint: Url) -> Self {
        Self {
            http,
            endpoint,
            api_key: None,
            timeout: Duration::from_secs(8),
        }
    }

    /// Sent verbatim as the `Authorization` header.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_request(&self) -> HttpRequest {
        let request = HttpRequest::get(self.endpoint.as_str())
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .bypass_cache();

        match &self.api_key {
            Some(key) => request.authorization(key.clone()),
            None => request,
        }
    }
}

#[async_trait]
impl VideoSource for RemoteVideoSource {
    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Vec<VideoItem>> {
        debug!(endpoint = %self.endpoint, "Requesting remote catalog");
        let response = self.http.execute(self.build_request()).await?;

        if !response.is_success() {
            return Err(LibraryError::Http {
                status: response.status,
                url: self.endpoint.to_string(),
            });
        }

        let decoded: VideoResponse = serde_json::from_slice(&response.body)?;
        let items = decoded.into_items();
        info!(items = items.len(), "Remote videos loaded");
        Ok(items)
    }
}

// =============================================================================
// Bundled
// =============================================================================

/// Reads the catalog from a JSON file on disk.
pub struct BundledVideoSource {
    path: PathBuf,
}

impl BundledVideoSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl VideoSource for BundledVideoSource {
    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Vec<VideoItem>> {
        debug!(path = ?self.path, "Reading bundled catalog");
        let data = tokio::fs::read(&self.path).await?;
        let decoded: VideoResponse = serde_json::from_slice(&data)?;
        let items = decoded.into_items();
        info!(items = items.len(), "Bundled videos loaded");
        Ok(items)
    }
}

// =============================================================================
// Fallback
// =============================================================================

/// Tries `primary`, then `fallback` on any error.
///
/// When both fail the fallback's error is returned.
pub struct FallbackVideoSource {
    primary: Arc<dyn VideoSource>,
    fallback: Arc<dyn VideoSource>,
}

impl FallbackVideoSource {
    pub fn new(primary: Arc<dyn VideoSource>, fallback: Arc<dyn VideoSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl VideoSource for FallbackVideoSource {
    async fn fetch(&self) -> Result<Vec<VideoItem>> {
        Ok(self.fetch_catalog().await?.items)
    }

    async fn fetch_catalog(&self) -> Result<Catalog> {
        match self.primary.fetch().await {
            Ok(items) => Ok(Catalog {
                items,
                from_fallback: false,
            }),
            Err(primary_err) => {
                warn!(error = %primary_err, "Primary video source failed, using fallback");
                let items = self.fallback.fetch().await.map_err(|fallback_err| {
                    debug!(error = %fallback_err, "Fallback video source failed");
                    fallback_err
                })?;
                Ok(Catalog {
                    items,
                    from_fallback: true,
                })
            }
        }
    }
}
