//! Like persistence.
//!
//! The playback engine never reads like state; the service layer toggles a
//! like here and then adjusts the item's derived count by one.

use async_trait::async_trait;
use bridge_traits::storage::SettingsStore;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{LibraryError, Result};
use crate::models::VideoId;

/// Settings key holding the liked ids as a JSON array.
pub const LIKED_VIDEOS_KEY: &str = "likedVideos";

#[async_trait]
pub trait LikeStore: Send + Sync {
    async fn is_liked(&self, id: VideoId) -> Result<bool>;

    /// Flip the like state and return the new state.
    async fn toggle(&self, id: VideoId) -> Result<bool>;

    async fn liked_ids(&self) -> Result<BTreeSet<VideoId>>;
}

/// Persists likes through the host [`SettingsStore`].
pub struct SettingsLikeStore {
    settings: Arc<dyn SettingsStore>,
    // Serializes read-modify-write cycles within this process.
    write_lock: tokio::sync::Mutex<()>,
}

impl SettingsLikeStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            settings,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeSet<VideoId>> {
        let Some(raw) = self.settings.get_string(LIKED_VIDEOS_KEY).await? else {
            return Ok(BTreeSet::new());
        };

        match serde_json::from_str::<Vec<VideoId>>(&raw) {
            Ok(ids) => Ok(ids.into_iter().collect()),
            Err(e) => {
                warn!(error = %e, "Stored liked videos are malformed, starting empty");
                Ok(BTreeSet::new())
            }
        }
    }

    async fn store(&self, ids: &BTreeSet<VideoId>) -> Result<()> {
        let raw = serde_json::to_string(ids)
            .map_err(|e| LibraryError::Storage(format!("Failed to encode likes: {}", e)))?;
        self.settings.set_string(LIKED_VIDEOS_KEY, &raw).await?;
        Ok(())
    }
}

#[async_trait]
impl LikeStore for SettingsLikeStore {
    async fn is_liked(&self, id: VideoId) -> Result<bool> {
        Ok(self.load().await?.contains(&id))
    }

    async fn toggle(&self, id: VideoId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut ids = self.load().await?;
        let liked = if ids.remove(&id) {
            false
        } else {
            ids.insert(id);
            true
        };
        self.store(&ids).await?;

        debug!(video_id = %id, liked, "Toggled like");
        Ok(liked)
    }

    async fn liked_ids(&self) -> Result<BTreeSet<VideoId>> {
        self.load().await
    }
}

/// Process-local like store, used when no settings bridge is configured.
#[derive(Default)]
pub struct InMemoryLikeStore {
    ids: Mutex<BTreeSet<VideoId>>,
}

impl InMemoryLikeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LikeStore for InMemoryLikeStore {
    async fn is_liked(&self, id: VideoId) -> Result<bool> {
        Ok(self.ids.lock().contains(&id))
    }

    async fn toggle(&self, id: VideoId) -> Result<bool> {
        let mut ids = self.ids.lock();
        if ids.remove(&id) {
            Ok(false)
        } else {
            ids.insert(id);
            Ok(true)
        }
    }

    async fn liked_ids(&self) -> Result<BTreeSet<VideoId>> {
        Ok(self.ids.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        pub Settings {}

        #[async_trait]
        impl SettingsStore for Settings {
            async fn set_string(&self, key: &str, value: &str) -> bridge_traits::error::Result<()>;
            async fn get_string(&self, key: &str) -> bridge_traits::error::Result<Option<String>>;
            async fn delete(&self, key: &str) -> bridge_traits::error::Result<()>;
        }
    }

    #[tokio::test]
    async fn test_toggle_writes_sorted_json_array() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_string()
            .with(eq(LIKED_VIDEOS_KEY))
            .returning(|_| Ok(Some("[5,1]".to_string())));
        settings
            .expect_set_string()
            .with(eq(LIKED_VIDEOS_KEY), eq("[1,3,5]"))
            .times(1)
            .returning(|_, _| Ok(()));

        let store = SettingsLikeStore::new(Arc::new(settings));
        assert!(store.toggle(VideoId(3)).await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_off_removes_id() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_string()
            .returning(|_| Ok(Some("[1,3]".to_string())));
        settings
            .expect_set_string()
            .with(eq(LIKED_VIDEOS_KEY), eq("[1]"))
            .times(1)
            .returning(|_, _| Ok(()));

        let store = SettingsLikeStore::new(Arc::new(settings));
        assert!(!store.toggle(VideoId(3)).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_value_reads_as_empty() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_string()
            .returning(|_| Ok(Some("not json".to_string())));

        let store = SettingsLikeStore::new(Arc::new(settings));
        assert!(!store.is_liked(VideoId(1)).await.unwrap());
        assert!(store.liked_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_string()
            .returning(|_| Err(BridgeError::DatabaseError("locked".to_string())));

        let store = SettingsLikeStore::new(Arc::new(settings));
        assert!(matches!(
            store.toggle(VideoId(1)).await,
            Err(LibraryError::Bridge(_))
        ));
    }

    #[tokio::test]
    async fn test_in_memory_toggle_round_trip() {
        let store = InMemoryLikeStore::new();
        assert!(!store.is_liked(VideoId(7)).await.unwrap());
        assert!(store.toggle(VideoId(7)).await.unwrap());
        assert!(store.is_liked(VideoId(7)).await.unwrap());
        assert!(!store.toggle(VideoId(7)).await.unwrap());
        assert!(store.liked_ids().await.unwrap().is_empty());
    }
}
