//! Domain models for the video feed

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;
use url::Url;

use crate::caption::caption_for;

// =============================================================================
// ID Types
// =============================================================================

/// Catalog-assigned video identifier, stable across fetches.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VideoId(pub i64);

impl VideoId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for VideoId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Video Item
// =============================================================================

/// Creator credited for a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Option<i64>,
    /// Empty when the catalog omits it.
    pub name: String,
    pub profile_url: Option<Url>,
}

/// Immutable descriptor of one feed entry.
///
/// Only `like_count` changes after insertion, through the like flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: VideoId,
    /// Lowest-width MP4 rendition; `None` when the catalog offers none.
    pub playable_url: Option<Url>,
    pub preview_url: Option<Url>,
    /// Page URL the caption is derived from (may be empty).
    pub caption_source: String,
    pub author: Option<Author>,
    pub duration_secs: Option<u32>,
    pub like_count: i64,
}

impl VideoItem {
    pub fn new(id: impl Into<VideoId>, playable_url: Option<Url>) -> Self {
        Self {
            id: id.into(),
            playable_url,
            preview_url: None,
            caption_source: String::new(),
            author: None,
            duration_secs: None,
            like_count: 0,
        }
    }

    pub fn with_caption_source(mut self, source: impl Into<String>) -> Self {
        self.caption_source = source.into();
        self
    }

    pub fn with_author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_like_count(mut self, like_count: i64) -> Self {
        self.like_count = like_count;
        self
    }

    /// Display caption derived from the page URL.
    pub fn caption(&self) -> String {
        caption_for(&self.caption_source)
    }

    pub fn author_name(&self) -> &str {
        self.author.as_ref().map(|a| a.name.as_str()).unwrap_or("")
    }
}

// =============================================================================
// Feed Sequence
// =============================================================================

/// Ordered, index-addressed list of feed items. Insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSequence {
    items: Vec<VideoItem>,
}

impl FeedSequence {
    /// Build a sequence, dropping later duplicates of an id.
    pub fn new(items: Vec<VideoItem>) -> Self {
        let mut seen = HashSet::with_capacity(items.len());
        let total = items.len();
        let items: Vec<VideoItem> = items.into_iter().filter(|item| seen.insert(item.id)).collect();

        if items.len() != total {
            warn!(
                dropped = total - items.len(),
                "Dropped duplicate video ids from feed sequence"
            );
        }

        Self { items }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&VideoItem> {
        self.items.get(index)
    }

    pub fn contains_index(&self, index: usize) -> bool {
        index < self.items.len()
    }

    pub fn position_of(&self, id: VideoId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VideoItem> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[VideoItem] {
        &self.items
    }

    /// Adjust an item's derived like count. The count never drops below zero.
    ///
    /// Returns the new count, or `None` for unknown ids.
    pub fn apply_like_delta(&mut self, id: VideoId, delta: i64) -> Option<i64> {
        let item = self.items.iter_mut().find(|item| item.id == id)?;
        item.like_count = (item.like_count + delta).max(0);
        Some(item.like_count)
    }
}

impl From<Vec<VideoItem>> for FeedSequence {
    fn from(items: Vec<VideoItem>) -> Self {
        Self::new(items)
    }
}

impl<'a> IntoIterator for &'a FeedSequence {
    type Item = &'a VideoItem;
    type IntoIter = std::slice::Iter<'a, VideoItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
