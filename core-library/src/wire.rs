//! Catalog wire format (Pexels video search response).
//!
//! The remote API and the bundled `videos.json` share this shape. Every field
//! is optional on the wire; conversion into [`VideoItem`] applies the feed's
//! rules (skip id-less entries, static quality pick).

use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{Author, VideoId, VideoItem};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoResponse {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub total_results: Option<u64>,
    pub next_page: Option<String>,
    pub url: Option<String>,
    pub videos: Option<Vec<Video>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: Option<i64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<u32>,
    /// Human-facing page URL; its slug carries the caption.
    pub url: Option<String>,
    /// Preview still.
    pub image: Option<String>,
    pub user: Option<User>,
    pub video_files: Option<Vec<VideoFile>>,
    pub video_pictures: Option<Vec<VideoPicture>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoFile {
    pub id: Option<i64>,
    /// `hd`, `sd`, `uhd`
    pub quality: Option<String>,
    pub file_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub link: Option<String>,
    pub size: Option<u64>,
}

impl VideoFile {
    fn is_mp4(&self) -> bool {
        self.file_type
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains("mp4"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoPicture {
    pub id: Option<i64>,
    pub nr: Option<u32>,
    pub picture: Option<String>,
}

impl Video {
    /// Static quality pick: the narrowest MP4 rendition.
    ///
    /// Files without a width sort first. Returns `None` when there is no MP4
    /// or its link does not parse.
    pub fn best_playable_url(&self) -> Option<Url> {
        let files = self.video_files.as_ref()?;
        let best = files
            .iter()
            .filter(|file| file.is_mp4())
            .min_by_key(|file| file.width.unwrap_or(0))?;
        Url::parse(best.link.as_deref()?).ok()
    }

    /// Convert into a feed item. `None` when the entry has no id.
    pub fn into_item(self) -> Option<VideoItem> {
        let id = VideoId(self.id?);
        let playable_url = self.best_playable_url();
        let preview_url = self.image.as_deref().and_then(|s| Url::parse(s).ok());
        let author = self.user.map(|user| Author {
            id: user.id,
            name: user.name.unwrap_or_default(),
            profile_url: user.url.as_deref().and_then(|s| Url::parse(s).ok()),
        });

        Some(VideoItem {
            id,
            playable_url,
            preview_url,
            caption_source: self.url.unwrap_or_default(),
            author,
            duration_secs: self.duration,
            like_count: 0,
        })
    }
}

impl VideoResponse {
    /// Feed items in catalog order, id-less entries skipped.
    pub fn into_items(self) -> Vec<VideoItem> {
        self.videos
            .unwrap_or_default()
            .into_iter()
            .filter_map(Video::into_item)
            .collect()
    }
}
