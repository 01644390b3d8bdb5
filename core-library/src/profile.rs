//! Creator profile aggregation.

use serde::{Deserialize, Serialize};

use crate::models::VideoItem;

/// Totals shown on a creator's profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub username: String,
    pub video_count: usize,
    pub total_likes: i64,
}

impl ProfileSummary {
    /// Aggregate the items credited to `author_name`.
    pub fn for_author<'a, I>(author_name: &str, items: I) -> Self
    where
        I: IntoIterator<Item = &'a VideoItem>,
    {
        let (video_count, total_likes) = items
            .into_iter()
            .filter(|item| item.author_name() == author_name)
            .fold((0usize, 0i64), |(count, likes), item| {
                (count + 1, likes + item.like_count)
            });

        Self {
            username: author_name.to_string(),
            video_count,
            total_likes,
        }
    }
}
