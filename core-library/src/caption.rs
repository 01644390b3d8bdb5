//! Caption derivation from catalog page URLs.

/// Shown when no caption can be derived.
pub const FALLBACK_CAPTION: &str = "Discover amazing content on Pexels";

/// Derive a display caption from a video page URL.
///
/// The last non-empty path segment is a dash-separated slug ending in an id
/// (`nature-sunset-beautiful-123`). The id is dropped and the remaining words
/// are title-cased.
///
/// ```
/// use core_library::caption::caption_for;
///
/// assert_eq!(
///     caption_for("https://www.pexels.com/video/nature-sunset-beautiful-123/"),
///     "Nature Sunset Beautiful"
/// );
/// assert_eq!(caption_for(""), "Discover amazing content on Pexels");
/// ```
pub fn caption_for(source: &str) -> String {
    let Some(slug) = source.split('/').filter(|s| !s.is_empty()).last() else {
        return FALLBACK_CAPTION.to_string();
    };

    let mut words: Vec<&str> = slug.split('-').filter(|w| !w.is_empty()).collect();
    words.pop();

    if words.is_empty() {
        return FALLBACK_CAPTION.to_string();
    }

    words
        .into_iter()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_from_slug() {
        assert_eq!(
            caption_for("https://www.pexels.com/video/nature-sunset-beautiful-123/"),
            "Nature Sunset Beautiful"
        );
        assert_eq!(
            caption_for("https://www.pexels.com/video/aerial-view-of-FOREST-856789"),
            "Aerial View Of Forest"
        );
    }

    #[test]
    fn test_caption_fallbacks() {
        assert_eq!(caption_for(""), FALLBACK_CAPTION);
        assert_eq!(caption_for("///"), FALLBACK_CAPTION);
        // single word slug is only the id
        assert_eq!(caption_for("https://www.pexels.com/video/123/"), FALLBACK_CAPTION);
    }

    #[test]
    fn test_caption_ignores_repeated_separators() {
        assert_eq!(caption_for("video/ocean--waves-9"), "Ocean Waves");
    }
}
