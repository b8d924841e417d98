//! YouTube video URL parsing.
//!
//! Turns one raw line of text into the canonical 11-character video
//! identifier, or nothing if the line is not a recognizable YouTube video
//! URL. Parsing is a pure function of the input text; unrecognized lines are
//! reported upstream, never raised.

use serde::Serialize;
use std::fmt;

/// The number of characters in every YouTube video identifier.
const VIDEO_ID_LEN: usize = 11;

/// The ID that YouTube uses to uniquely identify a video.
///
/// Always exactly 11 characters drawn from `[A-Za-z0-9_-]`. Construct one by
/// parsing a URL with [`extract_video_id`]; equality is exact string
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts a YouTube video ID from a URL in any of the supported shapes.
///
/// Supported shapes (http/https and scheme-less, with or without `www.`):
/// - `youtube.com/watch?v=<id>` (the `v` parameter may appear anywhere in
///   the query string)
/// - `youtu.be/<id>`
/// - `youtube.com/embed/<id>`
/// - `youtube.com/v/<id>`
/// - `youtube.com/shorts/<id>`
/// - `youtube.com/live/<id>`
///
/// Trailing query parameters and fragments after the identifier (`?si=...`,
/// timestamps, playlist context) are ignored. Returns `None` for anything
/// that is not one of these shapes, or whose identifier segment is not
/// exactly 11 valid identifier characters.
pub fn extract_video_id(url: &str) -> Option<VideoId> {
    let url = url.trim();

    if let Some(rest) = strip_host(url, "youtu.be") {
        return id_segment(rest);
    }

    let rest = strip_host(url, "youtube.com")?;

    if let Some(query) = rest.strip_prefix("watch?") {
        return query
            .split('&')
            .find_map(|pair| pair.strip_prefix("v="))
            .and_then(id_segment);
    }

    for prefix in ["embed/", "v/", "shorts/", "live/"] {
        if let Some(path) = rest.strip_prefix(prefix) {
            return id_segment(path);
        }
    }

    None
}

/// Strips the scheme, optional `www.` prefix, and `host` from `url`,
/// returning the remainder after the first `/` past the host.
///
/// Matching the host at the start (after scheme/`www.` only) rejects lookalike
/// domains such as `not-youtube.com`.
fn strip_host<'a>(url: &'a str, host: &str) -> Option<&'a str> {
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let url = url.strip_prefix("www.").unwrap_or(url);
    url.strip_prefix(host)?.strip_prefix('/')
}

/// Reads a video ID from the front of `segment`.
///
/// The leading run of identifier characters must be exactly 11 long;
/// whatever follows (another query parameter, a fragment, a path separator)
/// is ignored.
fn id_segment(segment: &str) -> Option<VideoId> {
    let len = segment
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
        .count();
    if len == VIDEO_ID_LEN {
        Some(VideoId(segment[..VIDEO_ID_LEN].to_string()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(url: &str) -> Option<String> {
        extract_video_id(url).map(|v| v.as_str().to_string())
    }

    #[test]
    fn recognizes_all_url_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "http://www.youtube.com/watch?v=dQw4w9WgXcQ&feature=related",
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "http://youtu.be/dQw4w9WgXcQ?t=15",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "http://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ",
        ] {
            assert_eq!(id(url).as_deref(), Some("dQw4w9WgXcQ"), "url: {url}");
        }
    }

    #[test]
    fn ignores_trailing_parameters_and_fragments() {
        assert_eq!(
            id("https://www.youtube.com/live/abcdefghijk?si=xyz").as_deref(),
            Some("abcdefghijk")
        );
        assert_eq!(
            id("https://youtu.be/dQw4w9WgXcQ?si=AbC&t=42").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            id("https://www.youtube.com/watch?v=dQw4w9WgXcQ#t=1m").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn finds_v_parameter_anywhere_in_query() {
        assert_eq!(
            id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn rejects_non_video_urls() {
        for url in [
            "https://www.google.com",
            "https://www.youtube.com/watch?v=",
            "https://www.youtube.com/watch?vid=dQw4w9WgXcQ",
            "just a string",
            "youtu.be/",
            "https://example.com/dQw4w9WgXcQ",
            "https://not-youtube.com/watch?v=dQw4w9WgXcQ",
            "",
        ] {
            assert_eq!(id(url), None, "url: {url:?}");
        }
    }

    #[test]
    fn rejects_wrong_length_segments() {
        // Too short, too long, and invalid characters inside the segment.
        assert_eq!(id("https://youtu.be/dQw4w9WgXc"), None);
        assert_eq!(id("https://youtu.be/dQw4w9WgXcQQ"), None);
        assert_eq!(id("https://www.youtube.com/watch?v=dQw4w9Wg!cQ"), None);
    }
}
