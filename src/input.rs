//! Input file loading.
//!
//! Reads the URL list file and turns it into an ordered, deduplicated
//! sequence of video IDs plus the lines that failed to parse. Reading the
//! file is the only fallible step and happens before any authorization or
//! network activity, so a bad path fails the run fast.

use crate::video_url::{VideoId, extract_video_id};
use eyre::Context;
use std::collections::HashSet;
use std::path::Path;

/// The outcome of parsing one line of the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// The line was a recognizable video URL.
    Video(VideoId),
    /// The line was blank or a `#` comment and is silently skipped.
    Skipped,
    /// The line was neither skippable nor parsable; carries the raw text.
    Unparsable(String),
}

/// Classifies a single input line.
///
/// A line that is empty, whitespace-only, or whose first non-whitespace
/// character is `#` is skipped. Everything else must parse as a video URL.
pub fn parse_line(line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return ParsedLine::Skipped;
    }
    match extract_video_id(trimmed) {
        Some(id) => ParsedLine::Video(id),
        None => ParsedLine::Unparsable(line.to_string()),
    }
}

/// An input file reduced to the IDs to insert and the lines that failed.
#[derive(Debug, Default)]
pub struct VideoList {
    /// Deduplicated video IDs in first-seen order.
    pub videos: Vec<VideoId>,
    /// Lines that were neither skippable nor parsable, verbatim, in order.
    pub unparsable: Vec<String>,
}

impl VideoList {
    /// Builds a video list from the lines of an input file.
    ///
    /// Repeats of an identifier (even via differing equivalent URL forms)
    /// keep only the first occurrence, at its original position; repeats are
    /// not failures.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut list = Self::default();
        let mut seen = HashSet::new();
        for line in lines {
            match parse_line(line) {
                ParsedLine::Video(id) => {
                    if seen.insert(id.clone()) {
                        list.videos.push(id);
                    } else {
                        tracing::debug!(video_id = %id, "dropping repeated video ID");
                    }
                }
                ParsedLine::Skipped => {}
                ParsedLine::Unparsable(raw) => {
                    tracing::warn!(line = %raw, "could not extract video ID from line");
                    list.unparsable.push(raw);
                }
            }
        }
        list
    }

    /// Reads and parses the input file at `path`.
    ///
    /// An unreadable file (missing, bad permissions) is a fatal error for
    /// the whole run.
    pub async fn load(path: &Path) -> eyre::Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read input file {}", path.display()))?;
        let list = Self::from_lines(contents.lines());
        tracing::info!(
            videos = list.videos.len(),
            unparsable = list.unparsable.len(),
            "loaded input file"
        );
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blanks_and_comments() {
        for line in ["", "   ", "\t", "# a comment", "   # indented comment"] {
            assert_eq!(parse_line(line), ParsedLine::Skipped, "line: {line:?}");
        }
        let list = VideoList::from_lines(["", "# x", "   "]);
        assert!(list.videos.is_empty());
        assert!(list.unparsable.is_empty());
    }

    #[test]
    fn deduplicates_across_equivalent_forms() {
        let list = VideoList::from_lines([
            "# comment",
            "",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "not a url",
        ]);
        let ids: Vec<_> = list.videos.iter().map(|v| v.as_str()).collect();
        assert_eq!(ids, ["dQw4w9WgXcQ"]);
        assert_eq!(list.unparsable, ["not a url"]);
    }

    #[test]
    fn first_occurrence_keeps_its_position() {
        let list = VideoList::from_lines([
            "https://youtu.be/aaaaaaaaaaa",
            "https://youtu.be/bbbbbbbbbbb",
            "https://youtu.be/aaaaaaaaaaa",
            "https://youtu.be/ccccccccccc",
        ]);
        let ids: Vec<_> = list.videos.iter().map(|v| v.as_str()).collect();
        assert_eq!(ids, ["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"]);
    }

    #[test]
    fn unparsable_lines_keep_order_and_text() {
        let list = VideoList::from_lines([
            "zzz first bad line",
            "https://youtu.be/dQw4w9WgXcQ",
            "second bad line",
        ]);
        assert_eq!(list.unparsable, ["zzz first bad line", "second bad line"]);
        assert_eq!(list.videos.len(), 1);
    }

    #[tokio::test]
    async fn unreadable_file_is_fatal() {
        let err = VideoList::load(Path::new("/definitely/not/here.txt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("read input file"));
    }
}
