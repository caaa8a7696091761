pub mod config;
pub mod error;
pub mod generate;
pub mod llm;
pub mod models;
pub mod output;
pub mod postprocess;
pub mod ratelimit;
pub mod saved;
pub mod server;
pub mod templates;
pub mod translate;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("valid regex"));

static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // youtube.com/watch?v=ID
        r"(?:youtube\.com/watch\?.*v=)([a-zA-Z0-9_-]{11})",
        // youtu.be/ID
        r"youtu\.be/([a-zA-Z0-9_-]{11})",
        // youtube.com/embed/ID
        r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
        // youtube.com/shorts/ID
        r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// A validated 11-character YouTube video ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoId(String);

impl VideoId {
    /// Accept only a bare ID; URLs go through [`extract_video_id`]
    pub fn parse(input: &str) -> Option<Self> {
        if VIDEO_ID_RE.is_match(input) {
            Some(Self(input.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caption lines for a video, in playback order
#[derive(Debug, Clone, Serialize)]
pub struct CaptionTrack {
    pub video_id: String,
    /// Language actually served; `None` when the upstream default was used
    pub language: Option<String>,
    pub lines: Vec<String>,
    pub translated: bool,
}

impl CaptionTrack {
    /// Newline-joined caption text
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<VideoId> {
    let input = input.trim();

    if let Some(id) = VideoId::parse(input) {
        return Some(id);
    }

    URL_PATTERNS
        .iter()
        .find_map(|re| re.captures(input))
        .map(|caps| VideoId(caps[1].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Option<String> {
        extract_video_id(s).map(|v| v.as_str().to_string())
    }

    #[test]
    fn test_bare_video_id() {
        assert_eq!(id("dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));
    }

    #[test]
    fn test_watch_url_with_extra_params() {
        assert_eq!(
            id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=120"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_short_url() {
        assert_eq!(id("https://youtu.be/dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));
    }

    #[test]
    fn test_embed_and_shorts_urls() {
        assert_eq!(
            id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            id("https://youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(id("not-a-valid-id"), None);
        assert_eq!(id(""), None);
    }

    #[test]
    fn test_whitespace_trimming() {
        assert_eq!(id("  dQw4w9WgXcQ  "), Some("dQw4w9WgXcQ".to_string()));
    }

    #[test]
    fn test_parse_rejects_wrong_length_and_chars() {
        assert!(VideoId::parse("dQw4w9WgXc").is_none());
        assert!(VideoId::parse("dQw4w9WgXcQQ").is_none());
        assert!(VideoId::parse("dQw4w9WgX!Q").is_none());
        assert!(VideoId::parse(" dQw4w9WgXcQ").is_none());
        assert!(VideoId::parse("a_b-c_d-e_f").is_some());
    }

    #[test]
    fn test_caption_track_text() {
        let track = CaptionTrack {
            video_id: "dQw4w9WgXcQ".to_string(),
            language: None,
            lines: vec!["Hello world".to_string(), "This is a test".to_string()],
            translated: false,
        };
        assert_eq!(track.text(), "Hello world\nThis is a test");
    }
}
