use serde::Serialize;

use crate::CaptionTrack;
use crate::generate::Mode;

/// Render transcript as plain text (one caption line per line)
pub fn render_text(track: &CaptionTrack) -> String {
    track.text()
}

/// Render transcript with its metadata as pretty JSON
pub fn render_json(track: &CaptionTrack) -> String {
    serde_json::to_string_pretty(track).unwrap_or_default()
}

#[derive(Serialize)]
struct GeneratedDoc<'a> {
    video_id: &'a str,
    mode: String,
    model: &'a str,
    translated: bool,
    content: &'a str,
}

/// Render generated content as pretty JSON
pub fn render_generated_json(track: &CaptionTrack, mode: Mode, model: &str, content: &str) -> String {
    let doc = GeneratedDoc {
        video_id: &track.video_id,
        mode: mode.to_string(),
        model,
        translated: track.translated,
        content,
    };
    serde_json::to_string_pretty(&doc).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track() -> CaptionTrack {
        CaptionTrack {
            video_id: "dQw4w9WgXcQ".to_string(),
            language: Some("en".to_string()),
            lines: vec!["Hello world".to_string(), "This is a test".to_string()],
            translated: false,
        }
    }

    #[test]
    fn test_render_text() {
        assert_eq!(render_text(&sample_track()), "Hello world\nThis is a test");
    }

    #[test]
    fn test_render_text_empty() {
        let t = CaptionTrack {
            lines: vec![],
            ..sample_track()
        };
        assert_eq!(render_text(&t), "");
    }

    #[test]
    fn test_render_json() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&sample_track())).unwrap();
        assert_eq!(json["video_id"], "dQw4w9WgXcQ");
        assert_eq!(json["language"], "en");
        assert_eq!(json["lines"][1], "This is a test");
    }

    #[test]
    fn test_render_generated_json() {
        let out = render_generated_json(&sample_track(), Mode::Blog, "gpt-4", "# 記事");
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["mode"], "blog");
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["content"], "# 記事");
        assert_eq!(json["translated"], false);
    }
}
