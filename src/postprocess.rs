use std::sync::LazyLock;

use regex::Regex;

/// Character budget for a short-form post, hashtags included
pub const MAX_POST_CHARS: usize = 280;

/// Used when the model omits the `---` hashtag section
pub const DEFAULT_HASHTAGS: &str = "#YouTube #動画要約";

const DELIMITER: &str = "---";
const SEPARATOR: &str = "\n\n";
const ELLIPSIS: &str = "...";

static FULL_STOP_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new("。+").expect("valid regex"));

/// Collapse runs of `。` into one
pub fn collapse_full_stops(text: &str) -> String {
    FULL_STOP_RUN.replace_all(text, "。").into_owned()
}

/// Split a response into body and hashtags on the first `---`
pub fn split_hashtags(response: &str) -> (String, String) {
    let mut parts = response.split(DELIMITER).map(str::trim);
    let body = parts.next().unwrap_or_default().to_string();
    let hashtags = match parts.next() {
        Some(tags) if !tags.is_empty() => tags.to_string(),
        _ => DEFAULT_HASHTAGS.to_string(),
    };
    (body, hashtags)
}

/// Join body and hashtags, cutting the body so the whole fits the budget
pub fn fit_post(body: &str, hashtags: &str) -> String {
    let body_len = body.chars().count();
    let tags_len = hashtags.chars().count();
    let sep_len = SEPARATOR.chars().count();

    if body_len + sep_len + tags_len <= MAX_POST_CHARS {
        return format!("{body}{SEPARATOR}{hashtags}");
    }

    // hashtags alone overflow: the body shrinks to the ellipsis and the tags are cut
    let tags_budget = MAX_POST_CHARS - sep_len - ELLIPSIS.len();
    if tags_len > tags_budget {
        let tags: String = hashtags.chars().take(tags_budget).collect();
        return format!("{ELLIPSIS}{SEPARATOR}{tags}");
    }

    let keep = tags_budget - tags_len;
    let truncated: String = body.chars().take(keep).collect();
    format!("{truncated}{ELLIPSIS}{SEPARATOR}{hashtags}")
}

/// Full short-form pipeline; `None` when the model produced no body
pub fn shape_post(response: &str) -> Option<String> {
    let (body, hashtags) = split_hashtags(response.trim());
    if body.is_empty() {
        return None;
    }
    let body = collapse_full_stops(&body);
    Some(fit_post(&body, &hashtags))
}

/// Long-form outputs are only trimmed; `None` when nothing is left
pub fn shape_long_form(response: &str) -> Option<String> {
    let trimmed = response.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_full_stops() {
        assert_eq!(
            collapse_full_stops("Hello world. This is a test。。。"),
            "Hello world. This is a test。"
        );
        for n in 1..8 {
            let input = format!("a{}b", "。".repeat(n));
            assert_eq!(collapse_full_stops(&input), "a。b");
        }
        assert_eq!(collapse_full_stops("no stops. here"), "no stops. here");
    }

    #[test]
    fn test_split_hashtags() {
        let (body, tags) = split_hashtags("本文です。\n---\n#a #b");
        assert_eq!(body, "本文です。");
        assert_eq!(tags, "#a #b");
    }

    #[test]
    fn test_split_without_delimiter_uses_default_tags() {
        let (body, tags) = split_hashtags("全部本文");
        assert_eq!(body, "全部本文");
        assert_eq!(tags, DEFAULT_HASHTAGS);
    }

    #[test]
    fn test_split_ignores_extra_sections() {
        let (body, tags) = split_hashtags("body---#x---trailing");
        assert_eq!(body, "body");
        assert_eq!(tags, "#x");
    }

    #[test]
    fn test_fit_post_within_budget() {
        assert_eq!(fit_post("short", "#a"), "short\n\n#a");
    }

    #[test]
    fn test_fit_post_truncates_body_only() {
        let body = "あ".repeat(290);
        let out = fit_post(&body, "#a #b");
        assert_eq!(out.chars().count(), MAX_POST_CHARS);
        assert!(out.ends_with("...\n\n#a #b"));

        let kept: String = out.chars().take_while(|c| *c == 'あ').collect();
        assert_eq!(kept.chars().count(), 280 - 2 - 5 - 3);
    }

    #[test]
    fn test_fit_post_boundary() {
        // 273 + 2 + 5 == 280 fits exactly
        let body = "x".repeat(273);
        assert_eq!(fit_post(&body, "#a #b"), format!("{body}\n\n#a #b"));

        let body = "x".repeat(274);
        let out = fit_post(&body, "#a #b");
        assert_eq!(out.len(), MAX_POST_CHARS);
        assert!(out.starts_with(&"x".repeat(270)));
    }

    #[test]
    fn test_fit_post_oversized_hashtags() {
        let tags = "#".repeat(279);
        let out = fit_post("本文", &tags);
        assert_eq!(out.chars().count(), MAX_POST_CHARS);
        assert_eq!(out, format!("...\n\n{}", "#".repeat(275)));

        // 275 tag chars still fit beside an empty body
        let tags = "#".repeat(275);
        let out = fit_post("本文", &tags);
        assert_eq!(out, format!("...\n\n{tags}"));
    }

    #[test]
    fn test_shape_post() {
        let out = shape_post("  要点です。。\n---\n#tag  ").unwrap();
        assert_eq!(out, "要点です。\n\n#tag");

        let out = shape_post("区切りなし").unwrap();
        assert_eq!(out, format!("区切りなし\n\n{DEFAULT_HASHTAGS}"));

        assert!(shape_post("---\n#only").is_none());
        assert!(shape_post("   ").is_none());
    }

    #[test]
    fn test_shape_long_form() {
        assert_eq!(shape_long_form("\n# 記事。。\n").as_deref(), Some("# 記事。。"));
        assert!(shape_long_form(" \n").is_none());
    }
}
