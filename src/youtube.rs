use std::sync::LazyLock;

use async_trait::async_trait;
use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::{CaptionTrack, VideoId};

pub const DEFAULT_ENDPOINT: &str = "https://youtubetranscript.com/";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; TranscriptFetcher/1.0)";

static TEXT_ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text[^>]*>(.*?)</text>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("no transcript found for this video")]
    NotFound,

    #[error("video unavailable")]
    Unavailable,

    #[error("caption upstream error: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for TranscriptError {
    fn from(e: reqwest::Error) -> Self {
        TranscriptError::Upstream(e.to_string())
    }
}

/// Where caption text comes from
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// `language` is a preferred language code; unknown codes fall back to the default track
    async fn fetch(&self, video_id: &VideoId, language: Option<&str>) -> Result<CaptionTrack, TranscriptError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    transcript: Option<String>,
    #[serde(default)]
    languages: Vec<LanguageEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct LanguageEntry {
    code: String,
    #[serde(default)]
    name: String,
}

/// Captions from a youtubetranscript.com-style scraping endpoint
pub struct HttpCaptionSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCaptionSource {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn get(&self, video_id: &VideoId, lang: Option<&str>) -> Result<(String, String), TranscriptError> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("server_vid2", video_id.as_str())])
            .header("Accept", "application/json, text/plain, */*")
            .header("User-Agent", USER_AGENT);
        if let Some(lang) = lang {
            request = request.query(&[("lang", lang)]);
        }

        debug!("Fetching captions for {video_id} (lang={lang:?})");
        let resp = request.send().await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TranscriptError::Unavailable);
        }
        if !status.is_success() {
            return Err(TranscriptError::Upstream(format!("captions endpoint returned {status}")));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = resp.text().await?;
        Ok((content_type, body))
    }
}

#[async_trait]
impl CaptionSource for HttpCaptionSource {
    async fn fetch(&self, video_id: &VideoId, language: Option<&str>) -> Result<CaptionTrack, TranscriptError> {
        let (content_type, body) = self.get(video_id, None).await?;

        let (text, served_lang) = match sniff(&content_type, &body) {
            Payload::Xml => {
                info!("Received XML captions for {video_id}");
                (format_caption_text(&body), None)
            }
            Payload::Json(data) => {
                let mut text = data.transcript.unwrap_or_default();
                let mut served = None;

                if let Some(wanted) = language {
                    match pick_language(&data.languages, wanted) {
                        Some(entry) => match self.get(video_id, Some(&entry.code)).await {
                            Ok((_, lang_body)) => match serde_json::from_str::<TranscriptResponse>(&lang_body) {
                                Ok(TranscriptResponse {
                                    transcript: Some(t), ..
                                }) => {
                                    text = t;
                                    served = Some(entry.code.clone());
                                }
                                _ => warn!("{} captions for {video_id} were unreadable, using the default track", entry.code),
                            },
                            Err(e) => {
                                warn!("Fetching {} captions for {video_id} failed ({e}), using the default track", entry.code)
                            }
                        },
                        None => warn!("No {wanted} captions for {video_id}, using the default track"),
                    }
                }
                (format_caption_text(&text), served)
            }
            Payload::Text => {
                warn!("Captions for {video_id} were neither XML nor JSON, treating as text");
                (format_caption_text(&body), None)
            }
        };

        if body_reports_unavailable(&body) {
            return Err(TranscriptError::Unavailable);
        }

        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        if lines.is_empty() {
            return Err(TranscriptError::NotFound);
        }

        info!("Fetched {} caption lines for {video_id}", lines.len());
        Ok(CaptionTrack {
            video_id: video_id.to_string(),
            language: served_lang,
            lines,
            translated: false,
        })
    }
}

#[derive(Debug)]
enum Payload {
    Xml,
    Json(TranscriptResponse),
    Text,
}

/// Content-Type first, then the body itself
fn sniff(content_type: &str, body: &str) -> Payload {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("application/xml")
        || ct.contains("text/xml")
        || (ct.contains("text/plain") && body.contains("<transcript>"))
    {
        return Payload::Xml;
    }

    match serde_json::from_str::<TranscriptResponse>(body) {
        Ok(data) => Payload::Json(data),
        Err(e) => {
            debug!("Caption body is not JSON: {e}");
            Payload::Text
        }
    }
}

fn pick_language<'a>(languages: &'a [LanguageEntry], wanted: &str) -> Option<&'a LanguageEntry> {
    let wanted_lower = wanted.to_lowercase();
    languages
        .iter()
        .find(|l| l.code == wanted || l.name.to_lowercase().contains(&wanted_lower))
}

fn body_reports_unavailable(body: &str) -> bool {
    body.contains("Video unavailable")
}

/// Normalise caption markup to newline-separated lines without blanks
pub fn format_caption_text(data: &str) -> String {
    if data.contains("<transcript>") {
        let lines = match parse_caption_xml(data) {
            Ok(lines) if !lines.is_empty() => lines,
            Ok(_) => {
                warn!("Caption XML had no text elements, falling back to regex");
                regex_caption_lines(data)
            }
            Err(e) => {
                warn!("Caption XML did not parse ({e}), falling back to regex");
                regex_caption_lines(data)
            }
        };
        return lines.join("\n");
    }

    TAG_RE
        .replace_all(data, "")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_caption_xml(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut lines = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) if e.name().as_ref() == b"text" => {
                current = Some(String::new());
            }
            Event::Text(ref e) => {
                if let Some(buf) = current.as_mut() {
                    let raw = e.unescape().unwrap_or_default();
                    buf.push_str(&html_escape::decode_html_entities(&raw));
                }
            }
            Event::CData(ref e) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(e));
                }
            }
            Event::End(ref e) if e.name().as_ref() == b"text" => {
                if let Some(text) = current.take() {
                    push_line(&mut lines, &text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(lines)
}

fn regex_caption_lines(xml: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for caps in TEXT_ELEMENT_RE.captures_iter(xml) {
        let text = caps[1]
            .replace("&apos;", "'")
            .replace("&quot;", "\"")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">");
        push_line(&mut lines, &html_escape::decode_html_entities(&text));
    }
    lines
}

/// Captions may wrap mid-sentence; each source line becomes its own line
fn push_line(lines: &mut Vec<String>, text: &str) {
    lines.extend(
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string),
    );
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Serves a fixed result and counts calls
    pub struct StaticCaptions {
        pub result: Result<Vec<&'static str>, fn() -> TranscriptError>,
        pub calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl StaticCaptions {
        pub fn lines(lines: Vec<&'static str>) -> Self {
            Self {
                result: Ok(lines),
                calls: Mutex::default(),
            }
        }

        pub fn failing(err: fn() -> TranscriptError) -> Self {
            Self {
                result: Err(err),
                calls: Mutex::default(),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CaptionSource for StaticCaptions {
        async fn fetch(&self, video_id: &VideoId, language: Option<&str>) -> Result<CaptionTrack, TranscriptError> {
            self.calls
                .lock()
                .unwrap()
                .push((video_id.to_string(), language.map(str::to_string)));
            match &self.result {
                Ok(lines) => Ok(CaptionTrack {
                    video_id: video_id.to_string(),
                    language: language.map(str::to_string),
                    lines: lines.iter().map(|l| l.to_string()).collect(),
                    translated: false,
                }),
                Err(make) => Err(make()),
            }
        }
    }
}
