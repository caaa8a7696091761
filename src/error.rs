use thiserror::Error;

use crate::llm::LlmError;
use crate::youtube::TranscriptError;

/// Errors surfaced at the HTTP boundary. Messages are shown to end users.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("リクエスト数の上限に達しました。しばらく待ってから再試行してください。")]
    RateLimited,

    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::RateLimited => 429,
            ApiError::Upstream(_) => 500,
        }
    }
}

impl From<TranscriptError> for ApiError {
    fn from(e: TranscriptError) -> Self {
        match e {
            TranscriptError::NotFound => ApiError::NotFound("この動画には字幕がありません。".to_string()),
            TranscriptError::Unavailable => ApiError::NotFound("動画が見つかりません。".to_string()),
            TranscriptError::Upstream(detail) => {
                log::error!("Caption upstream failure: {detail}");
                ApiError::upstream("字幕の取得に失敗しました。")
            }
        }
    }
}

/// Log the vendor failure and map it to a generic user-facing message
pub fn upstream_failure(e: &LlmError, public: &str) -> ApiError {
    log::error!("{public} ({e})");
    ApiError::upstream(public)
}
