use serde::Serialize;

use crate::error::ApiError;

/// LLM vendor behind a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Gemini,
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Gemini, Provider::Anthropic];

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Gemini => "Gemini",
            Provider::Anthropic => "Anthropic",
        }
    }

    /// Environment variables checked for the API key, in order
    pub fn env_vars(&self) -> &'static [&'static str] {
        match self {
            Provider::OpenAi => &["OPENAI_API_KEY"],
            Provider::Gemini => &["GEMINI_API_KEY"],
            Provider::Anthropic => &["CLAUDE_API_KEY", "ANTHROPIC_API_KEY"],
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A user-selectable model and the vendor string it maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    pub vendor_model: &'static str,
    pub provider: Provider,
}

pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-3.5-turbo",
        name: "GPT-3.5 Turbo",
        description: "高速で経済的",
        vendor_model: "gpt-3.5-turbo",
        provider: Provider::OpenAi,
    },
    ModelInfo {
        id: "gpt-4",
        name: "GPT-4",
        description: "高精度で詳細な分析が可能",
        vendor_model: "gpt-4",
        provider: Provider::OpenAi,
    },
    ModelInfo {
        id: "gpt-4-turbo",
        name: "GPT-4 Turbo",
        description: "最新のGPT-4モデル",
        vendor_model: "gpt-4-turbo",
        provider: Provider::OpenAi,
    },
    ModelInfo {
        id: "gemini-1.5-pro",
        name: "Gemini 1.5 Pro",
        description: "Googleの最新AI、高速で正確",
        vendor_model: "gemini-1.5-pro-latest",
        provider: Provider::Gemini,
    },
    ModelInfo {
        id: "claude-3-opus",
        name: "Claude 3 Opus",
        description: "最高精度のAI、複雑な分析が得意",
        vendor_model: "claude-3-opus-20240229",
        provider: Provider::Anthropic,
    },
    ModelInfo {
        id: "claude-3-5-sonnet",
        name: "Claude 3.5 Sonnet",
        description: "高速で経済的なClaude",
        vendor_model: "claude-3-5-sonnet-20241022",
        provider: Provider::Anthropic,
    },
];

/// Every registered model
pub const ALL_MODEL_IDS: &[&str] = &[
    "gpt-3.5-turbo",
    "gpt-4",
    "gpt-4-turbo",
    "gemini-1.5-pro",
    "claude-3-opus",
    "claude-3-5-sonnet",
];

/// Long-form routes only run on OpenAI models
pub const OPENAI_MODEL_IDS: &[&str] = &["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo"];

pub fn lookup(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

/// Check `id` against a route's allow-list and return its registry entry
pub fn resolve(id: &str, allowed: &[&str]) -> Result<&'static ModelInfo, ApiError> {
    if !allowed.contains(&id) {
        return Err(ApiError::validation("無効なAIモデルが指定されました。"));
    }
    lookup(id).ok_or_else(|| ApiError::validation("無効なAIモデルが指定されました。"))
}
