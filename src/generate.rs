use log::info;

use crate::error::{ApiError, upstream_failure};
use crate::llm::{Completion, Dispatcher};
use crate::models::{self, ALL_MODEL_IDS, OPENAI_MODEL_IDS};
use crate::postprocess;
use crate::templates::{self, Persona};

/// Kind of content generated from a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Summary,
    Blog,
    Script,
}

/// Per-mode prompt, model and output settings
struct ModeProfile {
    default_prompt: &'static str,
    lead: Option<&'static str>,
    allowed_models: &'static [&'static str],
    default_model: &'static str,
    max_tokens: u32,
    temperature: f32,
    short_form: bool,
    failure: &'static str,
}

impl Mode {
    fn profile(&self) -> ModeProfile {
        match self {
            Mode::Summary => ModeProfile {
                default_prompt: templates::SUMMARY_PROMPT,
                lead: None,
                allowed_models: ALL_MODEL_IDS,
                default_model: "gpt-3.5-turbo",
                max_tokens: 500,
                temperature: 0.7,
                short_form: true,
                failure: "テキストの要約に失敗しました。",
            },
            Mode::Blog => ModeProfile {
                default_prompt: templates::BLOG_PROMPT,
                lead: Some(templates::BLOG_LEAD),
                allowed_models: OPENAI_MODEL_IDS,
                default_model: "gpt-4",
                max_tokens: 3000,
                temperature: 0.7,
                short_form: false,
                failure: "ブログ記事の生成に失敗しました。",
            },
            Mode::Script => ModeProfile {
                default_prompt: templates::SCRIPT_PROMPT,
                lead: Some(templates::SCRIPT_LEAD),
                allowed_models: OPENAI_MODEL_IDS,
                default_model: "gpt-4",
                max_tokens: 4000,
                temperature: 0.7,
                short_form: false,
                failure: "台本の生成に失敗しました。",
            },
        }
    }

    /// JSON field carrying the result
    pub fn response_key(&self) -> &'static str {
        match self {
            Mode::Summary => "summary",
            Mode::Blog => "blog",
            Mode::Script => "script",
        }
    }

    pub fn default_model(&self) -> &'static str {
        self.profile().default_model
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.response_key())
    }
}

/// Input for one generation call
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub text: String,
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub persona: Persona,
}

/// Reject empty or oversized text
pub fn validate_text(text: &str, max_chars: usize) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::validation("テキストが指定されていません。"));
    }
    let len = text.chars().count();
    if len > max_chars {
        return Err(ApiError::validation(format!(
            "テキストが長すぎます。{max_chars}文字以内にしてください。（現在{len}文字）"
        )));
    }
    Ok(())
}

/// Validate, prompt, dispatch and shape the output for `mode`
pub async fn generate(
    dispatcher: &Dispatcher,
    mode: Mode,
    req: &GenerationRequest,
    max_chars: usize,
) -> Result<String, ApiError> {
    let profile = mode.profile();
    validate_text(&req.text, max_chars)?;
    let model = models::resolve(req.model.as_deref().unwrap_or(profile.default_model), profile.allowed_models)?;

    info!(
        "Generating {mode} with {} ({} chars of input)",
        model.id,
        req.text.chars().count()
    );

    let completion = Completion {
        system: templates::system_prompt(profile.default_prompt, req.prompt.as_deref(), &req.persona),
        user: templates::user_message(profile.lead, &req.text),
        max_tokens: profile.max_tokens,
        temperature: profile.temperature,
    };

    let raw = dispatcher
        .generate(model, &completion)
        .await
        .map_err(|e| upstream_failure(&e, profile.failure))?;

    let shaped = if profile.short_form {
        postprocess::shape_post(&raw)
    } else {
        postprocess::shape_long_form(&raw)
    };
    shaped.ok_or_else(|| ApiError::upstream(profile.failure))
}
