use log::{info, warn};

use crate::error::{ApiError, upstream_failure};
use crate::generate::validate_text;
use crate::llm::{Completion, Dispatcher};
use crate::models::{self, ALL_MODEL_IDS};
use crate::postprocess;
use crate::templates;

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet";
pub const DEFAULT_FALLBACK_MODEL: &str = "gpt-3.5-turbo";

const FAILURE: &str = "テキストの翻訳に失敗しました。";

/// Translate `text` into Japanese.
///
/// A failed attempt is retried once on `fallback_model`, unless that is the
/// model that just failed. There is no second hop.
pub async fn translate(
    dispatcher: &Dispatcher,
    text: &str,
    model: Option<&str>,
    fallback_model: &str,
    max_chars: usize,
) -> Result<String, ApiError> {
    validate_text(text, max_chars)?;
    let primary = models::resolve(model.unwrap_or(DEFAULT_MODEL), ALL_MODEL_IDS)?;

    let completion = Completion {
        system: templates::TRANSLATE_PROMPT.to_string(),
        user: text.to_string(),
        max_tokens: 4000,
        temperature: 0.3,
    };

    info!("Translating {} chars with {}", text.chars().count(), primary.id);
    let first = dispatcher.generate(primary, &completion).await;

    let raw = match first {
        Ok(raw) => raw,
        Err(e) if primary.id != fallback_model => {
            warn!("Translation with {} failed ({e}), retrying with {fallback_model}", primary.id);
            let fallback = models::lookup(fallback_model).ok_or_else(|| upstream_failure(&e, FAILURE))?;
            dispatcher
                .generate(fallback, &completion)
                .await
                .map_err(|e| upstream_failure(&e, FAILURE))?
        }
        Err(e) => return Err(upstream_failure(&e, FAILURE)),
    };

    postprocess::shape_long_form(&raw).ok_or_else(|| ApiError::upstream(FAILURE))
}
