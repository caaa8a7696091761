use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Query, Request, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use eyre::{Result, WrapErr, bail};
use log::{info, warn};
use serde::Deserialize;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::Settings;
use crate::error::ApiError;
use crate::generate::{self, GenerationRequest, Mode};
use crate::llm::{ApiKeys, Dispatcher};
use crate::models::{self, ALL_MODEL_IDS};
use crate::ratelimit::{FixedWindowLimiter, RateLimiter, Unlimited};
use crate::templates::Persona;
use crate::translate;
use crate::youtube::{CaptionSource, HttpCaptionSource};
use crate::{CaptionTrack, VideoId};

/// Used when no proxy header identifies the client
const UNKNOWN_CLIENT: &str = "unknown";

/// Shared handles for every request
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub captions: Arc<dyn CaptionSource>,
    pub limiter: Arc<dyn RateLimiter>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire HTTP clients and the rate limiter from resolved settings
    pub fn from_settings(settings: Settings, keys: &ApiKeys) -> Result<Self> {
        if models::lookup(&settings.translate_fallback_model).is_none() {
            bail!(
                "translate_fallback_model '{}' is not a known model",
                settings.translate_fallback_model
            );
        }

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .wrap_err("building HTTP client")?;

        let limiter: Arc<dyn RateLimiter> = if settings.rate_limit_max == 0 {
            warn!("Rate limiting disabled (rate_limit.max_requests = 0)");
            Arc::new(Unlimited)
        } else {
            Arc::new(FixedWindowLimiter::new(settings.rate_limit_max, settings.rate_limit_window))
        };

        Ok(Self {
            dispatcher: Arc::new(Dispatcher::from_keys(&client, keys)),
            captions: Arc::new(HttpCaptionSource::new(client, settings.captions_endpoint.clone())),
            limiter,
            settings: Arc::new(settings),
        })
    }

    /// Fetch captions and optionally translate them
    pub async fn load_transcript(
        &self,
        video_id: &VideoId,
        language: Option<&str>,
        translate_with: Option<&str>,
    ) -> Result<CaptionTrack, ApiError> {
        let language = language
            .filter(|l| !l.trim().is_empty())
            .or(self.settings.default_lang.as_deref());
        let mut track = self.captions.fetch(video_id, language).await?;
        info!("Transcript for {video_id}: {} lines", track.lines.len());

        if let Some(model) = translate_with {
            let translated = translate::translate(
                &self.dispatcher,
                &track.text(),
                Some(model),
                &self.settings.translate_fallback_model,
                self.settings.max_input_chars,
            )
            .await?;
            track.lines = translated.lines().map(str::to_string).collect();
            track.translated = true;
        }
        Ok(track)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/transcript", get(transcript))
        .route("/api/summarize", post(summarize))
        .route("/api/blog", post(blog))
        .route("/api/script", post(script))
        .route("/api/translate", post(translate_text))
        .route("/api/models", get(list_models))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .fallback(not_found)
        .layer(middleware::from_fn(log_requests))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("binding to {addr}"))?;
    info!("API server listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("running API server")?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {e}");
    }
}

/// First hop of X-Forwarded-For
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = client_ip(request.headers());
    if !state.limiter.check_and_increment(&ip) {
        warn!("Rate limit exceeded for {ip}");
        return ApiError::RateLimited.into_response();
    }
    next.run(request).await
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let ip = client_ip(request.headers());
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{method} {path} -> {} in {:?} (client {ip})",
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

async fn not_found() -> ApiError {
    ApiError::NotFound("エンドポイントが見つかりません。".to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptQuery {
    video_id: Option<String>,
    language_code: Option<String>,
    translate: Option<String>,
    model: Option<String>,
}

fn is_truthy(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

async fn transcript(State(state): State<AppState>, Query(query): Query<TranscriptQuery>) -> Result<Response, ApiError> {
    let raw_id = query
        .video_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation("YouTube動画IDが指定されていません。"))?;

    let video_id = VideoId::parse(raw_id).ok_or_else(|| {
        warn!("Rejected invalid video ID: {raw_id}");
        ApiError::validation("無効な動画IDです。")
    })?;

    let translate_with = if query.translate.as_deref().is_some_and(is_truthy) {
        let model = query.model.as_deref().unwrap_or(translate::DEFAULT_MODEL);
        Some(models::resolve(model, ALL_MODEL_IDS)?.id)
    } else {
        None
    };

    let track = state
        .load_transcript(&video_id, query.language_code.as_deref(), translate_with)
        .await?;

    let text = track.text();
    info!("Returning transcript for {video_id}: {} chars", text.chars().count());
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response())
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    text: Option<String>,
    prompt: Option<String>,
    model: Option<String>,
    persona: Option<String>,
    audience: Option<String>,
}

impl From<GenerateBody> for GenerationRequest {
    fn from(body: GenerateBody) -> Self {
        GenerationRequest {
            text: body.text.unwrap_or_default(),
            prompt: body.prompt,
            model: body.model,
            persona: Persona {
                persona: body.persona,
                audience: body.audience,
            },
        }
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(b)| b).map_err(|e| {
        warn!("Rejected request body: {}", e.body_text());
        ApiError::validation("リクエストの形式が正しくありません。")
    })
}

async fn run_mode(
    state: &AppState,
    mode: Mode,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = GenerationRequest::from(json_body(body)?);
    let out = generate::generate(&state.dispatcher, mode, &req, state.settings.max_input_chars).await?;

    let mut map = serde_json::Map::new();
    map.insert(mode.response_key().to_string(), serde_json::Value::String(out));
    Ok(Json(serde_json::Value::Object(map)))
}

async fn summarize(
    State(state): State<AppState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    run_mode(&state, Mode::Summary, body).await
}

async fn blog(
    State(state): State<AppState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    run_mode(&state, Mode::Blog, body).await
}

async fn script(
    State(state): State<AppState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    run_mode(&state, Mode::Script, body).await
}

#[derive(Debug, Deserialize)]
struct TranslateBody {
    text: Option<String>,
    model: Option<String>,
}

async fn translate_text(
    State(state): State<AppState>,
    body: Result<Json<TranslateBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = json_body(body)?;
    let translated = translate::translate(
        &state.dispatcher,
        body.text.as_deref().unwrap_or_default(),
        body.model.as_deref(),
        &state.settings.translate_fallback_model,
        state.settings.max_input_chars,
    )
    .await?;
    Ok(Json(serde_json::json!({ "translatedText": translated })))
}

async fn list_models(State(state): State<AppState>) -> Json<Vec<serde_json::Value>> {
    let list = models::MODELS
        .iter()
        .map(|m| {
            serde_json::json!({
                "id": m.id,
                "name": m.name,
                "description": m.description,
                "provider": m.provider,
                "available": state.dispatcher.is_enabled(m.provider),
            })
        })
        .collect();
    Json(list)
}
