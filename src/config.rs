use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use eyre::{Result, WrapErr};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::ratelimit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
use crate::translate::DEFAULT_FALLBACK_MODEL;
use crate::youtube::DEFAULT_ENDPOINT;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_MAX_INPUT_CHARS: usize = 50_000;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub bind: Option<String>,
    pub captions_endpoint: Option<String>,
    pub max_input_chars: Option<usize>,
    pub translate_fallback_model: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub default_lang: Option<String>,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// 0 disables rate limiting
    pub max_requests: Option<u32>,
    pub window_secs: Option<u64>,
}

impl Config {
    /// Load config from ~/.config/ytgen/config.toml if it exists
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config =
                toml::from_str(&content).wrap_err_with(|| format!("invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Fill in defaults for everything the file left out
    pub fn settings(&self) -> Result<Settings> {
        let bind = self.bind.as_deref().unwrap_or(DEFAULT_BIND);
        let bind = bind
            .parse()
            .wrap_err_with(|| format!("invalid bind address '{bind}'"))?;

        Ok(Settings {
            bind,
            captions_endpoint: self
                .captions_endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            max_input_chars: self.max_input_chars.unwrap_or(DEFAULT_MAX_INPUT_CHARS),
            translate_fallback_model: self
                .translate_fallback_model
                .clone()
                .unwrap_or_else(|| DEFAULT_FALLBACK_MODEL.to_string()),
            request_timeout: Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            default_lang: self.default_lang.clone(),
            rate_limit_max: self.rate_limit.max_requests.unwrap_or(DEFAULT_MAX_REQUESTS),
            rate_limit_window: self
                .rate_limit
                .window_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_WINDOW),
        })
    }
}

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: SocketAddr,
    pub captions_endpoint: String,
    pub max_input_chars: usize,
    pub translate_fallback_model: String,
    pub request_timeout: Duration,
    pub default_lang: Option<String>,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            captions_endpoint: DEFAULT_ENDPOINT.to_string(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            translate_fallback_model: DEFAULT_FALLBACK_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_lang: None,
            rate_limit_max: DEFAULT_MAX_REQUESTS,
            rate_limit_window: DEFAULT_WINDOW,
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytgen")
        .join("config.toml")
}
