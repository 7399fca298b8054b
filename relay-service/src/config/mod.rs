use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 90;
const DEFAULT_MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// `None` keeps the service up; every chat request then fails fast.
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Attempts per chat request, counting the first one.
    pub max_attempts: u32,
}

impl GeminiSettings {
    pub fn new(api_key: Option<&str>, model: &str) -> Self {
        Self {
            api_key: api_key.and_then(non_empty).map(Secret::new),
            model: model.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self
    }

    /// `{api_base}/models/{model}:generateContent`
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let api_key = env::var("GEMINI_API_KEY").ok();
        if api_key.as_deref().and_then(non_empty).is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; /chat will answer 500 until it is");
        }

        let mut gemini = GeminiSettings::new(
            api_key.as_deref(),
            &env_or("GEMINI_MODEL", DEFAULT_MODEL),
        )
        .with_api_base(&env_or("GEMINI_API_BASE", DEFAULT_API_BASE));

        gemini.connect_timeout = Duration::from_secs(env_parse(
            "GEMINI_CONNECT_TIMEOUT_SECS",
            DEFAULT_CONNECT_TIMEOUT_SECS,
        ));
        gemini.read_timeout =
            Duration::from_secs(env_parse("GEMINI_READ_TIMEOUT_SECS", DEFAULT_READ_TIMEOUT_SECS));

        Ok(RelayConfig { common, gemini })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse(key: &str, default: u64) -> u64 {
    parse_timeout_secs(key, env::var(key).ok().as_deref(), default)
}

/// Zero would fail every attempt instantly, so it is rejected like garbage.
fn parse_timeout_secs(key: &str, raw: Option<&str>, default: u64) -> u64 {
    let Some(val) = raw else {
        return default;
    };

    match val.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => secs,
        _ => {
            tracing::warn!(key, value = %val, default, "Ignoring invalid timeout env value");
            default
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
