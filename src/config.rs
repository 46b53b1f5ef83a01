use std::env;
use std::time::Duration;

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::warn;

pub const DEFAULT_PLATFORM: &str = "generic";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_temperature: f32,
    pub openai_repair_temperature: f32,
    pub openai_max_tokens: u32,
    pub llm_timeout_seconds: u64,
    pub default_platform: String,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_platform(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return DEFAULT_PLATFORM.to_string();
    }
    trimmed.to_string()
}

fn normalize_timeout(seconds: u64) -> u64 {
    if seconds == 0 {
        warn!("LLM_TIMEOUT_SECONDS must be positive; using 30 seconds.");
        return 30;
    }
    seconds
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info"),
            log_dir: env_string("LOG_DIR", "logs"),
            openai_api_key: env_string("OPENAI_API_KEY", "").trim().to_string(),
            openai_base_url: env_string("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_model: env_string("OPENAI_MODEL", "gpt-4o-mini"),
            openai_temperature: env_f32("OPENAI_TEMPERATURE", 0.6),
            openai_repair_temperature: env_f32("OPENAI_REPAIR_TEMPERATURE", 0.0),
            openai_max_tokens: env_u32("OPENAI_MAX_TOKENS", 400),
            llm_timeout_seconds: normalize_timeout(env_u64("LLM_TIMEOUT_SECONDS", 30)),
            default_platform: normalize_platform(env_string("DEFAULT_PLATFORM", DEFAULT_PLATFORM)),
        })
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_seconds)
    }

    pub fn has_openai_credentials(&self) -> bool {
        !self.openai_api_key.is_empty()
    }
}
