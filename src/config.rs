// ⚙️ Configuration - environment (+ optional .env file)

use crate::gate::Secret;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CSV_PATH: &str = "glasses_frames_data.csv";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 512;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BRAND: &str = "Burberry";
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// `Debug` is safe to log: `Secret` redacts itself
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Secret,
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub csv_path: PathBuf,
    pub password: Arc<Secret>,
    /// None when no API key is configured; questions are then disabled
    pub llm: Option<LlmConfig>,
    pub default_brand: String,
    pub server_addr: String,
}

impl Config {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let password = get("DASHBOARD_PASSWORD").ok_or(ConfigError::Missing("DASHBOARD_PASSWORD"))?;

        let llm = match get("LLM_API_KEY") {
            Some(api_key) => Some(LlmConfig {
                api_key: Secret::new(api_key),
                base_url: get("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_output_tokens: parse_or(
                    "LLM_MAX_OUTPUT_TOKENS",
                    get("LLM_MAX_OUTPUT_TOKENS"),
                    DEFAULT_MAX_OUTPUT_TOKENS,
                )?,
                timeout: Duration::from_secs(parse_or(
                    "LLM_TIMEOUT_SECS",
                    get("LLM_TIMEOUT_SECS"),
                    DEFAULT_TIMEOUT_SECS,
                )?),
            }),
            None => None,
        };

        Ok(Self {
            csv_path: get("INVENTORY_CSV")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_PATH)),
            password: Arc::new(Secret::new(password)),
            llm,
            default_brand: get("DEFAULT_BRAND").unwrap_or_else(|| DEFAULT_BRAND.to_string()),
            server_addr: get("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
        })
    }
}

/// Positive integer or the default; zero counts as invalid
fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) if parsed != T::default() => Ok(parsed),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}
