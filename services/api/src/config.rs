//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use flashcards_core::ValidationMode;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// Google's OpenAI-compatible endpoint for Gemini models.
pub const DEFAULT_MODEL_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Absent keys are reported per request as a missing credential.
    pub gemini_api_key: Option<String>,
    pub model_api_base: String,
    pub flashcard_model: String,
    pub generation_timeout: Duration,
    pub validation_mode: ValidationMode,
    pub max_upload_bytes: usize,
    /// `None` allows any origin.
    pub cors_allow_origin: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load the Model Settings ---
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let model_api_base = std::env::var("MODEL_API_BASE")
            .unwrap_or_else(|_| DEFAULT_MODEL_API_BASE.to_string());
        let flashcard_model =
            std::env::var("FLASHCARD_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());

        let generation_timeout = Duration::from_secs(parse_var("GENERATION_TIMEOUT_SECS", 60u64)?);
        if generation_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "GENERATION_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        // --- Load Pipeline and HTTP Settings ---
        let validation_mode = match std::env::var("VALIDATION_MODE") {
            Ok(value) => value
                .parse::<ValidationMode>()
                .map_err(|e| ConfigError::InvalidValue("VALIDATION_MODE".to_string(), e))?,
            Err(_) => ValidationMode::default(),
        };
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024usize)?;
        let cors_allow_origin = std::env::var("CORS_ALLOW_ORIGIN")
            .ok()
            .filter(|origin| origin.trim() != "*" && !origin.trim().is_empty());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            gemini_api_key,
            model_api_base,
            flashcard_model,
            generation_timeout,
            validation_mode,
            max_upload_bytes,
            cors_allow_origin,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
