//! Application Configuration Module
//!
//! Centralizes configuration for the journal session engine. Settings are
//! loaded from environment variables into one shareable struct.

use std::env;
use tracing::Level;

// --- Application Constants ---

/// The size of each audio chunk sent from the microphone input stream.
pub const INPUT_CHUNK_SIZE: usize = 1024;
/// The size of each audio chunk for the audio output stream.
pub const OUTPUT_CHUNK_SIZE: usize = 1024;
/// The latency for the output audio buffer in milliseconds.
pub const OUTPUT_LATENCY_MS: usize = 1000;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub chat_model: String,
    pub vad_threshold: f32,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `AURA_API_KEY`: Secret key for the speech and text services. Required.
    // *   `CHAT_MODEL`: (Optional) Model used by the distiller. Defaults to "gpt-4o".
    // *   `AURA_VAD_THRESHOLD`: (Optional) RMS speech threshold. Defaults to 0.015.
    // *   `RUST_LOG`: (Optional) Logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. Useful for local development, ignored if not present.
        dotenvy::dotenv().ok();

        let api_key = env::var("AURA_API_KEY")
            .map_err(|_| ConfigError::MissingVar("AURA_API_KEY".to_string()))?;

        let chat_model = env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let vad_threshold = match env::var("AURA_VAD_THRESHOLD") {
            Ok(raw) => raw
                .parse::<f32>()
                .map_err(|_| ConfigError::InvalidValue("AURA_VAD_THRESHOLD", raw))?,
            Err(_) => crate::vad::VadConfig::default().threshold,
        };

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            api_key,
            chat_model,
            vad_threshold,
            log_level,
        })
    }
}
