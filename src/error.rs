//! Error types for Healthbot.

use thiserror::Error;

/// Library-level error type for Healthbot operations.
#[derive(Error, Debug)]
pub enum HealthbotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Malformed tool call '{tool}': {reason}")]
    MalformedToolCall { tool: String, reason: String },

    #[error("Search provider error: {0}")]
    Search(String),

    #[error("Transcript store error: {0}")]
    Transcript(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl HealthbotError {
    /// Whether this error came from the language model rather than local state.
    pub fn is_model_failure(&self) -> bool {
        matches!(
            self,
            HealthbotError::Model(_) | HealthbotError::OpenAI(_) | HealthbotError::MalformedToolCall { .. }
        )
    }
}

/// Result type alias for Healthbot operations.
pub type Result<T> = std::result::Result<T, HealthbotError>;
