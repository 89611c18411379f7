//! OpenAI-compatible client configuration.

use crate::config::{ModelSettings, Settings};
use crate::error::{HealthbotError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create a chat completions client for the configured endpoint.
///
/// The API key is read from the environment variable named in the settings.
pub fn create_client(settings: &ModelSettings) -> Result<Client<OpenAIConfig>> {
    let api_key = Settings::api_key(&settings.api_key_env).ok_or_else(|| {
        HealthbotError::Config(format!("{} is not set", settings.api_key_env))
    })?;

    create_client_with_key(settings, &api_key)
}

/// Create a client with an explicit API key and the configured timeout.
pub fn create_client_with_key(settings: &ModelSettings, api_key: &str) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_seconds))
        .build()?;

    let config = OpenAIConfig::new()
        .with_api_base(&settings.api_base)
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}
