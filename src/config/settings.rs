//! Configuration settings for Healthbot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub agent: AgentSettings,
    pub web_search: WebSearchSettings,
    pub video_search: VideoSearchSettings,
    pub transcript: TranscriptSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error), used when no `-v` is given.
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.healthbot".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Language model settings. Any OpenAI-compatible chat completions endpoint works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Base URL of the chat completions API.
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Stream responses and concatenate the increments.
    pub streaming: bool,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            model: "llama3-70b-8192".to_string(),
            temperature: 1.0,
            streaming: true,
            timeout_seconds: 120,
        }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum tool rounds before the model is forced to answer without tools.
    pub max_tool_rounds: usize,
    /// Run the auxiliary video agent on every turn.
    pub video_agent: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: 5,
            video_agent: true,
        }
    }
}

/// Content search (Tavily) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchSettings {
    /// Base URL of the search API.
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Default number of results per search.
    pub max_results: usize,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.tavily.com".to_string(),
            api_key_env: "TAVILY_API_KEY".to_string(),
            max_results: 5,
            timeout_seconds: 30,
        }
    }
}

/// Video search backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VideoProvider {
    /// Keyless web search filtered to YouTube watch links.
    #[default]
    DuckDuckGo,
    /// YouTube Data API v3.
    YouTube,
}

impl std::str::FromStr for VideoProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "duckduckgo" | "ddg" => Ok(VideoProvider::DuckDuckGo),
            "youtube" => Ok(VideoProvider::YouTube),
            _ => Err(format!("Unknown video provider: {}", s)),
        }
    }
}

impl std::fmt::Display for VideoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoProvider::DuckDuckGo => write!(f, "duckduckgo"),
            VideoProvider::YouTube => write!(f, "youtube"),
        }
    }
}

/// Safe-search filter level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    Strict,
    #[default]
    Moderate,
    Off,
}

/// Recency window for search results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeLimit {
    Day,
    Week,
    Month,
    Year,
}

impl TimeLimit {
    /// Length of the window in days.
    pub fn days(&self) -> i64 {
        match self {
            TimeLimit::Day => 1,
            TimeLimit::Week => 7,
            TimeLimit::Month => 30,
            TimeLimit::Year => 365,
        }
    }
}

/// Video resolution filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    High,
    Standard,
}

/// Video duration filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VideoDuration {
    Short,
    Medium,
    Long,
}

/// Video search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSearchSettings {
    /// Backend to query.
    pub provider: VideoProvider,
    /// Base URL override for the backend (empty = provider default).
    pub api_base: String,
    /// Name of the environment variable holding the YouTube API key.
    pub api_key_env: String,
    /// Region code (e.g. "us-en" for DuckDuckGo, "US" for YouTube).
    pub region: Option<String>,
    pub safe_search: SafeSearch,
    pub time_limit: Option<TimeLimit>,
    pub resolution: Option<Resolution>,
    pub duration: Option<VideoDuration>,
    /// Default number of results per search.
    pub max_results: usize,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for VideoSearchSettings {
    fn default() -> Self {
        Self {
            provider: VideoProvider::DuckDuckGo,
            api_base: String::new(),
            api_key_env: "YOUTUBE_API_KEY".to_string(),
            region: None,
            safe_search: SafeSearch::Moderate,
            time_limit: None,
            resolution: None,
            duration: None,
            max_results: 5,
            timeout_seconds: 30,
        }
    }
}

/// Transcript storage backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptProvider {
    /// Kept in memory for the lifetime of the session.
    #[default]
    Memory,
    /// Persisted to SQLite so sessions can be resumed and replayed.
    Sqlite,
}

/// Transcript storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    pub provider: TranscriptProvider,
    /// Path to the SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            provider: TranscriptProvider::Memory,
            sqlite_path: "~/.healthbot/history.db".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::HealthbotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("healthbot")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite transcript database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.transcript.sqlite_path)
    }

    /// Tracing filter for the crate: `-v` flags win over `general.log_level`.
    pub fn log_filter(&self, verbose: u8) -> String {
        let level = match verbose {
            0 => match self.general.log_level.trim().to_ascii_lowercase().as_str() {
                level @ ("trace" | "debug" | "info" | "warn" | "error" | "off") => level.to_string(),
                _ => "warn".to_string(),
            },
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        };
        format!("healthbot={}", level)
    }

    /// Read an API key from the environment variable named in the config.
    ///
    /// Returns `None` when the variable is unset or empty.
    pub fn api_key(env_var: &str) -> Option<String> {
        std::env::var(env_var).ok().filter(|key| !key.is_empty())
    }
}
