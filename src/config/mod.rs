//! Configuration module for Healthbot.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AssistantPrompts, Prompts};
pub use settings::{
    AgentSettings, GeneralSettings, ModelSettings, PromptSettings, Resolution, SafeSearch,
    Settings, TimeLimit, TranscriptProvider, TranscriptSettings, VideoDuration, VideoProvider,
    VideoSearchSettings, WebSearchSettings,
};
