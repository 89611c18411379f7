//! Healthbot - a healthcare chat assistant
//!
//! A CLI and HTTP front end that answers health questions with a language
//! model, adds web sources and YouTube videos found through tool calls, and
//! keeps a transcript that can be replayed.
//!
//! # Overview
//!
//! Every user message runs as one turn:
//! - the answering agent talks to the model, calling web search as often as
//!   the model asks (up to a configured number of rounds)
//! - the media agent gets the same history and may call video search once
//! - text, links and videos are folded into a single [`transcript::AssistantTurn`]
//!   and appended to the session transcript
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `llm` - Chat model capability and message types
//! - `tools` - Web and video search tools
//! - `agent` - Tool-calling agent state machine
//! - `transcript` - Turn records and transcript stores
//! - `session` - Chat session lifecycle
//! - `orchestrator` - Turn coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use healthbot::config::Settings;
//! use healthbot::orchestrator::AgentOrchestrator;
//! use healthbot::session::create_session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = AgentOrchestrator::new(&settings)?;
//!     let mut session = create_session(&settings)?;
//!
//!     let turn = orchestrator
//!         .submit_user_message(&mut session, "What causes a migraine?")
//!         .await?;
//!     println!("{}", turn.text());
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod session;
pub mod tools;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use error::{HealthbotError, Result};
