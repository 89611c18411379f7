//! Language model capability.
//!
//! The agents only see the [`ChatModel`] trait: an ordered message list and the
//! tools on offer go in, one assistant message comes out.

mod message;
mod openai;

pub use message::{AssistantMessage, Message, ToolCallRequest, ToolResult};
pub use openai::OpenAIChatModel;

use crate::error::Result;
use async_trait::async_trait;

/// A tool as advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// Trait for chat models that may request tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the messages and return the assistant's reply.
    ///
    /// When `tools` is empty the model is not offered any tools. Streaming
    /// implementations concatenate increments before returning.
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AssistantMessage>;
}
