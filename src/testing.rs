//! Test doubles for the model and tool capabilities.

use crate::error::{HealthbotError, Result};
use crate::llm::{AssistantMessage, ChatModel, Message, ToolCallRequest, ToolSpec};
use crate::tools::{ResultRecord, ToolArguments, ToolInvoker};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A model that replays scripted replies and records what it was sent.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<std::result::Result<AssistantMessage, String>>>,
    calls: Mutex<Vec<(Vec<Message>, Vec<String>)>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<std::result::Result<AssistantMessage, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every invocation: the messages sent and the names of the tools offered.
    pub fn calls(&self) -> Vec<(Vec<Message>, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AssistantMessage> {
        self.calls.lock().unwrap().push((
            messages.to_vec(),
            tools.iter().map(|t| t.name.clone()).collect(),
        ));

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(HealthbotError::Model(e)),
            None => Err(HealthbotError::Model("script exhausted".to_string())),
        }
    }
}

/// A tool returning fixed records, or echoing the query back as a video id.
pub struct StaticTool {
    name: String,
    records: Option<Vec<ResultRecord>>,
    invocations: Mutex<Vec<ToolArguments>>,
}

impl StaticTool {
    pub fn new(name: &str, records: Vec<ResultRecord>) -> Self {
        Self {
            name: name.to_string(),
            records: Some(records),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Returns the query as a single video record; "slow" and "medium" queries
    /// finish later than the rest.
    pub fn echoing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: None,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<ToolArguments> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolInvoker for StaticTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: format!("Test tool {}", self.name),
            parameters: serde_json::json!({"type": "object"}),
        }
    }

    async fn invoke(&self, args: &ToolArguments) -> Vec<ResultRecord> {
        self.invocations.lock().unwrap().push(args.clone());

        match &self.records {
            Some(records) => records.clone(),
            None => {
                let delay = match args.query.as_str() {
                    "slow" => 40,
                    "medium" => 20,
                    _ => 0,
                };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                vec![ResultRecord::Video(args.query.clone())]
            }
        }
    }
}

/// A tool call request with a `{"query": ...}` argument object.
pub fn tool_call(call_id: &str, tool_name: &str, query: &str) -> ToolCallRequest {
    ToolCallRequest {
        call_id: call_id.to_string(),
        tool_name: tool_name.to_string(),
        arguments: serde_json::json!({ "query": query }).to_string(),
    }
}

/// An assistant reply with text and tool calls.
pub fn reply_with_calls(content: &str, tool_calls: Vec<ToolCallRequest>) -> AssistantMessage {
    AssistantMessage {
        content: content.to_string(),
        tool_calls,
    }
}
