//! Chat model backed by an OpenAI-compatible chat completions API.

use super::{AssistantMessage, ChatModel, Message, ToolCallRequest, ToolSpec};
use crate::config::ModelSettings;
use crate::error::{HealthbotError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    CreateChatCompletionStreamResponse, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Chat model using the chat completions endpoint with tool calling.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    streaming: bool,
}

impl OpenAIChatModel {
    /// Create a model from settings, reading the API key from the environment.
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        Ok(Self::with_client(create_client(settings)?, settings))
    }

    /// Create a model around an existing client.
    pub fn with_client(
        client: async_openai::Client<async_openai::config::OpenAIConfig>,
        settings: &ModelSettings,
    ) -> Self {
        Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
            streaming: settings.streaming,
        }
    }

    fn build_request(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<CreateChatCompletionRequest> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(self.temperature);

        if !tools.is_empty() {
            args.tools(tools.iter().map(to_tool_definition).collect::<Vec<_>>())
                .tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        if self.streaming {
            args.stream(true);
        }

        args.build().map_err(|e| HealthbotError::Model(e.to_string()))
    }

    async fn invoke_blocking(&self, request: CreateChatCompletionRequest) -> Result<AssistantMessage> {
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| HealthbotError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| HealthbotError::Model("No response from model".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCallRequest {
                call_id: call.id,
                tool_name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(AssistantMessage {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }

    async fn invoke_streaming(&self, request: CreateChatCompletionRequest) -> Result<AssistantMessage> {
        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| HealthbotError::OpenAI(format!("Chat API error: {}", e)))?;

        let mut accumulator = StreamAccumulator::default();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| HealthbotError::OpenAI(format!("Chat stream error: {}", e)))?;
            accumulator.push(chunk);
        }

        accumulator.finish()
    }
}

/// Folds streamed chunks into one assistant message.
///
/// Text increments are concatenated; tool-call fragments are joined per `index`.
#[derive(Default)]
struct StreamAccumulator {
    content: String,
    partial_calls: BTreeMap<u32, PartialToolCall>,
    chunks: usize,
}

impl StreamAccumulator {
    fn push(&mut self, chunk: CreateChatCompletionStreamResponse) {
        self.chunks += 1;

        for choice in chunk.choices {
            if let Some(delta) = choice.delta.content {
                self.content.push_str(&delta);
            }
            for call in choice.delta.tool_calls.unwrap_or_default() {
                let partial = self.partial_calls.entry(call.index).or_default();
                if let Some(id) = call.id {
                    partial.id = id;
                }
                if let Some(function) = call.function {
                    if let Some(name) = function.name {
                        partial.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        partial.arguments.push_str(&arguments);
                    }
                }
            }
        }
    }

    fn finish(self) -> Result<AssistantMessage> {
        if self.chunks == 0 {
            return Err(HealthbotError::Model("No response from model".to_string()));
        }

        let tool_calls = self
            .partial_calls
            .into_iter()
            .map(|(index, partial)| partial.finish(index))
            .collect();

        Ok(AssistantMessage {
            content: self.content,
            tool_calls,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len(), tools = tools.len()))]
    async fn invoke(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<AssistantMessage> {
        let request = self.build_request(messages, tools)?;

        let reply = if self.streaming {
            self.invoke_streaming(request).await?
        } else {
            self.invoke_blocking(request).await?
        };

        debug!(
            "Model replied with {} chars and {} tool call(s)",
            reply.content.len(),
            reply.tool_calls.len()
        );
        Ok(reply)
    }
}

/// Tool call fragments accumulated across stream chunks.
#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl PartialToolCall {
    fn finish(self, index: u32) -> ToolCallRequest {
        ToolCallRequest {
            call_id: if self.id.is_empty() {
                format!("call_{}", index)
            } else {
                self.id
            },
            tool_name: self.name,
            arguments: self.arguments,
        }
    }
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let message = match message {
        Message::System { content } => ChatCompletionRequestSystemMessageArgs::default()
            .content(content.as_str())
            .build()
            .map_err(|e| HealthbotError::Model(e.to_string()))?
            .into(),
        Message::User { content } => ChatCompletionRequestUserMessageArgs::default()
            .content(content.as_str())
            .build()
            .map_err(|e| HealthbotError::Model(e.to_string()))?
            .into(),
        Message::Assistant(assistant) => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !assistant.content.is_empty() || assistant.tool_calls.is_empty() {
                args.content(assistant.content.as_str());
            }
            if !assistant.tool_calls.is_empty() {
                args.tool_calls(
                    assistant
                        .tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.call_id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.tool_name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                );
            }
            args.build()
                .map_err(|e| HealthbotError::Model(e.to_string()))?
                .into()
        }
        Message::ToolResult(result) => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(result.call_id.as_str())
            .content(result.payload.as_str())
            .build()
            .map_err(|e| HealthbotError::Model(e.to_string()))?
            .into(),
    };

    Ok(message)
}

fn to_tool_definition(spec: &ToolSpec) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: spec.name.clone(),
            description: Some(spec.description.clone()),
            parameters: Some(spec.parameters.clone()),
            strict: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::create_client_with_key;

    fn model(streaming: bool) -> OpenAIChatModel {
        let settings = ModelSettings {
            streaming,
            ..ModelSettings::default()
        };
        let client = create_client_with_key(&settings, "test-key").unwrap();
        OpenAIChatModel::with_client(client, &settings)
    }

    fn search_spec() -> ToolSpec {
        ToolSpec {
            name: "web_search".to_string(),
            description: "Search the web".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    #[test]
    fn test_request_without_tools_omits_tool_choice() {
        let request = model(false)
            .build_request(&[Message::system("be brief"), Message::user("hi")], &[])
            .unwrap();

        assert_eq!(request.messages.len(), 2);
        assert!(request.tools.is_none());
        assert!(request.tool_choice.is_none());
        assert_ne!(request.stream, Some(true));
    }

    #[test]
    fn test_request_with_tools_and_history() {
        let messages = vec![
            Message::user("What causes a migraine?"),
            Message::Assistant(AssistantMessage {
                content: String::new(),
                tool_calls: vec![ToolCallRequest {
                    call_id: "call_1".to_string(),
                    tool_name: "web_search".to_string(),
                    arguments: r#"{"query":"migraine causes"}"#.to_string(),
                }],
            }),
            Message::ToolResult(crate::llm::ToolResult {
                call_id: "call_1".to_string(),
                tool_name: "web_search".to_string(),
                payload: "[]".to_string(),
            }),
        ];

        let request = model(true).build_request(&messages, &[search_spec()]).unwrap();

        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.tools.as_ref().map(|t| t.len()), Some(1));
        assert_eq!(request.stream, Some(true));
        assert!(matches!(
            request.messages[2],
            ChatCompletionRequestMessage::Tool(_)
        ));
    }

    #[test]
    fn test_partial_tool_call_gets_fallback_id() {
        let partial = PartialToolCall {
            id: String::new(),
            name: "video_search".to_string(),
            arguments: r#"{"query":"CPR"}"#.to_string(),
        };
        let call = partial.finish(2);
        assert_eq!(call.call_id, "call_2");
        assert_eq!(call.tool_name, "video_search");
    }

    fn chunk(delta: serde_json::Value) -> CreateChatCompletionStreamResponse {
        serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1,
            "model": "llama3-70b-8192",
            "choices": [{"index": 0, "delta": delta, "finish_reason": null}]
        }))
        .unwrap()
    }

    #[test]
    fn test_stream_concatenates_text_increments() {
        let mut accumulator = StreamAccumulator::default();
        accumulator.push(chunk(serde_json::json!({"role": "assistant", "content": "Rest and "})));
        accumulator.push(chunk(serde_json::json!({"content": "drink fluids."})));
        accumulator.push(chunk(serde_json::json!({})));

        let reply = accumulator.finish().unwrap();
        assert_eq!(reply.content, "Rest and drink fluids.");
        assert!(reply.tool_calls.is_empty());
    }

    #[test]
    fn test_stream_joins_tool_call_fragments_by_index() {
        let mut accumulator = StreamAccumulator::default();
        accumulator.push(chunk(serde_json::json!({"tool_calls": [{
            "index": 0, "id": "call_a", "type": "function",
            "function": {"name": "web_search", "arguments": "{\"query\":"}
        }]})));
        accumulator.push(chunk(serde_json::json!({"tool_calls": [{
            "index": 1, "id": "call_b", "type": "function",
            "function": {"name": "web_search", "arguments": "{\"query\":\"flu\"}"}
        }]})));
        accumulator.push(chunk(serde_json::json!({"tool_calls": [{
            "index": 0, "function": {"arguments": "\"migraine\"}"}
        }]})));

        let reply = accumulator.finish().unwrap();
        assert_eq!(reply.tool_calls.len(), 2);
        assert_eq!(reply.tool_calls[0].call_id, "call_a");
        assert_eq!(reply.tool_calls[0].tool_name, "web_search");
        assert_eq!(reply.tool_calls[0].arguments, r#"{"query":"migraine"}"#);
        assert_eq!(reply.tool_calls[1].call_id, "call_b");
        assert_eq!(reply.tool_calls[1].arguments, r#"{"query":"flu"}"#);
    }

    #[test]
    fn test_empty_stream_is_model_failure() {
        let result = StreamAccumulator::default().finish();
        assert!(matches!(result, Err(HealthbotError::Model(_))));
    }
}
