//! Turn agent: alternates between the model and the tools it asks for.

use crate::error::{HealthbotError, Result};
use crate::llm::{AssistantMessage, ChatModel, Message, ToolCallRequest, ToolResult, ToolSpec};
use crate::tools::{encode_records, ToolArguments, ToolInvoker};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default ceiling on tool rounds before the model must answer without tools.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;

/// Where the agent goes once a round of tool calls has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterTools {
    /// Feed the results back to the model.
    AwaitModel,
    /// Stop; the tool results are the output.
    Finish,
}

/// States of a single agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentState {
    AwaitingModel,
    RunningTools(Vec<ToolCallRequest>),
    Done,
}

/// A model bound to a tool set and a post-tool transition.
pub struct TurnAgent {
    name: String,
    model: Arc<dyn ChatModel>,
    tools: Vec<(String, Arc<dyn ToolInvoker>)>,
    after_tools: AfterTools,
    system_prompt: Option<String>,
    max_tool_rounds: usize,
}

impl TurnAgent {
    /// Create an agent with no tools that loops back to the model after tool calls.
    pub fn new(name: &str, model: Arc<dyn ChatModel>) -> Self {
        Self {
            name: name.to_string(),
            model,
            tools: Vec::new(),
            after_tools: AfterTools::AwaitModel,
            system_prompt: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Offer a tool to the model.
    pub fn with_tool(mut self, tool: Arc<dyn ToolInvoker>) -> Self {
        let name = tool.spec().name;
        self.tools.push((name, tool));
        self
    }

    /// Prefix every model invocation with this system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.to_string());
        self
    }

    /// Set the transition taken after a round of tool calls.
    pub fn with_after_tools(mut self, after_tools: AfterTools) -> Self {
        self.after_tools = after_tools;
        self
    }

    /// Set the maximum number of tool rounds.
    pub fn with_max_tool_rounds(mut self, max: usize) -> Self {
        self.max_tool_rounds = max;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the agent over the conversation until it reaches [`AgentState::Done`].
    ///
    /// Only model failures and malformed tool calls are errors; tools
    /// themselves never fail.
    pub async fn run(&self, history: &[Message]) -> Result<AgentRun> {
        let mut working: Vec<Message> = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            working.push(Message::system(prompt.as_str()));
        }
        working.extend_from_slice(history);

        let specs: Vec<ToolSpec> = self.tools.iter().map(|(_, tool)| tool.spec()).collect();
        let mut run = AgentRun::default();
        let mut state = AgentState::AwaitingModel;

        loop {
            state = match state {
                AgentState::AwaitingModel => {
                    // Past the ceiling the model gets no tools, so it has to answer.
                    let offered: &[ToolSpec] = if run.tool_rounds < self.max_tool_rounds {
                        &specs
                    } else {
                        &[]
                    };

                    debug!(
                        "[{}] model call {} with {} messages, {} tools",
                        self.name,
                        run.model_calls + 1,
                        working.len(),
                        offered.len()
                    );

                    let reply = self.model.invoke(&working, offered).await?;
                    run.model_calls += 1;

                    if !reply.content.is_empty() {
                        run.texts.push(reply.content.clone());
                    }

                    if reply.has_tool_calls() && !offered.is_empty() {
                        let pending = reply.tool_calls.clone();
                        working.push(Message::Assistant(reply));
                        AgentState::RunningTools(pending)
                    } else {
                        if reply.has_tool_calls() {
                            warn!(
                                "[{}] dropping {} tool call(s) made without tools on offer",
                                self.name,
                                reply.tool_calls.len()
                            );
                        }
                        working.push(Message::Assistant(AssistantMessage::text(reply.content)));
                        AgentState::Done
                    }
                }

                AgentState::RunningTools(pending) => {
                    let results = self.run_tools(&pending).await?;
                    run.tool_rounds += 1;

                    for result in results {
                        working.push(Message::ToolResult(result.clone()));
                        run.tool_results.push(result);
                    }

                    match self.after_tools {
                        AfterTools::AwaitModel => AgentState::AwaitingModel,
                        AfterTools::Finish => AgentState::Done,
                    }
                }

                AgentState::Done => break,
            };
        }

        info!(
            "[{}] finished after {} model call(s), {} tool round(s)",
            self.name, run.model_calls, run.tool_rounds
        );

        run.messages = working;
        Ok(run)
    }

    /// Dispatch one round of tool calls concurrently, returning results in request order.
    async fn run_tools(&self, pending: &[ToolCallRequest]) -> Result<Vec<ToolResult>> {
        let mut calls = Vec::with_capacity(pending.len());
        for request in pending {
            let tool = self.find_tool(&request.tool_name).ok_or_else(|| {
                HealthbotError::MalformedToolCall {
                    tool: request.tool_name.clone(),
                    reason: "unknown tool".to_string(),
                }
            })?;
            let args = ToolArguments::parse(&request.tool_name, &request.arguments)?;
            info!("[{}] calling tool: {}", self.name, request);
            calls.push((request, tool, args));
        }

        let outputs = join_all(calls.iter().map(|(_, tool, args)| tool.invoke(args))).await;

        Ok(calls
            .iter()
            .zip(outputs)
            .map(|((request, _, _), records)| {
                debug!("[{}] {} returned {} record(s)", self.name, request.tool_name, records.len());
                ToolResult {
                    call_id: request.call_id.clone(),
                    tool_name: request.tool_name.clone(),
                    payload: encode_records(&records),
                }
            })
            .collect())
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn ToolInvoker>> {
        self.tools
            .iter()
            .find(|(tool_name, _)| tool_name == name)
            .map(|(_, tool)| tool)
    }
}

/// Everything one agent run produced.
#[derive(Debug, Clone, Default)]
pub struct AgentRun {
    /// Non-empty text from each model call, in order.
    pub texts: Vec<String>,
    /// Every tool result, in the order the calls were issued.
    pub tool_results: Vec<ToolResult>,
    /// Number of model calls made.
    pub model_calls: usize,
    /// Number of tool rounds run.
    pub tool_rounds: usize,
    /// The final working message sequence.
    pub messages: Vec<Message>,
}

impl AgentRun {
    /// All model text concatenated.
    pub fn text(&self) -> String {
        self.texts.concat()
    }

    /// Tool results produced by the named tool.
    pub fn results_for<'a>(&'a self, tool_name: &'a str) -> impl Iterator<Item = &'a ToolResult> + 'a {
        self.tool_results
            .iter()
            .filter(move |result| result.tool_name == tool_name)
    }
}
