//! Turn orchestrator for Healthbot.
//!
//! Runs the answering agent and the media agent over the same history and
//! folds what they produced into one assistant turn.

use crate::agent::{AfterTools, AgentRun, TurnAgent};
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::llm::{ChatModel, Message, OpenAIChatModel};
use crate::session::ChatSession;
use crate::tools::{
    create_video_search, parse_links, parse_videos, ContentSearchTool, LinkResult, TavilySearch,
    VideoSearchTool, VIDEO_SEARCH_TOOL, WEB_SEARCH_TOOL,
};
use crate::transcript::{history_messages, AssistantTurn, TurnPart};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The main orchestrator for a Healthbot turn.
pub struct AgentOrchestrator {
    primary: TurnAgent,
    media: Option<TurnAgent>,
}

impl AgentOrchestrator {
    /// Build both agents from configuration.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let system_prompt = prompts.system_prompt();

        info!(
            "Using model {} at {}",
            settings.model.model, settings.model.api_base
        );
        let model: Arc<dyn ChatModel> = Arc::new(OpenAIChatModel::new(&settings.model)?);

        let content_search = Arc::new(ContentSearchTool::new(
            Arc::new(TavilySearch::new(&settings.web_search)?),
            (&settings.web_search).into(),
        ));

        let primary = TurnAgent::new("primary", model.clone())
            .with_tool(content_search)
            .with_system_prompt(&system_prompt)
            .with_max_tool_rounds(settings.agent.max_tool_rounds);

        let media = if settings.agent.video_agent {
            info!("Video search via {}", settings.video_search.provider);
            let video_search = Arc::new(VideoSearchTool::new(
                create_video_search(&settings.video_search)?,
                (&settings.video_search).into(),
            ));
            Some(
                TurnAgent::new("media", model)
                    .with_tool(video_search)
                    .with_system_prompt(&system_prompt)
                    .with_after_tools(AfterTools::Finish),
            )
        } else {
            None
        };

        Ok(Self { primary, media })
    }

    /// Create an orchestrator from prebuilt agents.
    pub fn with_agents(primary: TurnAgent, media: Option<TurnAgent>) -> Self {
        Self { primary, media }
    }

    /// Run one turn over `history` (which already ends with the new user message).
    ///
    /// Only a failure of the answering agent is an error; the media agent
    /// degrades to "no videos".
    #[instrument(skip_all, fields(messages = history.len()))]
    pub async fn run_turn(&self, history: &[Message]) -> Result<AssistantTurn> {
        let primary = self.primary.run(history).await?;

        let mut turn = AssistantTurn::default();
        for text in &primary.texts {
            turn.push(TurnPart::text(text.as_str()));
        }

        let links = collect_links(&primary);
        if !links.is_empty() {
            turn.push(TurnPart::LinkResults { results: links });
        }

        if let Some(media) = &self.media {
            match media.run(history).await {
                Ok(run) => {
                    let videos = collect_videos(&run);
                    if !videos.is_empty() {
                        turn.push(TurnPart::VideoResults { videos });
                    }
                }
                Err(e) => warn!("[{}] failed, continuing without videos: {}", media.name(), e),
            }
        }

        if turn.is_empty() {
            turn.push(TurnPart::text(""));
        }

        info!("Assembled turn with {} part(s)", turn.parts().len());
        Ok(turn)
    }

    /// Answer a user message and record the exchange in the session transcript.
    ///
    /// Nothing is appended when the turn fails, so the message can be resubmitted.
    #[instrument(skip(self, session, text), fields(session = %session.id()))]
    pub async fn submit_user_message(
        &self,
        session: &mut ChatSession,
        text: &str,
    ) -> Result<AssistantTurn> {
        let mut history = history_messages(&session.transcript().await?);
        history.push(Message::user(text));

        let turn = self.run_turn(&history).await?;
        session.store().append_turn(text, &turn).await?;
        Ok(turn)
    }
}

fn collect_links(run: &AgentRun) -> Vec<LinkResult> {
    let mut seen = HashSet::new();
    run.results_for(WEB_SEARCH_TOOL)
        .flat_map(|result| parse_links(&result.payload))
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}

fn collect_videos(run: &AgentRun) -> Vec<String> {
    let mut seen = HashSet::new();
    run.results_for(VIDEO_SEARCH_TOOL)
        .flat_map(|result| parse_videos(&result.payload))
        .filter(|video| seen.insert(video.clone()))
        .collect()
}
