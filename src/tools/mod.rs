//! Search tools the agents can call.
//!
//! Every tool sits behind [`ToolInvoker`], which never fails: provider errors,
//! bad responses and empty upstream results all come back as an empty record
//! list. This is the only place errors are collapsed to "no results".

mod content;
mod duckduckgo;
mod video;
mod youtube;

pub use content::{ContentSearch, ContentSearchOptions, ContentSearchTool, TavilySearch};
pub use duckduckgo::DuckDuckGoVideoSearch;
pub use video::{
    create_video_search, youtube_embed_url, youtube_video_id, youtube_watch_url, VideoSearch,
    VideoSearchOptions, VideoSearchTool,
};
pub use youtube::YouTubeVideoSearch;

use crate::error::{HealthbotError, Result};
use crate::llm::ToolSpec;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Name under which the content search tool is offered to the model.
pub const WEB_SEARCH_TOOL: &str = "web_search";

/// Name under which the video search tool is offered to the model.
pub const VIDEO_SEARCH_TOOL: &str = "video_search";

/// A web page hit from content search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkResult {
    pub url: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One record in a tool result payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultRecord {
    Link(LinkResult),
    /// A YouTube video id or URL.
    Video(String),
}

/// Arguments the model passes to a search tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolArguments {
    pub query: String,
    /// Falls back to the tool's configured default when absent or unusable.
    #[serde(default, deserialize_with = "lenient_count")]
    pub max_results: Option<usize>,
}

/// Accept counts sent as integers, integral floats or numeric strings.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let count = match &value {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    if count.is_none() {
        debug!("Ignoring unusable max_results {}, using the default", value);
    }
    Ok(count.map(|c| c as usize))
}

impl ToolArguments {
    /// Parse the raw JSON arguments of a tool call.
    pub fn parse(tool: &str, raw: &str) -> Result<Self> {
        let args: ToolArguments =
            serde_json::from_str(raw).map_err(|e| HealthbotError::MalformedToolCall {
                tool: tool.to_string(),
                reason: format!("invalid arguments: {}", e),
            })?;

        if args.query.trim().is_empty() {
            return Err(HealthbotError::MalformedToolCall {
                tool: tool.to_string(),
                reason: "empty query".to_string(),
            });
        }

        Ok(args)
    }
}

/// A single external capability the model can call.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// How the tool is advertised to the model.
    fn spec(&self) -> ToolSpec;

    /// Run the tool. Failures degrade to an empty list.
    async fn invoke(&self, args: &ToolArguments) -> Vec<ResultRecord>;
}

/// Serialize records into a tool result payload.
pub fn encode_records(records: &[ResultRecord]) -> String {
    serde_json::to_string(records).unwrap_or_else(|_| "[]".to_string())
}

/// Parse a tool result payload. Anything unparseable counts as no results.
pub fn parse_records(payload: &str) -> Vec<ResultRecord> {
    if payload.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str(payload) {
        Ok(records) => records,
        Err(e) => {
            debug!("Ignoring malformed tool payload: {}", e);
            Vec::new()
        }
    }
}

/// Link records from a content search payload.
pub fn parse_links(payload: &str) -> Vec<LinkResult> {
    parse_records(payload)
        .into_iter()
        .filter_map(|record| match record {
            ResultRecord::Link(link) => Some(link),
            ResultRecord::Video(_) => None,
        })
        .collect()
}

/// Video ids from a video search payload.
pub fn parse_videos(payload: &str) -> Vec<String> {
    parse_records(payload)
        .into_iter()
        .filter_map(|record| match record {
            ResultRecord::Video(video) => Some(video),
            ResultRecord::Link(_) => None,
        })
        .collect()
}

/// JSON schema shared by both search tools.
fn search_parameters(query_description: &str, default_results: usize) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": query_description
            },
            "max_results": {
                "type": "integer",
                "description": format!("Maximum number of results (default: {})", default_results),
                "default": default_results
            }
        },
        "required": ["query"]
    })
}
