//! Video search tool and helpers for YouTube ids.

use super::{
    search_parameters, DuckDuckGoVideoSearch, ResultRecord, ToolArguments, ToolInvoker,
    YouTubeVideoSearch, VIDEO_SEARCH_TOOL,
};
use crate::config::{
    Resolution, SafeSearch, TimeLimit, VideoDuration, VideoProvider, VideoSearchSettings,
};
use crate::error::Result;
use crate::llm::ToolSpec;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// Options for a video search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSearchOptions {
    pub region: Option<String>,
    pub safe_search: SafeSearch,
    pub time_limit: Option<TimeLimit>,
    pub resolution: Option<Resolution>,
    pub duration: Option<VideoDuration>,
    pub max_results: usize,
}

impl From<&VideoSearchSettings> for VideoSearchOptions {
    fn from(settings: &VideoSearchSettings) -> Self {
        Self {
            region: settings.region.clone(),
            safe_search: settings.safe_search,
            time_limit: settings.time_limit,
            resolution: settings.resolution,
            duration: settings.duration,
            max_results: settings.max_results,
        }
    }
}

/// Trait for video search providers. Returns YouTube video ids.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search(&self, query: &str, options: &VideoSearchOptions) -> Result<Vec<String>>;
}

/// Create the configured video search backend.
pub fn create_video_search(settings: &VideoSearchSettings) -> Result<Arc<dyn VideoSearch>> {
    Ok(match settings.provider {
        VideoProvider::DuckDuckGo => Arc::new(DuckDuckGoVideoSearch::new(settings)?),
        VideoProvider::YouTube => Arc::new(YouTubeVideoSearch::new(settings)?),
    })
}

/// The video search tool offered to the media agent.
pub struct VideoSearchTool {
    provider: Arc<dyn VideoSearch>,
    options: VideoSearchOptions,
}

impl VideoSearchTool {
    pub fn new(provider: Arc<dyn VideoSearch>, options: VideoSearchOptions) -> Self {
        Self { provider, options }
    }
}

#[async_trait]
impl ToolInvoker for VideoSearchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: VIDEO_SEARCH_TOOL.to_string(),
            description: "Use this to get youtube videos related to the user's health question."
                .to_string(),
            parameters: search_parameters(
                "What the videos should be about",
                self.options.max_results,
            ),
        }
    }

    async fn invoke(&self, args: &ToolArguments) -> Vec<ResultRecord> {
        let mut options = self.options.clone();
        if let Some(max_results) = args.max_results {
            options.max_results = max_results;
        }

        match self.provider.search(&args.query, &options).await {
            Ok(videos) => videos.into_iter().map(ResultRecord::Video).collect(),
            Err(e) => {
                warn!("{} failed for '{}': {}", VIDEO_SEARCH_TOOL, args.query, e);
                Vec::new()
            }
        }
    }
}

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^
            (?:https?://)?
            (?:www\.|m\.)?
            (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/)
            ([a-zA-Z0-9_-]{11})
            (?:[&?\#].*)?
            $
        ",
        )
        .expect("valid video id regex")
    })
}

/// Extract the video id from a YouTube watch, short or embed URL.
pub fn youtube_video_id(url: &str) -> Option<String> {
    video_id_regex()
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Watch URL for a video id (URLs are passed through).
pub fn youtube_watch_url(video: &str) -> String {
    if video.contains("://") {
        video.to_string()
    } else {
        format!("https://www.youtube.com/watch?v={}", video)
    }
}

/// Embeddable player URL for a video id or URL.
pub fn youtube_embed_url(video: &str) -> String {
    match youtube_video_id(video) {
        Some(id) => format!("https://www.youtube.com/embed/{}", id),
        None if !video.contains("://") => format!("https://www.youtube.com/embed/{}", video),
        None => video.trim_end_matches("?autoplay=1").to_string(),
    }
}
