//! Content search via the Tavily search API.

use super::{search_parameters, LinkResult, ResultRecord, ToolArguments, ToolInvoker, WEB_SEARCH_TOOL};
use crate::config::{Settings, WebSearchSettings};
use crate::error::{HealthbotError, Result};
use crate::llm::ToolSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Options for a content search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentSearchOptions {
    pub max_results: usize,
}

impl From<&WebSearchSettings> for ContentSearchOptions {
    fn from(settings: &WebSearchSettings) -> Self {
        Self {
            max_results: settings.max_results,
        }
    }
}

/// Trait for web/content search providers.
#[async_trait]
pub trait ContentSearch: Send + Sync {
    async fn search(&self, query: &str, options: &ContentSearchOptions) -> Result<Vec<LinkResult>>;
}

/// Tavily search API client.
pub struct TavilySearch {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Deserialize)]
struct TavilyHit {
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    title: Option<String>,
}

impl TavilySearch {
    /// Create a client from settings. A missing API key is reported per search.
    pub fn new(settings: &WebSearchSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key: Settings::api_key(&settings.api_key_env),
        })
    }

    fn into_links(response: TavilyResponse, max_results: usize) -> Vec<LinkResult> {
        response
            .results
            .into_iter()
            .filter(|hit| !hit.url.is_empty())
            .take(max_results)
            .map(|hit| LinkResult {
                url: hit.url,
                content: hit.content,
                title: hit.title.filter(|t| !t.is_empty()),
            })
            .collect()
    }
}

#[async_trait]
impl ContentSearch for TavilySearch {
    #[instrument(skip(self, options))]
    async fn search(&self, query: &str, options: &ContentSearchOptions) -> Result<Vec<LinkResult>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| HealthbotError::Config("Tavily API key is not set".to_string()))?;

        let response = self
            .http
            .post(format!("{}/search", self.api_base))
            .json(&TavilyRequest {
                api_key,
                query,
                max_results: options.max_results,
                search_depth: "basic",
            })
            .send()
            .await?
            .error_for_status()?;

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| HealthbotError::Search(format!("Unexpected Tavily response: {}", e)))?;

        let links = Self::into_links(body, options.max_results);
        debug!("Tavily returned {} links", links.len());
        Ok(links)
    }
}

/// The content search tool offered to the answering agent.
pub struct ContentSearchTool {
    provider: Arc<dyn ContentSearch>,
    options: ContentSearchOptions,
}

impl ContentSearchTool {
    pub fn new(provider: Arc<dyn ContentSearch>, options: ContentSearchOptions) -> Self {
        Self { provider, options }
    }
}

#[async_trait]
impl ToolInvoker for ContentSearchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: WEB_SEARCH_TOOL.to_string(),
            description: "A search engine optimized for comprehensive, accurate, and trusted results. \
                Useful for answering questions about current medical information. \
                Input should be a search query."
                .to_string(),
            parameters: search_parameters("The search query", self.options.max_results),
        }
    }

    async fn invoke(&self, args: &ToolArguments) -> Vec<ResultRecord> {
        let options = ContentSearchOptions {
            max_results: args.max_results.unwrap_or(self.options.max_results),
        };

        match self.provider.search(&args.query, &options).await {
            Ok(links) => links.into_iter().map(ResultRecord::Link).collect(),
            Err(e) => {
                warn!("{} failed for '{}': {}", WEB_SEARCH_TOOL, args.query, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSearch;

    #[async_trait]
    impl ContentSearch for FailingSearch {
        async fn search(&self, _query: &str, _options: &ContentSearchOptions) -> Result<Vec<LinkResult>> {
            Err(HealthbotError::Search("upstream unavailable".to_string()))
        }
    }

    #[test]
    fn test_parse_tavily_response() {
        let body = r#"{
            "query": "migraine causes",
            "results": [
                {"title": "Migraine", "url": "https://www.nhs.uk/conditions/migraine/", "content": "Migraines are thought to be caused by...", "score": 0.97},
                {"title": "Empty", "url": "", "content": "no url"},
                {"title": "Mayo", "url": "https://www.mayoclinic.org/migraine", "content": "Triggers include...", "score": 0.91}
            ]
        }"#;

        let response: TavilyResponse = serde_json::from_str(body).unwrap();
        let links = TavilySearch::into_links(response, 5);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://www.nhs.uk/conditions/migraine/");
        assert_eq!(links[0].title.as_deref(), Some("Migraine"));
        assert_eq!(links[1].content, "Triggers include...");
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_empty() {
        let tool = ContentSearchTool::new(Arc::new(FailingSearch), ContentSearchOptions { max_results: 5 });
        let args = ToolArguments {
            query: "migraine".to_string(),
            max_results: None,
        };
        assert!(tool.invoke(&args).await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_api_key_degrades_to_empty() {
        let settings = WebSearchSettings {
            api_key_env: "HEALTHBOT_TEST_UNSET_TAVILY_KEY".to_string(),
            ..WebSearchSettings::default()
        };
        let provider = TavilySearch::new(&settings).unwrap();
        let tool = ContentSearchTool::new(Arc::new(provider), ContentSearchOptions::from(&settings));

        let args = ToolArguments {
            query: "flu symptoms".to_string(),
            max_results: Some(2),
        };
        assert!(tool.invoke(&args).await.is_empty());
    }

    #[test]
    fn test_spec_advertises_query() {
        let tool = ContentSearchTool::new(Arc::new(FailingSearch), ContentSearchOptions { max_results: 5 });
        let spec = tool.spec();
        assert_eq!(spec.name, WEB_SEARCH_TOOL);
        assert_eq!(spec.parameters["required"][0], "query");
    }
}
