//! Video search through the YouTube Data API v3.

use super::{VideoSearch, VideoSearchOptions};
use crate::config::{Resolution, SafeSearch, Settings, VideoDuration, VideoSearchSettings};
use crate::error::{HealthbotError, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3";
/// Largest page `search.list` accepts for `maxResults`.
const MAX_PAGE_SIZE: usize = 50;

/// YouTube Data API search client.
pub struct YouTubeVideoSearch {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    #[serde(default)]
    video_id: Option<String>,
}

impl YouTubeVideoSearch {
    pub fn new(settings: &VideoSearchSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        let endpoint = if settings.api_base.is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            settings.api_base.trim_end_matches('/').to_string()
        };

        Ok(Self {
            http,
            endpoint,
            api_key: Settings::api_key(&settings.api_key_env),
        })
    }

    /// Query parameters for `search.list`.
    fn query_params(query: &str, options: &VideoSearchOptions, api_key: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("type", "video".to_string()),
            ("q", query.to_string()),
            ("maxResults", options.max_results.min(MAX_PAGE_SIZE).to_string()),
            ("key", api_key.to_string()),
            (
                "safeSearch",
                match options.safe_search {
                    SafeSearch::Strict => "strict",
                    SafeSearch::Moderate => "moderate",
                    SafeSearch::Off => "none",
                }
                .to_string(),
            ),
        ];

        if let Some(region) = options.region.as_deref().and_then(region_code) {
            params.push(("regionCode", region));
        }
        if let Some(limit) = options.time_limit {
            let after = Utc::now() - chrono::Duration::days(limit.days());
            params.push(("publishedAfter", after.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(resolution) = options.resolution {
            let definition = match resolution {
                Resolution::High => "high",
                Resolution::Standard => "standard",
            };
            params.push(("videoDefinition", definition.to_string()));
        }
        if let Some(duration) = options.duration {
            let duration = match duration {
                VideoDuration::Short => "short",
                VideoDuration::Medium => "medium",
                VideoDuration::Long => "long",
            };
            params.push(("videoDuration", duration.to_string()));
        }

        params
    }

    fn into_ids(response: SearchListResponse, max_results: usize) -> Vec<String> {
        response
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .take(max_results)
            .collect()
    }
}

/// ISO country code from a region such as "US" or "us-en". "wt-wt" means no region.
fn region_code(region: &str) -> Option<String> {
    let country = region.split('-').next()?.trim();
    if country.eq_ignore_ascii_case("wt") {
        return None;
    }
    if country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(country.to_ascii_uppercase())
    } else {
        None
    }
}

#[async_trait]
impl VideoSearch for YouTubeVideoSearch {
    #[instrument(skip(self, options))]
    async fn search(&self, query: &str, options: &VideoSearchOptions) -> Result<Vec<String>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| HealthbotError::Config("YouTube API key is not set".to_string()))?;
        if options.max_results == 0 {
            return Ok(Vec::new());
        }

        let response: SearchListResponse = self
            .http
            .get(format!("{}/search", self.endpoint))
            .query(&Self::query_params(query, options, api_key))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| HealthbotError::Search(format!("Unexpected YouTube response: {}", e)))?;

        let ids = Self::into_ids(response, options.max_results);
        debug!("YouTube returned {} videos", ids.len());
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeLimit;

    #[test]
    fn test_parse_search_list() {
        let body = r#"{
            "kind": "youtube#searchListResponse",
            "items": [
                {"kind": "youtube#searchResult", "id": {"kind": "youtube#video", "videoId": "hizBdM1Ob68"}},
                {"kind": "youtube#searchResult", "id": {"kind": "youtube#channel", "channelId": "UC123"}},
                {"kind": "youtube#searchResult", "id": {"kind": "youtube#video", "videoId": "cosVBV96E2g"}}
            ]
        }"#;
        let response: SearchListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(YouTubeVideoSearch::into_ids(response, 5), vec!["hizBdM1Ob68", "cosVBV96E2g"]);
    }

    #[test]
    fn test_ids_capped_at_max_results() {
        let body = r#"{"items": [
            {"id": {"videoId": "hizBdM1Ob68"}},
            {"id": {"videoId": "cosVBV96E2g"}},
            {"id": {"videoId": "n5hP4DIBCEE"}}
        ]}"#;
        let response: SearchListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(YouTubeVideoSearch::into_ids(response, 1), vec!["hizBdM1Ob68"]);
    }

    #[test]
    fn test_max_results_clamped_to_page_size() {
        let options = VideoSearchOptions {
            region: None,
            safe_search: SafeSearch::Moderate,
            time_limit: None,
            resolution: None,
            duration: None,
            max_results: 500,
        };
        let params = YouTubeVideoSearch::query_params("CPR", &options, "key");
        assert!(params.contains(&("maxResults", "50".to_string())));
    }

    #[test]
    fn test_query_params_map_options() {
        let options = VideoSearchOptions {
            region: Some("us-en".to_string()),
            safe_search: SafeSearch::Off,
            time_limit: Some(TimeLimit::Year),
            resolution: Some(Resolution::High),
            duration: Some(VideoDuration::Medium),
            max_results: 3,
        };
        let params = YouTubeVideoSearch::query_params("CPR", &options, "key");

        assert!(params.contains(&("regionCode", "US".to_string())));
        assert!(params.contains(&("safeSearch", "none".to_string())));
        assert!(params.contains(&("videoDefinition", "high".to_string())));
        assert!(params.contains(&("videoDuration", "medium".to_string())));
        assert!(params.contains(&("maxResults", "3".to_string())));
        assert!(params.iter().any(|(k, _)| *k == "publishedAfter"));
    }

    #[test]
    fn test_region_code() {
        assert_eq!(region_code("GB"), Some("GB".to_string()));
        assert_eq!(region_code("wt-wt"), None);
        assert_eq!(region_code(""), None);
    }
}
