//! Keyless video search through DuckDuckGo's HTML endpoint.
//!
//! Runs a web search for the query and keeps only YouTube watch links.
//! Resolution and duration filters are not supported here and are ignored.

use super::{youtube_video_id, VideoSearch, VideoSearchOptions};
use crate::config::{SafeSearch, TimeLimit, VideoSearchSettings};
use crate::error::{HealthbotError, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// DuckDuckGo-backed video search.
pub struct DuckDuckGoVideoSearch {
    http: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoVideoSearch {
    pub fn new(settings: &VideoSearchSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()?;

        let endpoint = if settings.api_base.is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            settings.api_base.clone()
        };

        Ok(Self { http, endpoint })
    }

    /// Form parameters for the search request.
    fn form(query: &str, options: &VideoSearchOptions) -> Vec<(&'static str, String)> {
        let mut form = vec![
            (
                "q",
                format!(
                    "YouTube videos related to the following content:\n{}",
                    query
                ),
            ),
            ("kl", options.region.clone().unwrap_or_else(|| "wt-wt".to_string())),
            (
                "kp",
                match options.safe_search {
                    SafeSearch::Strict => "1",
                    SafeSearch::Moderate => "-1",
                    SafeSearch::Off => "-2",
                }
                .to_string(),
            ),
        ];

        if let Some(limit) = options.time_limit {
            let df = match limit {
                TimeLimit::Day => "d",
                TimeLimit::Week => "w",
                TimeLimit::Month => "m",
                TimeLimit::Year => "y",
            };
            form.push(("df", df.to_string()));
        }

        form
    }
}

/// Resolve a result link, unwrapping DuckDuckGo's `/l/?uddg=` redirects.
fn resolve_link(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    let parsed = url::Url::parse(&absolute).ok()?;
    if parsed.domain().is_some_and(|d| d.ends_with("duckduckgo.com")) && parsed.path() == "/l/" {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned());
    }

    Some(absolute)
}

/// Extract YouTube watch-link video ids from the result titles of a page, in page order.
pub(crate) fn extract_video_ids(html: &str, max_results: usize) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    if max_results == 0 {
        return ids;
    }

    let Ok(selector) = Selector::parse("a.result__a") else {
        return ids;
    };
    let document = Html::parse_document(html);

    for anchor in document.select(&selector) {
        let Some(link) = anchor.value().attr("href").and_then(resolve_link) else {
            continue;
        };
        if !link.starts_with("https://www.youtube.com/watch?v=") {
            continue;
        }
        if let Some(id) = youtube_video_id(&link) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.len() >= max_results {
            break;
        }
    }

    ids
}

#[async_trait]
impl VideoSearch for DuckDuckGoVideoSearch {
    #[instrument(skip(self, options))]
    async fn search(&self, query: &str, options: &VideoSearchOptions) -> Result<Vec<String>> {
        let html = self
            .http
            .post(&self.endpoint)
            .form(&Self::form(query, options))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if html.trim().is_empty() {
            return Err(HealthbotError::Search("Empty response from DuckDuckGo".to_string()));
        }

        let ids = extract_video_ids(&html, options.max_results);
        debug!("DuckDuckGo returned {} videos", ids.len());
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <div class="result results_links results_links_deep web-result">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3DhizBdM1Ob68&amp;rut=abc">CPR Training</a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.redcross.org%2Fcpr&amp;rut=def">Red Cross</a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="https://www.youtube.com/watch?v=cosVBV96E2g">Hands-only CPR</a>
          <a class="result__url" href="https://www.youtube.com/watch?v=cosVBV96E2g">youtube.com</a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="https://www.youtube.com/@RedCross">Channel</a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dn5hP4DIBCEE%26t%3D10s&amp;rut=ghi">Infant CPR</a>
        </div>
    "#;

    #[test]
    fn test_extract_video_ids_from_results() {
        let ids = extract_video_ids(RESULTS_PAGE, 5);
        assert_eq!(ids, vec!["hizBdM1Ob68", "cosVBV96E2g", "n5hP4DIBCEE"]);
    }

    #[test]
    fn test_extract_respects_max_results() {
        assert_eq!(extract_video_ids(RESULTS_PAGE, 1), vec!["hizBdM1Ob68"]);
    }

    #[test]
    fn test_zero_max_results_yields_nothing() {
        assert!(extract_video_ids(RESULTS_PAGE, 0).is_empty());
    }

    #[test]
    fn test_ignores_links_outside_result_titles() {
        let page = r#"
            <a class="result__url" href="https://www.youtube.com/watch?v=cosVBV96E2g">youtube.com</a>
            <a class='result__a' href='https://www.youtube.com/watch?v=hizBdM1Ob68'>Single quoted</a>
            <a href="https://www.youtube.com/watch?v=n5hP4DIBCEE">Sidebar</a>
        "#;
        assert_eq!(extract_video_ids(page, 5), vec!["hizBdM1Ob68"]);
    }

    #[test]
    fn test_no_videos_in_page() {
        assert!(extract_video_ids("<html><body>No results.</body></html>", 5).is_empty());
    }

    #[test]
    fn test_form_parameters() {
        let options = VideoSearchOptions {
            region: Some("us-en".to_string()),
            safe_search: SafeSearch::Strict,
            time_limit: Some(TimeLimit::Week),
            resolution: None,
            duration: None,
            max_results: 5,
        };
        let form = DuckDuckGoVideoSearch::form("CPR", &options);
        assert!(form[0].1.ends_with("\nCPR"));
        assert!(form.contains(&("kl", "us-en".to_string())));
        assert!(form.contains(&("kp", "1".to_string())));
        assert!(form.contains(&("df", "w".to_string())));
    }
}
