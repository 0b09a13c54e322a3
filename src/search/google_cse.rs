//! Google Custom Search Client
//!
//! Thin wrapper over the Custom Search JSON API
//! (`GET /customsearch/v1?key=..&cx=..&q=..&num=..`). The API returns at most
//! ten results per request, so `num` is clamped to `1..=10`.

use crate::config::SearchConfig;
use crate::search::{SearchHit, SearchProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Search API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse search results: {0}")]
    ParseError(String),
}

#[derive(Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Deserialize)]
struct CseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Deserialize)]
struct CseErrorResponse {
    error: CseError,
}

#[derive(Deserialize)]
struct CseError {
    message: String,
}

pub struct GoogleSearchClient {
    client: Client,
    api_key: String,
    cse_id: String,
    base_url: String,
}

impl GoogleSearchClient {
    pub fn new(api_key: &str, cse_id: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            cse_id: cse_id.to_string(),
            base_url: base_url.to_string(),
        }
    }

    pub fn from_config(api_key: &str, cse_id: &str, config: &SearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SearchError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            cse_id: cse_id.to_string(),
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let num = max_results.clamp(1, 10);
        info!(query = %query, num, "Searching Google Custom Search");

        let num_param = num.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("num", num_param.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<CseErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: CseResponse = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        let hits: Vec<SearchHit> = body
            .items
            .into_iter()
            .take(num)
            .map(|item| SearchHit {
                title: item.title,
                snippet: item.snippet,
                url: item.link,
            })
            .collect();

        debug!(count = hits.len(), "Custom Search completed");
        Ok(hits)
    }

    fn name(&self) -> &str {
        "google-custom-search"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_search_maps_items() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "s-key".into()),
                Matcher::UrlEncoded("cx".into(), "cx-1".into()),
                Matcher::UrlEncoded("q".into(), "impact of AI on jobs".into()),
                Matcher::UrlEncoded("num".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "items": [
                        {"title": "Jobs report", "link": "https://example.com/a", "snippet": "Automation shifts tasks"},
                        {"title": "Labor study", "link": "https://example.com/b", "snippet": "Mixed effects"},
                        {"title": "Extra", "link": "https://example.com/c", "snippet": "Dropped"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GoogleSearchClient::new("s-key", "cx-1", &server.url());
        let hits = client.search("impact of AI on jobs", 2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            hits,
            vec![
                SearchHit::new("Jobs report", "Automation shifts tasks", "https://example.com/a"),
                SearchHit::new("Labor study", "Mixed effects", "https://example.com/b"),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_items_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"searchInformation": {"totalResults": "0"}}"#)
            .create_async()
            .await;

        let client = GoogleSearchClient::new("s-key", "cx-1", &server.url());
        let hits = client.search("obscure", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_num_is_clamped() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("num".into(), "10".into()))
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let client = GoogleSearchClient::new("s-key", "cx-1", &server.url());
        client.search("anything", 50).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_quota_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error": {"code": 403, "message": "Daily Limit Exceeded"}}"#)
            .create_async()
            .await;

        let client = GoogleSearchClient::new("s-key", "cx-1", &server.url());
        let err = client.search("anything", 5).await.unwrap_err();
        assert!(matches!(
            err,
            SearchError::Api { status: 403, ref message } if message == "Daily Limit Exceeded"
        ));
    }
}
