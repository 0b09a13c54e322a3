//! Search Module
//!
//! Web search used to ground each sub-question in external sources.
//! The only real backend is the Google Custom Search JSON API; the pipeline
//! talks to it through the [`SearchProvider`] trait so tests can substitute
//! a stub.

pub mod google_cse;

pub use google_cse::{GoogleSearchClient, SearchError};

use crate::config::SearchConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One web search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, snippet: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: url.into(),
        }
    }

    /// A hit with neither title nor snippet carries nothing worth citing.
    pub fn is_citable(&self) -> bool {
        !self.title.trim().is_empty() || !self.snippet.trim().is_empty()
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query, returning at most `max_results` hits in ranking order.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;

    fn name(&self) -> &str;
}

/// Whether the search stage talks to a provider at all. Decided once when
/// the pipeline is built.
#[derive(Clone)]
pub enum SearchMode {
    Disabled,
    Enabled(Arc<dyn SearchProvider>),
}

impl SearchMode {
    /// Enabled only when both the API key and the engine id are configured.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        match config.credentials() {
            Some((api_key, cse_id)) => {
                let client = GoogleSearchClient::from_config(api_key, cse_id, config)?;
                Ok(SearchMode::Enabled(Arc::new(client)))
            }
            None => Ok(SearchMode::Disabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, SearchMode::Enabled(_))
    }
}

impl fmt::Debug for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Disabled => write!(f, "Disabled"),
            SearchMode::Enabled(provider) => write!(f, "Enabled({})", provider.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn search_config(api_key: Option<&str>, cse_id: Option<&str>) -> SearchConfig {
        SearchConfig {
            api_key: api_key.map(String::from),
            cse_id: cse_id.map(String::from),
            base_url: "http://localhost".to_string(),
            max_results: 5,
            concurrency: 1,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_mode_disabled_without_both_credentials() {
        let mode = SearchMode::from_config(&search_config(Some("key"), None)).unwrap();
        assert!(!mode.is_enabled());
        let mode = SearchMode::from_config(&search_config(None, Some("cx"))).unwrap();
        assert!(!mode.is_enabled());
    }

    #[test]
    fn test_mode_enabled_with_credentials() {
        let mode = SearchMode::from_config(&search_config(Some("key"), Some("cx"))).unwrap();
        assert!(mode.is_enabled());
        assert_eq!(format!("{:?}", mode), "Enabled(google-custom-search)");
    }

    #[test]
    fn test_citable_hits() {
        assert!(SearchHit::new("Title", "", "").is_citable());
        assert!(SearchHit::new("", "Snippet", "").is_citable());
        assert!(!SearchHit::new(" ", "", "https://example.com").is_citable());
    }
}
