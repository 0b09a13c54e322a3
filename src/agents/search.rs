//! Search Agent
//!
//! Gathers web results for every planned sub-question. A failed search only
//! empties that sub-question's results; it never fails the stage.

use crate::search::{SearchHit, SearchMode};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

pub struct SearchAgent {
    mode: SearchMode,
    max_results: usize,
    concurrency: usize,
}

impl SearchAgent {
    pub fn new(mode: SearchMode, max_results: usize, concurrency: usize) -> Self {
        Self {
            mode,
            max_results: max_results.max(1),
            concurrency: concurrency.max(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode.is_enabled()
    }

    /// Search every sub-question, reporting each result set through
    /// `on_result` in planner order. At most `concurrency` requests are in
    /// flight; with the default of one they run strictly one after another.
    pub async fn gather<F>(&self, sub_questions: &[String], mut on_result: F)
    where
        F: FnMut(&str, Vec<SearchHit>),
    {
        let provider = match &self.mode {
            SearchMode::Disabled => {
                debug!("Search disabled, running in LLM-only mode");
                return;
            }
            SearchMode::Enabled(provider) => provider.as_ref(),
        };

        let max_results = self.max_results;
        let mut searches = stream::iter(sub_questions.iter().cloned())
            .map(|sub_question: String| async move {
                let hits = match provider.search(&sub_question, max_results).await {
                    Ok(hits) => hits,
                    Err(e) => {
                        warn!(error = %e, sub_question = %sub_question, "Search failed, continuing without results");
                        Vec::new()
                    }
                };
                (sub_question, hits)
            })
            .buffered(self.concurrency);

        while let Some((sub_question, hits)) = searches.next().await {
            on_result(&sub_question, hits);
        }

        info!(count = sub_questions.len(), provider = provider.name(), "Searches complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedSearch;
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn collect(agent: &SearchAgent, sub_questions: &[String]) -> HashMap<String, Vec<SearchHit>> {
        let mut results = HashMap::new();
        agent
            .gather(sub_questions, |sub_question, hits| {
                results.insert(sub_question.to_string(), hits);
            })
            .await;
        results
    }

    fn sub_questions() -> Vec<String> {
        vec![
            "How does automation change tasks?".to_string(),
            "Which jobs are most exposed?".to_string(),
            "What new roles appear?".to_string(),
        ]
    }

    fn hit() -> SearchHit {
        SearchHit::new("AI and work", "Exposure varies by occupation", "https://example.org/ai-work")
    }

    #[tokio::test]
    async fn test_disabled_mode_makes_no_calls() {
        let agent = SearchAgent::new(SearchMode::Disabled, 5, 1);
        let results = collect(&agent, &sub_questions()).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_keys_match_sub_questions() {
        let provider = Arc::new(FixedSearch::new(vec![hit()]));
        let agent = SearchAgent::new(SearchMode::Enabled(provider.clone()), 5, 1);

        let results = collect(&agent, &sub_questions()).await;
        let mut keys: Vec<_> = results.keys().cloned().collect();
        keys.sort();
        let mut expected = sub_questions();
        expected.sort();
        assert_eq!(keys, expected);
        assert_eq!(provider.calls(), 3);
        assert_eq!(provider.queries(), sub_questions());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_others() {
        let provider = Arc::new(FixedSearch::new(vec![hit()]).failing_on("Which jobs are most exposed?"));
        let agent = SearchAgent::new(SearchMode::Enabled(provider.clone()), 5, 1);

        let results = collect(&agent, &sub_questions()).await;
        assert_eq!(results.len(), 3);
        assert!(results["Which jobs are most exposed?"].is_empty());
        assert_eq!(results["How does automation change tasks?"], vec![hit()]);
        assert_eq!(results["What new roles appear?"], vec![hit()]);
    }

    #[tokio::test]
    async fn test_concurrent_gather_keeps_planner_order() {
        let provider = Arc::new(FixedSearch::new(vec![hit()]));
        let agent = SearchAgent::new(SearchMode::Enabled(provider), 5, 3);

        let mut order = Vec::new();
        agent
            .gather(&sub_questions(), |sub_question, _| order.push(sub_question.to_string()))
            .await;
        assert_eq!(order, sub_questions());
    }
}
