use crate::search::SearchHit;
use serde::Serialize;
use std::collections::HashMap;

/// State threaded through one research run.
///
/// Each stage hands back a new state with exactly one more field filled:
/// `question` at creation, then `sub_questions`, then `search_results`,
/// then `report`. Fields are never overwritten once set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResearchState {
    question: String,
    sub_questions: Vec<String>,
    search_results: HashMap<String, Vec<SearchHit>>,
    report: Option<String>,
}

impl ResearchState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn sub_questions(&self) -> &[String] {
        &self.sub_questions
    }

    pub fn search_results(&self) -> &HashMap<String, Vec<SearchHit>> {
        &self.search_results
    }

    /// Results for one sub-question; empty if none were gathered.
    pub fn results_for(&self, sub_question: &str) -> &[SearchHit] {
        self.search_results
            .get(sub_question)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sub-questions paired with their results, in planner order.
    pub fn ordered_results(&self) -> impl Iterator<Item = (&str, &[SearchHit])> + '_ {
        self.sub_questions
            .iter()
            .map(move |sq| (sq.as_str(), self.results_for(sq)))
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    pub(crate) fn with_sub_questions(mut self, sub_questions: Vec<String>) -> Self {
        debug_assert!(self.sub_questions.is_empty(), "sub_questions already set");
        self.sub_questions = sub_questions;
        self
    }

    /// Keys that are not planned sub-questions are dropped.
    pub(crate) fn with_search_results(mut self, mut results: HashMap<String, Vec<SearchHit>>) -> Self {
        debug_assert!(self.search_results.is_empty(), "search_results already set");
        let planned = &self.sub_questions;
        results.retain(|key, _| planned.iter().any(|sq| sq == key));
        self.search_results = results;
        self
    }

    pub(crate) fn with_report(mut self, report: String) -> Self {
        debug_assert!(self.report.is_none(), "report already set");
        self.report = Some(report);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planned() -> ResearchState {
        ResearchState::new("What causes inflation?").with_sub_questions(vec![
            "What is demand-pull inflation?".to_string(),
            "What is cost-push inflation?".to_string(),
        ])
    }

    #[test]
    fn test_new_state_has_only_question() {
        let state = ResearchState::new("Q");
        assert_eq!(state.question(), "Q");
        assert!(state.sub_questions().is_empty());
        assert!(state.search_results().is_empty());
        assert!(state.report().is_none());
    }

    #[test]
    fn test_search_results_keys_are_subset_of_sub_questions() {
        let mut results = HashMap::new();
        results.insert(
            "What is cost-push inflation?".to_string(),
            vec![SearchHit::new("Cost push", "Supply shocks", "https://example.com")],
        );
        results.insert("Unplanned".to_string(), vec![]);

        let state = planned().with_search_results(results);
        assert_eq!(state.search_results().len(), 1);
        assert!(state.search_results().contains_key("What is cost-push inflation?"));
    }

    #[test]
    fn test_ordered_results_follow_planner_order() {
        let mut results = HashMap::new();
        results.insert("What is cost-push inflation?".to_string(), vec![]);
        results.insert("What is demand-pull inflation?".to_string(), vec![]);

        let state = planned().with_search_results(results);
        let order: Vec<&str> = state.ordered_results().map(|(sq, _)| sq).collect();
        assert_eq!(
            order,
            vec!["What is demand-pull inflation?", "What is cost-push inflation?"]
        );
    }

    #[test]
    fn test_report_is_terminal() {
        let state = planned().with_report("Final".to_string());
        assert_eq!(state.report(), Some("Final"));
        assert_eq!(state.question(), "What causes inflation?");
        assert_eq!(state.sub_questions().len(), 2);
    }
}
