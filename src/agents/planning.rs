//! Planning Agent
//!
//! Decomposes the user's question into focused sub-questions with one LLM call.
//!
//! Parsing rule: the reply is read line by line. Leading bullet markers
//! (`-`, `*`, `•`, `+`) and list numbering (`1. `, `12) `, `(3)`) are stripped;
//! a leading year or decimal such as `2008:` or `1.5` is kept. Then
//! lines of two characters or fewer are dropped as noise, duplicates
//! (case-insensitive) are removed, and the list is capped at the configured
//! maximum. If nothing survives, the original question becomes the only
//! sub-question.

use crate::llm::LLM;
use crate::types::{LLMError, PlanningError};
use tracing::{info, warn};

const PLANNER_SYSTEM: &str = "You are a research planner.";

pub struct PlanningAgent {
    llm: LLM,
    max_sub_questions: usize,
}

impl PlanningAgent {
    pub fn new(llm: LLM, max_sub_questions: usize) -> Self {
        Self {
            llm,
            max_sub_questions: max_sub_questions.max(1),
        }
    }

    /// Produce between 1 and `max_sub_questions` sub-questions.
    pub async fn plan(&self, question: &str) -> Result<Vec<String>, PlanningError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PlanningError::EmptyQuestion);
        }

        let prompt = self.create_planning_prompt(question);
        let reply = match self.llm.complete(Some(PLANNER_SYSTEM), &prompt).await {
            Ok(reply) => reply,
            Err(LLMError::NoContent(reason)) => {
                warn!(reason = %reason, "Planner received no content");
                return Err(PlanningError::EmptyResponse);
            }
            Err(e) => return Err(e.into()),
        };

        if reply.trim().is_empty() {
            return Err(PlanningError::EmptyResponse);
        }

        let mut sub_questions = parse_sub_questions(&reply, self.max_sub_questions);
        if sub_questions.is_empty() {
            warn!("Planner output had no usable lines, falling back to the original question");
            sub_questions.push(question.to_string());
        }

        info!(model = self.llm.model(), count = sub_questions.len(), "Planning complete");
        Ok(sub_questions)
    }

    fn create_planning_prompt(&self, question: &str) -> String {
        let min = self.max_sub_questions.min(3);
        let range = if min == self.max_sub_questions {
            format!("{}", self.max_sub_questions)
        } else {
            format!("{}-{}", min, self.max_sub_questions)
        };

        format!(
            "Break the following question into {range} focused,\n\
             non-overlapping sub-questions that would help a search agent retrieve\n\
             the most relevant information.\n\n\
             Question:\n{question}\n\n\
             Return each sub-question as a separate line without numbering."
        )
    }
}

/// Split a planner reply into sub-questions.
pub fn parse_sub_questions(text: &str, max: usize) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut sub_questions = Vec::new();

    for line in text.lines() {
        let cleaned = strip_list_marker(line.trim());
        let cleaned = cleaned.trim_matches('*').trim();
        if cleaned.chars().count() <= 2 {
            continue;
        }

        let key = cleaned.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        sub_questions.push(cleaned.to_string());

        if sub_questions.len() == max {
            break;
        }
    }

    sub_questions
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start_matches(['-', '*', '•', '+']).trim_start();

    // "(3) ..."
    if let Some(rest) = line.strip_prefix('(') {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 {
            if let Some(after) = rest[digits..].strip_prefix(')') {
                return after.trim_start();
            }
        }
    }

    // "1. ..." / "12) ..."; a year or a decimal is part of the question
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if (1..=2).contains(&digits) {
        let rest = &line[digits..];
        if let Some(after) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            if after.starts_with(char::is_whitespace) {
                return after.trim_start();
            }
        }
    }

    line
}
