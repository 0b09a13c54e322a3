//! Synthesis Agent
//!
//! Writes the final report from the question, the planned sub-questions and
//! whatever search snippets were gathered. This is the last step of the
//! pipeline and its output is returned as-is.

use crate::llm::LLM;
use crate::models::ResearchState;
use crate::search::SearchHit;
use crate::types::SynthesisError;
use tracing::info;

/// Snippets embedded per sub-question.
const MAX_HITS_PER_SUB_QUESTION: usize = 5;

const REPORT_SYSTEM: &str = "You are a senior research analyst. Synthesize a clear, structured report\n\
answering the main question using the provided context. Cite URLs where useful.\n\
Use concise sections and bullet points when appropriate.";

const LLM_ONLY_SYSTEM: &str = "You are a senior research analyst. Answer the question using your internal knowledge. \
If sources are unavailable, don't fabricate citations.";

pub struct SynthesisAgent {
    llm: LLM,
}

impl SynthesisAgent {
    pub fn new(llm: LLM) -> Self {
        Self { llm }
    }

    /// One LLM call; the raw completion becomes the report.
    pub async fn synthesize(&self, state: &ResearchState) -> Result<String, SynthesisError> {
        let context = format_context(state);
        let system = if context.is_some() { REPORT_SYSTEM } else { LLM_ONLY_SYSTEM };
        let prompt = create_synthesis_prompt(state, context.as_deref());

        info!(
            sub_questions = state.sub_questions().len(),
            with_sources = context.is_some(),
            prompt_len = prompt.len(),
            "Synthesizing report"
        );

        let report = self.llm.complete(Some(system), &prompt).await?;
        info!(report_len = report.len(), "Report generated");
        Ok(report)
    }
}

/// Compose the user prompt handed to the model.
pub fn create_synthesis_prompt(state: &ResearchState, context: Option<&str>) -> String {
    let mut prompt = format!("Main Question:\n{}\n\n", state.question());

    if !state.sub_questions().is_empty() {
        prompt.push_str("Sub-questions:\n");
        for (i, sub_question) in state.sub_questions().iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, sub_question));
        }
        prompt.push('\n');
    }

    if let Some(context) = context {
        prompt.push_str("Context from searches:\n");
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Write the final report.");
    prompt
}

/// Search context grouped by sub-question in planner order, or `None` when
/// no sub-question has a citable hit.
pub fn format_context(state: &ResearchState) -> Option<String> {
    let chunks: Vec<String> = state
        .ordered_results()
        .filter_map(|(sub_question, hits)| format_chunk(sub_question, hits))
        .collect();

    if chunks.is_empty() {
        None
    } else {
        Some(chunks.join("\n\n"))
    }
}

fn format_chunk(sub_question: &str, hits: &[SearchHit]) -> Option<String> {
    let lines: Vec<String> = hits
        .iter()
        .take(MAX_HITS_PER_SUB_QUESTION)
        .filter(|hit| hit.is_citable())
        .map(format_citation)
        .collect();

    if lines.is_empty() {
        return None;
    }
    Some(format!("Sub-question: {}\n{}", sub_question, lines.join("\n")))
}

fn format_citation(hit: &SearchHit) -> String {
    if hit.url.is_empty() {
        format!("- {}: {}", hit.title, hit.snippet)
    } else {
        format!("- {}: {} ({})", hit.title, hit.snippet, hit.url)
    }
}
