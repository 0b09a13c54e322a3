// Type definitions and error taxonomy

use std::time::Duration;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMRequest {
    pub model: String,
    pub messages: Vec<LLMMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_instruction: Option<String>,
}

impl LLMRequest {
    /// Concatenated text of the system instruction and every message.
    pub fn prompt_text(&self) -> String {
        let mut text = self.system_instruction.clone().unwrap_or_default();
        for message in &self.messages {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&message.content);
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LLMMessage {
    pub role: String, // "user" or "model"
    pub content: String,
}

impl LLMMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub finish_reason: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Failure of a single language model call.
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("LLM API key not configured")]
    MissingApiKey,

    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse LLM response: {0}")]
    Parse(String),

    #[error("LLM returned no content: {0}")]
    NoContent(String),
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LLMError::Timeout
        } else {
            LLMError::Request(err.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    #[error("Research question is empty")]
    EmptyQuestion,

    #[error("Planner LLM call failed: {0}")]
    Llm(#[from] LLMError),

    #[error("Planner returned an empty response")]
    EmptyResponse,
}

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("Synthesizer LLM call failed: {0}")]
    Llm(#[from] LLMError),
}

/// Error that aborts a research run.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Research pipeline timed out after {0:?}")]
    Timeout(Duration),
}
