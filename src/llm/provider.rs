use crate::config::LLMConfig;
use crate::types::{LLMError, LLMMessage, LLMRequest, LLMResponse};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> Result<LLMResponse, LLMError>;
}

/// Generation settings applied to every request issued through an [`LLM`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl From<&LLMConfig> for GenerationConfig {
    fn from(config: &LLMConfig) -> Self {
        Self {
            model: config.model_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
        }
    }
}

/// Shared handle to a language model adapter with a fixed generation config.
#[derive(Clone)]
pub struct LLM {
    adapter: Arc<dyn LLMAdapter>,
    generation: GenerationConfig,
}

impl LLM {
    pub fn new(adapter: Arc<dyn LLMAdapter>, generation: GenerationConfig) -> Self {
        Self { adapter, generation }
    }

    /// Build the Gemini-backed handle from configuration.
    pub fn from_config(config: &LLMConfig) -> Result<Self, LLMError> {
        let adapter = crate::llm::google::GoogleAdapter::from_config(config)?;
        Ok(Self::new(Arc::new(adapter), GenerationConfig::from(config)))
    }

    pub fn model(&self) -> &str {
        &self.generation.model
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> Result<LLMResponse, LLMError> {
        self.adapter.create_chat_completion(request).await
    }

    /// Single-turn completion: one user prompt plus an optional system instruction.
    pub async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String, LLMError> {
        let request = LLMRequest {
            model: self.generation.model.clone(),
            messages: vec![LLMMessage::user(prompt)],
            max_tokens: self.generation.max_tokens,
            temperature: self.generation.temperature,
            system_instruction: system.map(str::to_string),
        };
        let response = self.create_chat_completion(&request).await?;
        Ok(response.content)
    }
}
