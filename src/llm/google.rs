// Google Gemini adapter
// API Reference: https://ai.google.dev/api/generate-content

use crate::config::LLMConfig;
use crate::llm::provider::LLMAdapter;
use crate::types::{LLMError, LLMRequest, LLMResponse, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct GoogleAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

// Request types for the generateContent endpoint
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

// Response types
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
    status: Option<String>,
}

impl GoogleAdapter {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build an adapter whose HTTP client enforces the configured per-call deadline.
    pub fn from_config(config: &LLMConfig) -> Result<Self, LLMError> {
        if config.api_key.is_empty() {
            return Err(LLMError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LLMError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The v1beta API addresses models as `models/<id>`.
    pub fn normalize_model(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        }
    }

    fn endpoint_url(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.base_url, Self::normalize_model(model))
    }

    fn build_request(request: &LLMRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .map(|m| GeminiContent {
                role: Some(m.role.clone()),
                parts: vec![GeminiPart { text: m.content.clone() }],
            })
            .collect();

        let system_instruction = request.system_instruction.as_ref().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart { text: text.clone() }],
        });

        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }

    fn parse_response(response: GeminiResponse) -> Result<LLMResponse, LLMError> {
        let candidate = match response.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                let reason = response
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .map(|r| format!("prompt blocked ({})", r))
                    .unwrap_or_else(|| "no candidates in response".to_string());
                return Err(LLMError::NoContent(reason));
            }
        };

        let content: String = candidate
            .content
            .unwrap_or_default()
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();

        let finish_reason = candidate.finish_reason.unwrap_or_else(|| "STOP".to_string());
        if content.trim().is_empty() {
            return Err(LLMError::NoContent(format!("finish reason {}", finish_reason)));
        }

        let usage = response.usage_metadata.unwrap_or_default();
        Ok(LLMResponse {
            content,
            finish_reason,
            usage: TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            },
        })
    }
}

#[async_trait]
impl LLMAdapter for GoogleAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> Result<LLMResponse, LLMError> {
        let url = self.endpoint_url(&request.model);
        debug!(model = %request.model, url = %url, "Sending Gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_request(request))
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&error_text) {
                let message = match error_response.error.status {
                    Some(code) => format!("{} [{}]", error_response.error.message, code),
                    None => error_response.error.message,
                };
                return Err(LLMError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Err(LLMError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LLMError::Parse(e.to_string()))?;

        let parsed = Self::parse_response(gemini_response)?;
        debug!(
            finish_reason = %parsed.finish_reason,
            total_tokens = parsed.usage.total_tokens,
            "Gemini response received"
        );
        Ok(parsed)
    }
}
