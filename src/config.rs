use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_SEARCH_BASE: &str = "https://www.googleapis.com/customsearch/v1";

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "atlas.toml";

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub api_key: String,
    pub model_name: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub cse_id: Option<String>,
    pub base_url: String,
    pub max_results: usize,
    pub concurrency: usize,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_sub_questions: usize,
    /// `None` when the whole-run deadline is disabled.
    pub timeout: Option<Duration>,
}

/// Flat view of every recognised key. Environment variables map onto these
/// fields by lowercasing their names, so `GOOGLE_CSE_ID` fills `google_cse_id`.
#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default)]
    google_api_key: String,
    google_model_name: String,
    google_api_base_url: String,
    google_search_api_key: Option<String>,
    google_cse_id: Option<String>,
    google_search_base_url: String,
    atlas_temperature: Option<f32>,
    atlas_max_output_tokens: Option<u32>,
    atlas_max_sub_questions: usize,
    atlas_search_results: usize,
    atlas_search_concurrency: usize,
    atlas_llm_timeout_secs: u64,
    atlas_search_timeout_secs: u64,
    atlas_pipeline_timeout_secs: u64,
}

impl Config {
    /// Load from `.env`, `atlas.toml` (if present) and the process environment.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load configuration, layering defaults, an optional TOML file and the
    /// process environment (highest precedence).
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = with_defaults(config::Config::builder())?;

        match config_file {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                builder = builder.add_source(
                    config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
                );
            }
        }

        let settings = builder
            .add_source(config::Environment::default())
            .build()
            .context("Failed to read configuration")?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: config::Config) -> Result<Self> {
        let raw: RawSettings = settings
            .try_deserialize()
            .context("Invalid configuration value")?;

        let search_api_key = raw.google_search_api_key.filter(|k| !k.trim().is_empty());
        let cse_id = raw.google_cse_id.filter(|id| !id.trim().is_empty());

        Ok(Self {
            llm: LLMConfig {
                api_key: raw.google_api_key.trim().to_string(),
                model_name: raw.google_model_name,
                base_url: raw.google_api_base_url,
                temperature: raw.atlas_temperature,
                max_output_tokens: raw.atlas_max_output_tokens,
                request_timeout: Duration::from_secs(raw.atlas_llm_timeout_secs),
            },
            search: SearchConfig {
                api_key: search_api_key,
                cse_id,
                base_url: raw.google_search_base_url,
                max_results: raw.atlas_search_results.clamp(1, 10),
                concurrency: raw.atlas_search_concurrency.max(1),
                request_timeout: Duration::from_secs(raw.atlas_search_timeout_secs),
            },
            pipeline: PipelineConfig {
                max_sub_questions: raw.atlas_max_sub_questions.max(1),
                timeout: match raw.atlas_pipeline_timeout_secs {
                    0 => None,
                    secs => Some(Duration::from_secs(secs)),
                },
            },
        })
    }

    /// Reject configurations that cannot make any LLM call.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.is_empty() {
            bail!(
                "Missing GOOGLE_API_KEY. Set it in your .env file or environment variables."
            );
        }
        if self.llm.model_name.trim().is_empty() {
            bail!("GOOGLE_MODEL_NAME must not be empty");
        }
        Ok(())
    }
}

impl SearchConfig {
    /// The (API key, engine id) pair, only when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.api_key, &self.cse_id) {
            (Some(key), Some(cx)) => Some((key.as_str(), cx.as_str())),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials().is_some()
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(builder
        .set_default("google_model_name", DEFAULT_MODEL)?
        .set_default("google_api_base_url", DEFAULT_GOOGLE_API_BASE)?
        .set_default("google_search_base_url", DEFAULT_SEARCH_BASE)?
        .set_default("atlas_max_sub_questions", 5)?
        .set_default("atlas_search_results", 5)?
        .set_default("atlas_search_concurrency", 1)?
        .set_default("atlas_llm_timeout_secs", 120)?
        .set_default("atlas_search_timeout_secs", 20)?
        .set_default("atlas_pipeline_timeout_secs", 600)?)
}
