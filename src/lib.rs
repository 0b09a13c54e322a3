// Atlas Research - plan, search and synthesize answers to research questions

pub mod config;
pub mod models;
pub mod types;
pub mod agents;
pub mod llm;
pub mod search;    // Google Custom Search client
pub mod tui;       // Terminal User Interface
pub mod utils;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use agents::{PipelineEvent, PipelineFailure, PipelineStage, ResearchPipeline};
pub use config::Config;
pub use models::ResearchState;
