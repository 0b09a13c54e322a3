//! Agent System
//!
//! The three research stages and the pipeline that runs them:
//!
//! - **Planning Agent**: breaks the question into sub-questions
//! - **Search Agent**: gathers web snippets per sub-question (optional)
//! - **Synthesis Agent**: writes the final report
//!
//! ## Pipeline Overview
//!
//! ```text
//! Question
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Planning   │  → sub-questions
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Searching  │  → results per sub-question (no-op in LLM-only mode)
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │ Synthesizing│  → report
//! └─────────────┘
//!      │
//!      ▼
//!    Done
//! ```
//!
//! Any stage error ends the run in a failed state that still carries
//! everything computed so far.

pub mod planning;
pub mod search;
pub mod synthesis;

pub use planning::{parse_sub_questions, PlanningAgent};
pub use search::SearchAgent;
pub use synthesis::SynthesisAgent;

use crate::config::Config;
use crate::llm::LLM;
use crate::models::ResearchState;
use crate::search::{SearchHit, SearchMode};
use crate::types::ResearchError;
use anyhow::Context;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::{error, info, info_span, Instrument};

/// Position of a run in the linear stage machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PipelineStage {
    Planning,
    Searching,
    Synthesizing,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Planning => write!(f, "planning"),
            PipelineStage::Searching => write!(f, "searching"),
            PipelineStage::Synthesizing => write!(f, "synthesizing"),
            PipelineStage::Done => write!(f, "done"),
        }
    }
}

/// Progress notifications emitted while a run advances.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageChanged(PipelineStage),
    SubQuestionsPlanned(Vec<String>),
    SearchCompleted { sub_question: String, hits: Vec<SearchHit> },
    ReportReady(String),
    Failed { stage: PipelineStage, message: String },
}

/// Terminal failure of a run.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct PipelineFailure {
    /// Stage that was running when the error occurred.
    pub stage: PipelineStage,
    pub error: ResearchError,
    /// Everything computed before the failure.
    pub state: ResearchState,
}

pub struct ResearchPipeline {
    planner: PlanningAgent,
    searcher: SearchAgent,
    synthesizer: SynthesisAgent,
    timeout: Option<Duration>,
}

impl ResearchPipeline {
    pub fn new(
        planner: PlanningAgent,
        searcher: SearchAgent,
        synthesizer: SynthesisAgent,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            planner,
            searcher,
            synthesizer,
            timeout,
        }
    }

    /// Build the pipeline with explicit clients; nothing is read from the
    /// process environment after this point.
    pub fn with_clients(llm: LLM, search_mode: SearchMode, config: &Config) -> Self {
        Self::new(
            PlanningAgent::new(llm.clone(), config.pipeline.max_sub_questions),
            SearchAgent::new(search_mode, config.search.max_results, config.search.concurrency),
            SynthesisAgent::new(llm),
            config.pipeline.timeout,
        )
    }

    /// Build the Gemini and Custom Search clients from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let llm = LLM::from_config(&config.llm).context("Failed to create LLM client")?;
        let search_mode =
            SearchMode::from_config(&config.search).context("Failed to create search client")?;
        Ok(Self::with_clients(llm, search_mode, config))
    }

    pub fn search_enabled(&self) -> bool {
        self.searcher.is_enabled()
    }

    pub async fn run(&self, question: &str) -> Result<ResearchState, PipelineFailure> {
        self.execute(question, None).await
    }

    /// Like [`run`](Self::run), also streaming [`PipelineEvent`]s to `progress`.
    pub async fn run_with_progress(
        &self,
        question: &str,
        progress: UnboundedSender<PipelineEvent>,
    ) -> Result<ResearchState, PipelineFailure> {
        self.execute(question, Some(&progress)).await
    }

    async fn execute(
        &self,
        question: &str,
        progress: Option<&UnboundedSender<PipelineEvent>>,
    ) -> Result<ResearchState, PipelineFailure> {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("research", %run_id);
        self.execute_stages(question, progress).instrument(span).await
    }

    async fn execute_stages(
        &self,
        question: &str,
        progress: Option<&UnboundedSender<PipelineEvent>>,
    ) -> Result<ResearchState, PipelineFailure> {
        let started = Instant::now();
        let deadline = self.timeout.map(|t| started + t);
        info!(question_len = question.len(), search_enabled = self.search_enabled(), "Starting research pipeline");

        let state = ResearchState::new(question.trim());

        // Planning
        emit(progress, PipelineEvent::StageChanged(PipelineStage::Planning));
        let sub_questions = match self.bounded(deadline, self.planner.plan(state.question())).await {
            Ok(sub_questions) => sub_questions,
            Err(error) => return Err(fail(progress, PipelineStage::Planning, error, state)),
        };
        emit(progress, PipelineEvent::SubQuestionsPlanned(sub_questions.clone()));
        let state = state.with_sub_questions(sub_questions);

        // Searching
        emit(progress, PipelineEvent::StageChanged(PipelineStage::Searching));
        let mut gathered = HashMap::new();
        let search = self.searcher.gather(state.sub_questions(), |sub_question, hits| {
            emit(
                progress,
                PipelineEvent::SearchCompleted {
                    sub_question: sub_question.to_string(),
                    hits: hits.clone(),
                },
            );
            gathered.insert(sub_question.to_string(), hits);
        });
        let search_outcome = self.bounded(deadline, async {
            search.await;
            Ok::<(), ResearchError>(())
        })
        .await;
        let state = state.with_search_results(gathered);
        if let Err(error) = search_outcome {
            return Err(fail(progress, PipelineStage::Searching, error, state));
        }

        // Synthesizing
        emit(progress, PipelineEvent::StageChanged(PipelineStage::Synthesizing));
        let report = match self.bounded(deadline, self.synthesizer.synthesize(&state)).await {
            Ok(report) => report,
            Err(error) => return Err(fail(progress, PipelineStage::Synthesizing, error, state)),
        };
        let state = state.with_report(report.clone());

        emit(progress, PipelineEvent::ReportReady(report));
        emit(progress, PipelineEvent::StageChanged(PipelineStage::Done));
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Research pipeline complete");
        Ok(state)
    }

    /// Run a stage future against the whole-run deadline.
    async fn bounded<T, E, F>(&self, deadline: Option<Instant>, stage: F) -> Result<T, ResearchError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ResearchError>,
    {
        match (deadline, self.timeout) {
            (Some(deadline), Some(limit)) => match tokio::time::timeout_at(deadline, stage).await {
                Ok(result) => result.map_err(Into::into),
                Err(_) => Err(ResearchError::Timeout(limit)),
            },
            _ => stage.await.map_err(Into::into),
        }
    }
}

fn emit(progress: Option<&UnboundedSender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = progress {
        // A closed receiver only means nobody is watching anymore.
        tx.send(event).ok();
    }
}

fn fail(
    progress: Option<&UnboundedSender<PipelineEvent>>,
    stage: PipelineStage,
    error: ResearchError,
    state: ResearchState,
) -> PipelineFailure {
    error!(stage = %stage, error = %error, "Research pipeline failed");
    emit(
        progress,
        PipelineEvent::Failed {
            stage,
            message: error.to_string(),
        },
    );
    PipelineFailure { stage, error, state }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedSearch, ScriptedLLM};
    use crate::types::{PlanningError, SynthesisError};
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tokio_test::{assert_err, assert_ok};

    const PLAN_REPLY: &str = "What is the first facet?\nWhat is the second facet?\nWhat is the third facet?";

    fn pipeline(llm: &Arc<ScriptedLLM>, mode: SearchMode) -> ResearchPipeline {
        ResearchPipeline::new(
            PlanningAgent::new(llm.handle(), 5),
            SearchAgent::new(mode, 5, 1),
            SynthesisAgent::new(llm.handle()),
            Some(Duration::from_secs(30)),
        )
    }

    fn jobs_hit() -> SearchHit {
        SearchHit::new("Future of Jobs Report", "AI reshapes task mix", "https://example.org/future-of-jobs")
    }

    #[tokio::test]
    async fn test_llm_only_run() {
        let llm = ScriptedLLM::new(vec![Ok(PLAN_REPLY), Ok("Inflation report")]);
        // Disabled holds no provider, so no search call can be issued.
        let pipeline = pipeline(&llm, SearchMode::Disabled);
        assert!(!pipeline.search_enabled());

        let state = assert_ok!(pipeline.run("What causes inflation?").await);

        assert_eq!(state.sub_questions().len(), 3);
        assert!(state.search_results().is_empty());
        assert_eq!(state.report(), Some("Inflation report"));
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_search_results_reach_synthesis_prompt() {
        let llm = ScriptedLLM::new(vec![Ok(PLAN_REPLY), Ok("Jobs report")]);
        let provider = Arc::new(FixedSearch::new(vec![jobs_hit()]));
        let pipeline = pipeline(&llm, SearchMode::Enabled(provider.clone()));

        let state = assert_ok!(pipeline.run("Impact of AI on jobs").await);

        assert_eq!(provider.calls(), 3);
        assert_eq!(state.search_results().len(), 3);
        for sub_question in state.sub_questions() {
            assert_eq!(state.results_for(sub_question), &[jobs_hit()]);
        }

        // Synthesizer is the second and last LLM call.
        assert_eq!(llm.calls(), 2);
        let prompt = llm.last_prompt();
        assert!(prompt.contains("Impact of AI on jobs"));
        for sub_question in state.sub_questions() {
            assert!(prompt.contains(sub_question.as_str()));
        }
        assert!(prompt.contains("Future of Jobs Report"));
        assert!(prompt.contains("https://example.org/future-of-jobs"));
    }

    #[tokio::test]
    async fn test_planning_failure_stops_pipeline() {
        let llm = ScriptedLLM::new(vec![Err("connection refused")]);
        let provider = Arc::new(FixedSearch::new(vec![jobs_hit()]));
        let pipeline = pipeline(&llm, SearchMode::Enabled(provider.clone()));

        let failure = assert_err!(pipeline.run("Impact of AI on jobs").await);

        assert_eq!(failure.stage, PipelineStage::Planning);
        assert!(matches!(failure.error, ResearchError::Planning(PlanningError::Llm(_))));
        assert_eq!(provider.calls(), 0);
        assert_eq!(llm.calls(), 1);
        assert!(failure.state.sub_questions().is_empty());
    }

    #[tokio::test]
    async fn test_synthesis_failure_keeps_partial_state() {
        let llm = ScriptedLLM::new(vec![Ok(PLAN_REPLY), Err("upstream 503")]);
        let provider = Arc::new(FixedSearch::new(vec![jobs_hit()]));
        let pipeline = pipeline(&llm, SearchMode::Enabled(provider));

        let failure = assert_err!(pipeline.run("Impact of AI on jobs").await);

        assert_eq!(failure.stage, PipelineStage::Synthesizing);
        assert!(matches!(failure.error, ResearchError::Synthesis(SynthesisError::Llm(_))));
        assert_eq!(failure.state.sub_questions().len(), 3);
        assert_eq!(failure.state.search_results().len(), 3);
        assert!(failure.state.report().is_none());
        assert!(failure.to_string().contains("upstream 503"));
    }

    #[tokio::test]
    async fn test_failing_search_is_tolerated() {
        let llm = ScriptedLLM::new(vec![Ok(PLAN_REPLY), Ok("Report")]);
        let provider = Arc::new(FixedSearch::new(vec![jobs_hit()]).failing_on("What is the second facet?"));
        let pipeline = pipeline(&llm, SearchMode::Enabled(provider));

        let state = assert_ok!(pipeline.run("Impact of AI on jobs").await);
        assert!(state.results_for("What is the second facet?").is_empty());
        assert_eq!(state.results_for("What is the first facet?"), &[jobs_hit()]);
        assert_eq!(state.results_for("What is the third facet?"), &[jobs_hit()]);
    }

    #[tokio::test]
    async fn test_progress_events_in_order() {
        let llm = ScriptedLLM::new(vec![Ok(PLAN_REPLY), Ok("Report")]);
        let provider = Arc::new(FixedSearch::new(vec![jobs_hit()]));
        let pipeline = pipeline(&llm, SearchMode::Enabled(provider));
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert_ok!(pipeline.run_with_progress("Impact of AI on jobs", tx).await);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert_eq!(events.first(), Some(&PipelineEvent::StageChanged(PipelineStage::Planning)));
        assert_eq!(events.last(), Some(&PipelineEvent::StageChanged(PipelineStage::Done)));
        let searched: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::SearchCompleted { sub_question, .. } => Some(sub_question.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            searched,
            vec!["What is the first facet?", "What is the second facet?", "What is the third facet?"]
        );
        assert!(events.contains(&PipelineEvent::ReportReady("Report".to_string())));
    }

    #[tokio::test]
    async fn test_failure_event_emitted() {
        let llm = ScriptedLLM::new(vec![Ok(PLAN_REPLY), Err("boom")]);
        let pipeline = pipeline(&llm, SearchMode::Disabled);
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert_err!(pipeline.run_with_progress("What causes inflation?", tx).await);

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert!(matches!(
            last,
            Some(PipelineEvent::Failed { stage: PipelineStage::Synthesizing, ref message }) if message.contains("boom")
        ));
    }

    #[tokio::test]
    async fn test_run_on_spawned_task() {
        let llm = ScriptedLLM::new(vec![Ok(PLAN_REPLY), Ok("Report")]);
        let provider = Arc::new(FixedSearch::new(vec![jobs_hit()]));
        let pipeline = Arc::new(pipeline(&llm, SearchMode::Enabled(provider.clone())));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.run_with_progress("Impact of AI on jobs", tx).await }
        });
        let state = assert_ok!(assert_ok!(handle.await));

        assert_eq!(state.report(), Some("Report"));
        assert_eq!(provider.calls(), 3);
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(last, Some(PipelineEvent::StageChanged(PipelineStage::Done)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_during_search_keeps_completed_results() {
        let llm = ScriptedLLM::new(vec![Ok(PLAN_REPLY), Ok("never used")]);
        let provider = Arc::new(
            FixedSearch::new(vec![jobs_hit()]).slow_on("What is the second facet?", Duration::from_secs(60)),
        );
        let pipeline = ResearchPipeline::new(
            PlanningAgent::new(llm.handle(), 5),
            SearchAgent::new(SearchMode::Enabled(provider.clone()), 5, 1),
            SynthesisAgent::new(llm.handle()),
            Some(Duration::from_secs(10)),
        );

        let failure = assert_err!(pipeline.run("Impact of AI on jobs").await);

        assert_eq!(failure.stage, PipelineStage::Searching);
        assert!(matches!(failure.error, ResearchError::Timeout(limit) if limit == Duration::from_secs(10)));
        assert!(failure.to_string().contains("timed out after 10s"));
        let keys: Vec<&String> = failure.state.search_results().keys().collect();
        assert_eq!(keys, vec!["What is the first facet?"]);
        assert_eq!(failure.state.results_for("What is the first facet?"), &[jobs_hit()]);
        assert_eq!(provider.calls(), 2);
        // Synthesis never ran.
        assert_eq!(llm.calls(), 1);
        assert!(failure.state.report().is_none());
    }
}
