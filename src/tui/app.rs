//! Application State
//!
//! Contains the main application state and logic for the TUI.

use crate::agents::{PipelineEvent, PipelineStage, ResearchPipeline};
use crate::search::SearchHit;
use crate::tui::event::AppAction;
use crate::tui::ui;
use chrono::{DateTime, Local};
use ratatui::layout::Rect;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tui_textarea::TextArea;

/// File the report is written to on Ctrl+S.
pub const REPORT_FILE: &str = "research_report.txt";

const INPUT_PLACEHOLDER: &str = "Type your research question here...";

/// Research progress as shown in the UI
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProgressStage {
    /// Idle, waiting for input
    #[default]
    Idle,
    Planning,
    Searching {
        completed: usize,
        total: usize,
    },
    Synthesizing,
    Complete,
    /// The run stopped at `stage`
    Error {
        stage: PipelineStage,
        message: String,
    },
}

/// Current view/screen
#[derive(Debug, Clone, PartialEq, Default)]
pub enum View {
    #[default]
    Research,
    Help,
}

/// Main application state
pub struct App {
    pub model_name: String,
    pub search_enabled: bool,

    // UI State
    pub view: View,
    pub should_quit: bool,
    pub input: TextArea<'static>,
    pub notice: Option<String>,
    pub scroll_offset: u16,
    pub max_scroll: u16,

    // Research State
    pub stage: ProgressStage,
    pub question: Option<String>,
    pub sub_questions: Vec<String>,
    pub sources: Vec<(String, Vec<SearchHit>)>,
    pub report: Option<String>,
    pub report_path: PathBuf,
    pub finished_at: Option<DateTime<Local>>,

    pipeline: Arc<ResearchPipeline>,
    event_rx: mpsc::UnboundedReceiver<PipelineEvent>,
    event_tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl App {
    pub fn new(pipeline: Arc<ResearchPipeline>, model_name: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            model_name: model_name.into(),
            search_enabled: pipeline.search_enabled(),
            view: View::Research,
            should_quit: false,
            input: Self::fresh_input(),
            notice: None,
            scroll_offset: 0,
            max_scroll: 0,
            stage: ProgressStage::Idle,
            question: None,
            sub_questions: Vec::new(),
            sources: Vec::new(),
            report: None,
            report_path: PathBuf::from(REPORT_FILE),
            finished_at: None,
            pipeline,
            event_rx,
            event_tx,
        }
    }

    fn fresh_input() -> TextArea<'static> {
        let mut input = TextArea::default();
        input.set_cursor_line_style(ratatui::style::Style::default());
        input.set_placeholder_text(INPUT_PLACEHOLDER);
        input
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.stage,
            ProgressStage::Planning | ProgressStage::Searching { .. } | ProgressStage::Synthesizing
        )
    }

    /// Drain pipeline events without blocking.
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }
    }

    pub(crate) fn handle_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::StageChanged(stage) => {
                self.stage = match stage {
                    PipelineStage::Planning => ProgressStage::Planning,
                    PipelineStage::Searching => ProgressStage::Searching {
                        completed: 0,
                        total: self.sub_questions.len(),
                    },
                    PipelineStage::Synthesizing => ProgressStage::Synthesizing,
                    PipelineStage::Done => {
                        self.finished_at = Some(Local::now());
                        ProgressStage::Complete
                    }
                };
            }
            PipelineEvent::SubQuestionsPlanned(sub_questions) => {
                self.sub_questions = sub_questions;
            }
            PipelineEvent::SearchCompleted { sub_question, hits } => {
                self.sources.push((sub_question, hits));
                if let ProgressStage::Searching { completed, .. } = &mut self.stage {
                    *completed += 1;
                }
            }
            PipelineEvent::ReportReady(report) => {
                self.report = Some(report);
                self.scroll_offset = 0;
            }
            PipelineEvent::Failed { stage, message } => {
                // Sub-questions and sources stay on screen.
                self.finished_at = Some(Local::now());
                self.stage = ProgressStage::Error { stage, message };
            }
        }
    }

    /// Handle a user action
    pub async fn handle_action(&mut self, action: AppAction) {
        match action {
            AppAction::Quit | AppAction::ForceQuit => {
                self.should_quit = true;
            }
            AppAction::Submit => {
                if self.view == View::Research {
                    self.submit_question();
                }
            }
            AppAction::SaveReport => {
                self.save_report().await;
            }
            AppAction::ToggleHelp => {
                self.view = if self.view == View::Help {
                    View::Research
                } else {
                    View::Help
                };
            }
            AppAction::Escape => {
                self.view = View::Research;
                self.notice = None;
            }
            AppAction::ScrollUp => {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
            }
            AppAction::ScrollDown => {
                if self.scroll_offset < self.max_scroll {
                    self.scroll_offset += 1;
                }
            }
            AppAction::ScrollPageUp => {
                self.scroll_offset = self.scroll_offset.saturating_sub(10);
            }
            AppAction::ScrollPageDown => {
                self.scroll_offset = (self.scroll_offset + 10).min(self.max_scroll);
            }
            AppAction::ScrollTop => {
                self.scroll_offset = 0;
            }
            AppAction::ScrollBottom => {
                self.scroll_offset = self.max_scroll;
            }
            AppAction::Input(key_event) => {
                if self.view == View::Help {
                    self.view = View::Research;
                } else {
                    self.input.input(key_event);
                }
            }
            AppAction::Tick => {}
        }
    }

    /// Start a run for the text in the input box.
    fn submit_question(&mut self) {
        let question = self.input.lines().join("\n").trim().to_string();
        if question.is_empty() {
            self.notice = Some("Please enter a research question.".to_string());
            return;
        }
        if self.is_running() {
            self.notice = Some("Research already in progress.".to_string());
            return;
        }

        self.input = Self::fresh_input();
        self.notice = None;
        self.question = Some(question.clone());
        self.sub_questions.clear();
        self.sources.clear();
        self.report = None;
        self.finished_at = None;
        self.scroll_offset = 0;
        self.stage = ProgressStage::Planning;

        let pipeline = self.pipeline.clone();
        let tx = self.event_tx.clone();
        info!(question_len = question.len(), "Submitting research question");

        // Outcome arrives through the event channel.
        tokio::spawn(async move {
            let _ = pipeline.run_with_progress(&question, tx).await;
        });
    }

    async fn save_report(&mut self) {
        let Some(report) = &self.report else {
            self.notice = Some("No report to save yet.".to_string());
            return;
        };

        match tokio::fs::write(&self.report_path, report).await {
            Ok(()) => {
                info!(path = %self.report_path.display(), "Report saved");
                self.notice = Some(format!("Report saved to {}", self.report_path.display()));
            }
            Err(e) => {
                error!(error = %e, "Failed to save report");
                self.notice = Some(format!("Failed to save report: {}", e));
            }
        }
    }

    /// Recompute how far the report panel can scroll for the given terminal size.
    pub fn calculate_scroll_bounds(&mut self, area: Rect) {
        let panel = ui::layout(area).report;
        let width = panel.width.saturating_sub(2) as usize;
        let viewport = panel.height.saturating_sub(2);
        let content = ui::report_lines(self, width).len();
        self.update_scroll_bounds(content.min(u16::MAX as usize) as u16, viewport);
    }

    pub fn update_scroll_bounds(&mut self, content_height: u16, viewport_height: u16) {
        self.max_scroll = content_height.saturating_sub(viewport_height);
        if self.scroll_offset > self.max_scroll {
            self.scroll_offset = self.max_scroll;
        }
    }
}
