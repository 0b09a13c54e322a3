//! Progress Widget
//!
//! Displays the research pipeline progress.

use crate::agents::PipelineStage;
use crate::tui::app::ProgressStage;
use crate::tui::theme::{Icons, Theme};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const STAGES: [(&str, PipelineStage); 4] = [
    ("Planning", PipelineStage::Planning),
    ("Searching", PipelineStage::Searching),
    ("Synthesizing", PipelineStage::Synthesizing),
    ("Done", PipelineStage::Done),
];

/// Render the progress indicator
pub fn render_progress(
    frame: &mut Frame,
    area: Rect,
    stage: &ProgressStage,
    question: Option<&str>,
    search_enabled: bool,
) {
    let block = Block::default()
        .title(" Research Progress ")
        .borders(Borders::ALL)
        .border_style(Theme::border());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width as usize;
    let mut lines = Vec::new();

    match question {
        Some(q) => lines.push(Line::from(vec![
            Span::styled("Question: ", Theme::text_secondary()),
            Span::styled(truncate_string(q, width.saturating_sub(10)), Theme::text()),
        ])),
        None => lines.push(Line::from(Span::styled("Waiting for input...", Theme::text_dim()))),
    }

    lines.push(Line::from(build_progress_line(stage)));

    if let Some(detail) = stage_detail(stage, search_enabled) {
        lines.push(Line::from(vec![
            Span::styled("  ", Theme::text_dim()),
            Span::styled(truncate_string(&detail, width.saturating_sub(2)), Theme::text_secondary()),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn stage_detail(stage: &ProgressStage, search_enabled: bool) -> Option<String> {
    match stage {
        ProgressStage::Searching { .. } if !search_enabled => {
            Some("LLM-only mode: web search skipped".to_string())
        }
        ProgressStage::Searching { completed, total } => {
            Some(format!("Searched {}/{} sub-questions", completed, total))
        }
        _ => None,
    }
}

/// Build the progress line with stage indicators
fn build_progress_line(stage: &ProgressStage) -> Vec<Span<'static>> {
    let mut spans = Vec::new();

    for (i, (name, pipeline_stage)) in STAGES.iter().enumerate() {
        let (icon, style) = match StageState::of(*pipeline_stage, stage) {
            StageState::Complete => (Icons::COMPLETE, Theme::complete()),
            StageState::Active => (Icons::ACTIVE, Theme::active()),
            StageState::Pending => (Icons::PENDING, Theme::pending()),
            StageState::Error => (Icons::ERROR, Theme::error()),
        };

        spans.push(Span::styled(format!("{} ", icon), style));
        spans.push(Span::styled(name.to_string(), style));

        if i < STAGES.len() - 1 {
            spans.push(Span::styled(format!(" {} ", Icons::ARROW), Theme::text_dim()));
        }
    }

    spans
}

/// State of a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq)]
enum StageState {
    Pending,
    Active,
    Complete,
    Error,
}

impl StageState {
    /// State of `step` given the overall progress.
    fn of(step: PipelineStage, progress: &ProgressStage) -> Self {
        let index = stage_index(step);
        let relative = |current: usize, at: StageState| {
            if index < current {
                StageState::Complete
            } else if index == current {
                at
            } else {
                StageState::Pending
            }
        };

        match progress {
            ProgressStage::Idle => StageState::Pending,
            ProgressStage::Planning => relative(0, StageState::Active),
            ProgressStage::Searching { .. } => relative(1, StageState::Active),
            ProgressStage::Synthesizing => relative(2, StageState::Active),
            ProgressStage::Complete => StageState::Complete,
            ProgressStage::Error { stage, .. } => relative(stage_index(*stage), StageState::Error),
        }
    }
}

fn stage_index(stage: PipelineStage) -> usize {
    match stage {
        PipelineStage::Planning => 0,
        PipelineStage::Searching => 1,
        PipelineStage::Synthesizing => 2,
        PipelineStage::Done => 3,
    }
}

/// Truncate a string to fit within a given width
pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width > 3 {
        let kept: String = s.chars().take(max_width - 3).collect();
        format!("{}...", kept)
    } else {
        s.chars().take(max_width).collect()
    }
}
