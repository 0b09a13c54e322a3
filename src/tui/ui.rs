//! UI Rendering
//!
//! Main UI layout and rendering logic for the TUI.

use crate::tui::app::{App, ProgressStage, View};
use crate::tui::theme::{Icons, Theme};
use crate::tui::widgets;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Screen regions
#[derive(Debug, Clone, Copy)]
pub struct Panes {
    pub header: Rect,
    pub progress: Rect,
    pub sub_questions: Rect,
    pub sources: Rect,
    pub report: Rect,
    pub input: Rect,
    pub status: Rect,
}

/// Split the terminal area into panes.
pub fn layout(area: Rect) -> Panes {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(5), // Progress
            Constraint::Min(10),   // Body
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[2]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(body[0]);

    Panes {
        header: rows[0],
        progress: rows[1],
        sub_questions: left[0],
        sources: left[1],
        report: body[1],
        input: rows[3],
        status: rows[4],
    }
}

/// Render the main UI
pub fn render(frame: &mut Frame, app: &App) {
    let panes = layout(frame.area());

    render_header(frame, panes.header, app);
    widgets::render_progress(
        frame,
        panes.progress,
        &app.stage,
        app.question.as_deref(),
        app.search_enabled,
    );
    render_sub_questions(frame, panes.sub_questions, app);
    render_sources(frame, panes.sources, app);
    render_report(frame, panes.report, app);
    render_input(frame, panes.input, app);
    render_status_bar(frame, panes.status, app);

    if app.view == View::Help {
        render_help(frame);
    }
}

/// Header with model name and search status
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let search_badge = if app.search_enabled {
        Span::styled(" WEB SEARCH ", Theme::badge_success())
    } else {
        Span::styled(" LLM-ONLY ", Theme::badge_warning())
    };

    let title = Paragraph::new(Line::from(vec![
        Span::styled("Atlas", Theme::title()),
        Span::styled(" Research Assistant", Theme::text_secondary()),
        Span::raw("  "),
        Span::styled(app.model_name.clone(), Theme::text()),
        Span::raw("  "),
        search_badge,
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border()),
    );

    frame.render_widget(title, area);
}

fn render_sub_questions(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Sub-questions ")
        .borders(Borders::ALL)
        .border_style(Theme::border());

    let lines: Vec<Line> = if app.sub_questions.is_empty() {
        vec![Line::from(Span::styled("None yet", Theme::text_dim()))]
    } else {
        app.sub_questions
            .iter()
            .enumerate()
            .map(|(i, sq)| {
                Line::from(vec![
                    Span::styled(format!("{}. ", i + 1), Theme::shortcut_key()),
                    Span::styled(sq.clone(), Theme::text()),
                ])
            })
            .collect()
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_sources(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Sources ")
        .borders(Borders::ALL)
        .border_style(Theme::border());
    let width = block.inner(area).width as usize;

    let mut lines: Vec<Line> = Vec::new();
    if !app.search_enabled {
        lines.push(Line::from(Span::styled(
            "Web search disabled (LLM-only mode)",
            Theme::text_dim(),
        )));
    }

    for (sub_question, hits) in &app.sources {
        lines.push(Line::from(Span::styled(
            widgets::truncate_string(sub_question, width),
            Theme::heading(),
        )));
        if hits.is_empty() {
            lines.push(Line::from(Span::styled("  (no results)", Theme::text_dim())));
        }
        for hit in hits {
            let title = if hit.title.is_empty() { "(untitled)" } else { hit.title.as_str() };
            lines.push(Line::from(vec![
                Span::styled(format!(" {} ", Icons::DOT), Theme::text_dim()),
                Span::styled(widgets::truncate_string(title, width.saturating_sub(3)), Theme::text()),
            ]));
            if !hit.url.is_empty() {
                lines.push(Line::from(vec![
                    Span::raw("   "),
                    Span::styled(widgets::truncate_string(&hit.url, width.saturating_sub(3)), Theme::link()),
                ]));
            }
        }
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Report panel. Errors are shown above whatever output already exists.
fn render_report(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Report ")
        .borders(Borders::ALL)
        .border_style(if app.report.is_some() {
            Theme::border_focused()
        } else {
            Theme::border()
        });

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = report_lines(app, inner.width as usize);
    let paragraph = Paragraph::new(lines).scroll((app.scroll_offset, 0));
    frame.render_widget(paragraph, inner);
}

/// Lines shown in the report panel at the given inner width.
pub fn report_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    if let ProgressStage::Error { message, .. } = &app.stage {
        for line in wrap_text(&format!("{} {}", Icons::ERROR, message), width) {
            lines.push(Line::from(Span::styled(line, Theme::error())));
        }
        lines.push(Line::from(""));
    }

    match &app.report {
        Some(report) => {
            for line in wrap_text(report, width) {
                lines.push(Line::from(Span::styled(line, Theme::text())));
            }
        }
        None => {
            let placeholder = match app.stage {
                ProgressStage::Idle => "Submit a question to start.",
                ProgressStage::Error { .. } => "No report was produced.",
                _ => "Waiting for synthesis...",
            };
            lines.push(Line::from(Span::styled(placeholder, Theme::text_dim())));
        }
    }

    lines
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Question ")
        .borders(Borders::ALL)
        .border_style(if app.is_running() {
            Theme::border()
        } else {
            Theme::border_focused()
        });

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(&app.input, inner);
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let status = match &app.stage {
        ProgressStage::Idle => Span::styled("Ready", Theme::text_secondary()),
        ProgressStage::Planning => Span::styled("Planning sub-questions...", Theme::active()),
        ProgressStage::Searching { completed, total } => Span::styled(
            format!("Searching ({}/{})", completed, total),
            Theme::active(),
        ),
        ProgressStage::Synthesizing => Span::styled("Synthesizing report...", Theme::active()),
        ProgressStage::Complete => match app.finished_at {
            Some(at) => Span::styled(format!("Complete at {}", at.format("%H:%M:%S")), Theme::complete()),
            None => Span::styled("Complete", Theme::complete()),
        },
        ProgressStage::Error { stage, .. } => {
            Span::styled(format!("Failed during {}", stage), Theme::error())
        }
    };

    let mut spans = vec![status];
    if let Some(notice) = &app.notice {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(notice.clone(), Theme::warning()));
    }
    spans.push(Span::raw(" │ "));
    spans.extend([
        Span::styled("[Enter]", Theme::shortcut_key()),
        Span::styled(" Research ", Theme::shortcut_desc()),
        Span::styled("[Ctrl+S]", Theme::shortcut_key()),
        Span::styled(" Save ", Theme::shortcut_desc()),
        Span::styled("[Ctrl+Q]", Theme::shortcut_key()),
        Span::styled(" Quit ", Theme::shortcut_desc()),
        Span::styled("[F1]", Theme::shortcut_key()),
        Span::styled(" Help", Theme::shortcut_desc()),
    ]);

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);

    let shortcut = |key: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("{:<13}", key), Theme::shortcut_key()),
            Span::styled(desc, Theme::text()),
        ])
    };

    let help_lines = vec![
        Line::from(Span::styled("Keyboard Shortcuts", Theme::heading())),
        Line::from(""),
        shortcut("Enter", "Start research for the question"),
        shortcut("Ctrl+S", "Save report to research_report.txt"),
        shortcut("Ctrl+Q", "Quit application"),
        shortcut("Ctrl+C", "Force quit"),
        shortcut("↑/↓", "Scroll report"),
        shortcut("PageUp/Down", "Scroll page"),
        shortcut("Home/End", "Jump to top / bottom"),
        shortcut("Esc", "Close help / clear notice"),
        shortcut("F1 / Ctrl+H", "Show this help"),
        Line::from(""),
        Line::from(Span::styled("Press any key to close", Theme::text_dim())),
    ];

    let paragraph = Paragraph::new(help_lines).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Theme::border_focused()),
    );

    frame.render_widget(paragraph, area);
}

/// Wrap text to `width` columns, breaking on whitespace where possible.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();

    for line in text.lines() {
        let mut remaining = line.trim_end();
        if remaining.is_empty() {
            out.push(String::new());
            continue;
        }

        while remaining.chars().count() > width {
            let (chunk, rest) = remaining.split_at(break_point(remaining, width));
            out.push(chunk.trim_end().to_string());
            remaining = rest.trim_start();
        }
        if !remaining.is_empty() {
            out.push(remaining.to_string());
        }
    }

    out
}

/// Byte offset to split at; `s` is longer than `width` chars.
fn break_point(s: &str, width: usize) -> usize {
    let mut last_space = None;
    let mut end = s.len();
    for (count, (idx, ch)) in s.char_indices().enumerate() {
        if count == width {
            end = idx;
            break;
        }
        if ch.is_whitespace() && idx > 0 {
            last_space = Some(idx);
        }
    }
    last_space.unwrap_or(end)
}

/// Helper to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_breaks_on_whitespace() {
        assert_eq!(wrap_text("the quick brown fox", 10), vec!["the quick", "brown fox"]);
    }

    #[test]
    fn test_wrap_splits_long_words() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_keeps_blank_lines() {
        assert_eq!(wrap_text("# Title\n\nBody", 20), vec!["# Title", "", "Body"]);
    }

    #[test]
    fn test_layout_fits_area() {
        let panes = layout(Rect::new(0, 0, 100, 40));
        assert_eq!(panes.header.height, 3);
        assert_eq!(panes.status.y, 39);
        assert!(panes.report.x > panes.sources.x);
    }
}
