//! Terminal User Interface Module
//!
//! Interactive front end for the research pipeline, built with Ratatui.
//! Pipeline events stream into the app while a run is in progress, so
//! sub-questions and sources appear before the report does.
//!
//! # Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │      Atlas Research Assistant  gemini-2.0-flash  [WEB SEARCH]  │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ ┌─ Research Progress ────────────────────────────────────────┐ │
//! │ │ ✓ Planning → ● Searching → ○ Synthesizing → ○ Done         │ │
//! │ └────────────────────────────────────────────────────────────┘ │
//! │ ┌─ Sub-questions ──────┐ ┌─ Report ──────────────────────────┐ │
//! │ │ 1. ...               │ │                                   │ │
//! │ ├─ Sources ────────────┤ │  [Scrollable report text]         │ │
//! │ │ • title / url        │ │                                   │ │
//! │ └──────────────────────┘ └───────────────────────────────────┘ │
//! │ ┌─ Question ─────────────────────────────────────────────────┐ │
//! │ └────────────────────────────────────────────────────────────┘ │
//! │ Ready │ [Enter] Research [Ctrl+S] Save [Ctrl+Q] Quit [F1] Help │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod event;
pub mod theme;
pub mod ui;
pub mod widgets;

pub use app::{App, ProgressStage, View};
pub use event::{AppAction, EventHandler};

use crate::agents::ResearchPipeline;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Type alias for our terminal backend
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

const TICK_RATE: Duration = Duration::from_millis(100);

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> anyhow::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state
pub fn restore_terminal(terminal: &mut Tui) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the TUI application
pub async fn run(pipeline: ResearchPipeline, model_name: &str) -> anyhow::Result<()> {
    info!(model = model_name, "Starting TUI mode");

    let mut terminal = init_terminal()?;
    let mut app = App::new(Arc::new(pipeline), model_name);
    let mut events = EventHandler::new(TICK_RATE);

    let result = run_app(&mut terminal, &mut app, &mut events).await;

    if let Err(e) = restore_terminal(&mut terminal) {
        error!("Failed to restore terminal: {}", e);
    }

    result
}

/// Main application loop
async fn run_app(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> anyhow::Result<()> {
    loop {
        let size = terminal.size()?;
        app.calculate_scroll_bounds(Rect::new(0, 0, size.width, size.height));

        terminal.draw(|frame| ui::render(frame, app))?;

        // Pipeline progress
        app.poll_events();

        // Ticks wake the loop even without input
        match events.next().await {
            Some(action) => app.handle_action(action).await,
            None => break,
        }

        if app.should_quit {
            break;
        }
    }

    info!("TUI exited normally");
    Ok(())
}
