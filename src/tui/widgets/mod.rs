//! TUI Widgets
//!
//! Custom widgets for the research TUI.

mod progress;

pub use progress::{render_progress, truncate_string};
