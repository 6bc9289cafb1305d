//! Display primitives for CLI output: tables, colors and run progress.

pub mod progress;
pub mod table;

pub use progress::{create_progress_bar, ProgressReportSink};
pub use table::{confidence_cell, disposition_cell, list_table, render_list};

use console::style;

/// Render a success action result.
pub fn action_success(message: &str) -> String {
    format!("{} {}", style("\u{2713}").green().bold(), message)
}

/// Render a failure action result.
pub fn action_failure(message: &str) -> String {
    format!("{} {}", style("\u{2717}").red().bold(), message)
}
