//! Command-line interface.

pub mod commands;
pub mod context;
pub mod display;
pub mod output;
pub mod types;

pub use context::ProjectContext;
pub use types::{Cli, Commands};

use console::style;

/// Report a failed command and exit non-zero.
///
/// In JSON mode the error is a JSON object on stderr so stdout only ever
/// carries the command's own document.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    tracing::error!(error = %format!("{err:#}"), "command failed");
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", style("error:").red().bold());
    }
    std::process::exit(1);
}
