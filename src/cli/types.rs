//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::init::InitArgs;
use crate::cli::commands::memory::MemoryArgs;
use crate::cli::commands::run::RunArgs;
use crate::cli::commands::scenarios::ScenariosArgs;
use crate::cli::commands::status::StatusArgs;

#[derive(Parser, Debug)]
#[command(name = "qa-automator")]
#[command(about = "QA Automator - retry-bounded Maestro automation of manual test cases", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Project root containing .qa-automator/
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub project: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the project configuration and working directories
    Init(InitArgs),

    /// Automate test cases with bounded retries
    Run(RunArgs),

    /// Show how test cases group into scenarios
    Scenarios(ScenariosArgs),

    /// Inspect the navigation memory
    Memory(MemoryArgs),

    /// Show the saved attempt state of the last run
    Status(StatusArgs),
}
