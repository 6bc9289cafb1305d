//! QA Automator - bounded-retry automation of manual test cases
//!
//! QA Automator takes manually written test cases, groups them into
//! end-to-end scenarios and turns each case into a Maestro flow through an
//! external flow producer. Every case gets a bounded number of
//! generate/execute attempts and ends up either passed or problematic. What
//! each attempt reveals about reaching a case's entry screen is kept in a
//! persistent navigation memory that later attempts and runs consult.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and the port traits
//! - **Service Layer** (`services`): Grouping, attempt tracking, navigation
//!   memory and the retry orchestrator
//! - **Adapters** (`adapters`): Qase import, flow producers, Maestro
//!   execution, snapshot stores and report writers
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use qa_automator::services::{AttemptTracker, NavigationMemory, RetryOrchestrator};
//!
//! let mut orchestrator = RetryOrchestrator::new(memory, tracker, ports, config);
//! let summary = orchestrator.run(&scenarios, &cases).await?;
//! println!("{} passed, {} problematic", summary.passed(), summary.problematic());
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AttemptOutcome, AttemptRecord, CasePriority, Config, Disposition, EntryKey, FailureCategory,
    NavigationPath, RunSummary, Scenario, TestCase,
};
pub use domain::ports::{ExecutionCollaborator, FlowProducer, ReportSink, SnapshotStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    AttemptTracker, CaseGrouper, NavigationMemory, OrchestratorConfig, OrchestratorPorts,
    RetryOrchestrator,
};
