pub mod attempt_tracker;
pub mod case_grouper;
pub mod navigation_memory;
pub mod retry_orchestrator;

pub use attempt_tracker::{next_disposition, run_fingerprint, AttemptTracker};
pub use case_grouper::CaseGrouper;
pub use navigation_memory::{MemorySummary, NavigationMemory};
pub use retry_orchestrator::{OrchestratorConfig, OrchestratorPorts, RetryOrchestrator};
