pub mod attempt;
pub mod config;
pub mod flow;
pub mod navigation;
pub mod report;
pub mod scenario;
pub mod test_case;

pub use attempt::{
    AttemptOutcome, AttemptRecord, CaseState, Disposition, FailureCategory, FailureContext,
    TrackerSnapshot,
};
pub use config::{
    Config, DeviceConfig, GroupingConfig, LoggingConfig, MemoryConfig, PathsConfig,
    ProducerConfig, RetryConfig, TimeoutConfig,
};
pub use flow::{DeviceTarget, FlowArtifact};
pub use navigation::{
    EntryKey, MemorySnapshot, NavigationHypothesis, NavigationPath, ObservationOutcome,
    Provenance,
};
pub use report::{CaseSummary, RunSummary};
pub use scenario::Scenario;
pub use test_case::{CasePriority, CaseStep, TestCase};
