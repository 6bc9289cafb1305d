//! Report sink port - durable destination for attempt evidence and the
//! final summary.

use async_trait::async_trait;

use crate::domain::models::{AttemptRecord, Disposition, RunSummary};

/// Receives facts from the orchestrator; never decides anything.
///
/// Sinks handle their own failures (typically by logging them); the
/// orchestrator does not consume any return value.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Called once per recorded attempt.
    async fn attempt_recorded(&self, case_id: &str, scenario_id: &str, record: &AttemptRecord);

    /// Called once when a case reaches a terminal disposition.
    async fn case_finished(&self, case_id: &str, disposition: Disposition, evidence: &[String]);

    /// Called at the end of a run, including aborted runs.
    async fn run_finished(&self, _summary: &RunSummary) {}
}
