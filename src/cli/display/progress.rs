//! Run progress on the terminal.
//!
//! [`ProgressReportSink`] decorates another report sink and advances an
//! indicatif bar as cases finish, so the orchestrator stays unaware of the
//! terminal.

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::models::{AttemptRecord, Disposition, RunSummary};
use crate::domain::ports::ReportSink;

const PROGRESS_TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";
const PROGRESS_CHARS: &str = "█▓▒░ ";

/// Create a progress bar for `total` cases.
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    match ProgressStyle::default_bar().template(PROGRESS_TEMPLATE) {
        Ok(style) => bar.set_style(style.progress_chars(PROGRESS_CHARS)),
        Err(err) => tracing::debug!(error = %err, "invalid progress template, using default style"),
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub struct ProgressReportSink {
    inner: Arc<dyn ReportSink>,
    bar: ProgressBar,
}

impl ProgressReportSink {
    pub fn new(inner: Arc<dyn ReportSink>, bar: ProgressBar) -> Self {
        Self { inner, bar }
    }
}

#[async_trait]
impl ReportSink for ProgressReportSink {
    async fn attempt_recorded(&self, case_id: &str, scenario_id: &str, record: &AttemptRecord) {
        let result = match record.outcome.category() {
            None => "passed".to_string(),
            Some(category) => format!("failed ({category})"),
        };
        self.bar
            .set_message(format!("{case_id} attempt {} {result}", record.attempt));
        self.inner.attempt_recorded(case_id, scenario_id, record).await;
    }

    async fn case_finished(&self, case_id: &str, disposition: Disposition, evidence: &[String]) {
        self.bar.inc(1);
        self.bar.set_message(format!("{case_id} {disposition}"));
        self.inner.case_finished(case_id, disposition, evidence).await;
    }

    async fn run_finished(&self, summary: &RunSummary) {
        self.bar.finish_and_clear();
        self.inner.run_finished(summary).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::report::RecordingReportSink;
    use crate::domain::models::AttemptOutcome;
    use chrono::Utc;

    #[tokio::test]
    async fn test_forwards_events_and_advances() {
        let inner = Arc::new(RecordingReportSink::new());
        let bar = ProgressBar::hidden();
        bar.set_length(2);
        let sink = ProgressReportSink::new(inner.clone(), bar.clone());

        let record = AttemptRecord {
            case_id: "TC-1".into(),
            scenario_id: "s1".into(),
            attempt: 1,
            flow: None,
            outcome: AttemptOutcome::success(vec![]),
            recorded_at: Utc::now(),
        };
        sink.attempt_recorded("TC-1", "s1", &record).await;
        sink.case_finished("TC-1", Disposition::Passed, &[]).await;

        assert_eq!(bar.position(), 1);
        assert_eq!(inner.attempts().len(), 1);
        assert_eq!(inner.finished()[0].disposition, Disposition::Passed);
    }
}
