//! Report sink that keeps every event in memory.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::models::{AttemptRecord, Disposition, RunSummary};
use crate::domain::ports::ReportSink;

/// A `case_finished` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedCase {
    pub case_id: String,
    pub disposition: Disposition,
    pub evidence: Vec<String>,
}

#[derive(Debug, Default)]
pub struct RecordingReportSink {
    attempts: Mutex<Vec<AttemptRecord>>,
    finished: Mutex<Vec<FinishedCase>>,
    summary: Mutex<Option<RunSummary>>,
}

impl RecordingReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> Vec<AttemptRecord> {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn finished(&self) -> Vec<FinishedCase> {
        self.finished.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn run_summary(&self) -> Option<RunSummary> {
        self.summary.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ReportSink for RecordingReportSink {
    async fn attempt_recorded(&self, _case_id: &str, _scenario_id: &str, record: &AttemptRecord) {
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
    }

    async fn case_finished(&self, case_id: &str, disposition: Disposition, evidence: &[String]) {
        self.finished
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(FinishedCase {
                case_id: case_id.to_string(),
                disposition,
                evidence: evidence.to_vec(),
            });
    }

    async fn run_finished(&self, summary: &RunSummary) {
        *self.summary.lock().unwrap_or_else(|e| e.into_inner()) = Some(summary.clone());
    }
}
