//! JSON report writer.
//!
//! Maintains `automation_report.json`, rewritten after every event so it
//! always reflects the run so far, and appends every attempt to
//! `attempts.jsonl`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::models::{AttemptRecord, Disposition, RunSummary};
use crate::domain::ports::ReportSink;

const REPORT_FILE: &str = "automation_report.json";
const ATTEMPTS_FILE: &str = "attempts.jsonl";

/// One attempt line in a case's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub attempt: u32,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub id: String,
    pub scenario_id: String,
    pub attempts: u32,
    pub status: Disposition,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub passed: usize,
    pub problematic: usize,
    pub pending: usize,
}

/// Contents of `automation_report.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub aborted: bool,
    #[serde(default)]
    pub totals: ReportTotals,
    #[serde(default)]
    pub tests: Vec<ReportEntry>,
}

impl ReportDocument {
    fn entry(&mut self, case_id: &str, scenario_id: &str) -> &mut ReportEntry {
        let index = match self.tests.iter().position(|t| t.id == case_id) {
            Some(index) => index,
            None => {
                self.tests.push(ReportEntry {
                    id: case_id.to_string(),
                    scenario_id: scenario_id.to_string(),
                    attempts: 0,
                    status: Disposition::Pending,
                    artifacts: Vec::new(),
                    history: Vec::new(),
                    reason: None,
                });
                self.tests.len() - 1
            }
        };
        &mut self.tests[index]
    }

    fn recount(&mut self) {
        let mut totals = ReportTotals::default();
        for test in &self.tests {
            match test.status {
                Disposition::Passed => totals.passed += 1,
                Disposition::Problematic => totals.problematic += 1,
                Disposition::Pending => totals.pending += 1,
            }
        }
        self.totals = totals;
    }
}

pub struct JsonReportWriter {
    output_dir: PathBuf,
    document: Mutex<ReportDocument>,
}

impl JsonReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            document: Mutex::new(ReportDocument::default()),
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }

    pub fn attempts_path(&self) -> PathBuf {
        self.output_dir.join(ATTEMPTS_FILE)
    }

    /// Read a report written by an earlier run.
    pub async fn load(path: &Path) -> std::io::Result<ReportDocument> {
        let content = fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }

    async fn write_report(&self, document: &ReportDocument) -> std::io::Result<()> {
        fs::create_dir_all(&self.output_dir).await?;
        let path = self.report_path();
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(document).map_err(std::io::Error::other)?;
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await
    }

    async fn append_attempt(&self, record: &AttemptRecord) -> std::io::Result<()> {
        fs::create_dir_all(&self.output_dir).await?;
        let mut line = serde_json::to_vec(record).map_err(std::io::Error::other)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.attempts_path())
            .await?;
        file.write_all(&line).await?;
        file.flush().await
    }

    async fn persist(&self, document: &ReportDocument) {
        if let Err(err) = self.write_report(document).await {
            tracing::warn!(path = %self.report_path().display(), error = %err, "failed to write automation report");
        }
    }
}

#[async_trait]
impl ReportSink for JsonReportWriter {
    async fn attempt_recorded(&self, case_id: &str, scenario_id: &str, record: &AttemptRecord) {
        if let Err(err) = self.append_attempt(record).await {
            tracing::warn!(case_id, error = %err, "failed to append attempt log");
        }

        let mut document = self.document.lock().await;
        if document.started_at.is_none() {
            document.started_at = Some(record.recorded_at);
        }
        let entry = document.entry(case_id, scenario_id);
        entry.attempts = record.attempt;
        entry.artifacts.extend(record.outcome.evidence().iter().cloned());
        entry.history.push(HistoryEntry {
            attempt: record.attempt,
            status: if record.outcome.is_success() { "passed" } else { "failed" }.to_string(),
            error: record.outcome.failure_context().map(|c| c.message.clone()),
        });
        document.recount();
        self.persist(&document).await;
    }

    async fn case_finished(&self, case_id: &str, disposition: Disposition, evidence: &[String]) {
        let mut document = self.document.lock().await;
        let entry = document.entry(case_id, "");
        entry.status = disposition;
        for item in evidence {
            if !entry.artifacts.contains(item) {
                entry.artifacts.push(item.clone());
            }
        }
        document.recount();
        self.persist(&document).await;
    }

    async fn run_finished(&self, summary: &RunSummary) {
        let mut document = self.document.lock().await;
        document.run_id = Some(summary.run_id);
        document.started_at = Some(summary.started_at);
        document.finished_at = Some(summary.finished_at);
        document.aborted = summary.aborted;
        for case in &summary.cases {
            let entry = document.entry(&case.case_id, &case.scenario_id);
            entry.scenario_id = case.scenario_id.clone();
            entry.status = case.disposition;
            entry.attempts = case.attempts;
            entry.reason = case.reason.clone();
            entry.artifacts = case.evidence.clone();
        }
        document.recount();
        self.persist(&document).await;
        tracing::info!(path = %self.report_path().display(), "automation report written");
    }
}
