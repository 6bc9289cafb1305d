//! Run summary handed to the report writer and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attempt::{CaseState, Disposition};

/// Final state of one case in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub case_id: String,
    pub scenario_id: String,
    pub disposition: Disposition,
    pub attempts: u32,
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&CaseState> for CaseSummary {
    fn from(state: &CaseState) -> Self {
        Self {
            case_id: state.case_id.clone(),
            scenario_id: state.scenario_id.clone(),
            disposition: state.disposition,
            attempts: state.attempts,
            evidence: state.evidence.clone(),
            reason: state.reason.clone(),
        }
    }
}

/// Outcome of a whole orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cases: Vec<CaseSummary>,
    /// The run stopped before every case reached a terminal disposition.
    pub aborted: bool,
    /// Last case whose state was fully persisted when the run stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_consistent_case: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
}

impl RunSummary {
    fn count(&self, disposition: Disposition) -> usize {
        self.cases
            .iter()
            .filter(|c| c.disposition == disposition)
            .count()
    }

    pub fn passed(&self) -> usize {
        self.count(Disposition::Passed)
    }

    pub fn problematic(&self) -> usize {
        self.count(Disposition::Problematic)
    }

    pub fn pending(&self) -> usize {
        self.count(Disposition::Pending)
    }

    pub fn case(&self, case_id: &str) -> Option<&CaseSummary> {
        self.cases.iter().find(|c| c.case_id == case_id)
    }
}
