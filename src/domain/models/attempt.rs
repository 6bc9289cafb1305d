//! Attempt history and case dispositions.
//!
//! Every generate/execute/observe cycle for a case produces exactly one
//! [`AttemptRecord`]. Records are append-only. [`CaseState`] summarises a
//! case's progress and is the source of truth for whether the retry loop
//! continues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::flow::FlowArtifact;

/// Classification of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    #[default]
    Pending,
    Passed,
    Problematic,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Problematic => "problematic",
        }
    }

    /// Terminal dispositions have no transitions out.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Problematic)
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// The flow ran and failed, or the device misbehaved.
    Execution,
    /// Flow generation or execution exceeded its timeout.
    Timeout,
    /// The flow producer could not honour its contract.
    Producer,
    /// The case itself could not be turned into a flow.
    Input,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Execution => "execution",
            Self::Timeout => "timeout",
            Self::Producer => "producer",
            Self::Input => "input",
        }
    }

    /// Structural failures cannot be fixed by retrying.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Producer | Self::Input)
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostics carried from a failed attempt into the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    pub message: String,
    /// Screenshots, logs and other evidence references.
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Classified cause such as `element_not_found`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl FailureContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            evidence: Vec::new(),
            cause: None,
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

/// Result of one attempt as seen by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success {
        #[serde(default)]
        evidence: Vec<String>,
    },
    Failure {
        category: FailureCategory,
        context: FailureContext,
    },
}

impl AttemptOutcome {
    pub fn success(evidence: Vec<String>) -> Self {
        Self::Success { evidence }
    }

    pub fn failure(category: FailureCategory, context: FailureContext) -> Self {
        Self::Failure { category, context }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn evidence(&self) -> &[String] {
        match self {
            Self::Success { evidence } => evidence,
            Self::Failure { context, .. } => &context.evidence,
        }
    }

    pub fn failure_context(&self) -> Option<&FailureContext> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { context, .. } => Some(context),
        }
    }

    pub fn category(&self) -> Option<FailureCategory> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { category, .. } => Some(*category),
        }
    }
}

/// One immutable attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub case_id: String,
    pub scenario_id: String,
    /// 1-based attempt index.
    pub attempt: u32,
    /// Absent when the producer failed before yielding a flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<FlowArtifact>,
    pub outcome: AttemptOutcome,
    pub recorded_at: DateTime<Utc>,
}

/// Progress of a single case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseState {
    pub case_id: String,
    pub scenario_id: String,
    pub attempts: u32,
    pub disposition: Disposition,
    /// Index of the most recent record in the tracker's record log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_record: Option<usize>,
    /// Evidence collected over all attempts.
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Why the case ended up problematic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CaseState {
    pub fn new(case_id: impl Into<String>, scenario_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            scenario_id: scenario_id.into(),
            attempts: 0,
            disposition: Disposition::Pending,
            last_record: None,
            evidence: Vec::new(),
            reason: None,
        }
    }
}

/// Persisted form of the attempt tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    /// Digest of the inputs the run was started with.
    pub fingerprint: String,
    pub max_attempts: u32,
    pub cases: BTreeMap<String, CaseState>,
    pub records: Vec<AttemptRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_terminal() {
        assert!(!Disposition::Pending.is_terminal());
        assert!(Disposition::Passed.is_terminal());
        assert!(Disposition::Problematic.is_terminal());
    }

    #[test]
    fn test_structural_categories() {
        assert!(FailureCategory::Producer.is_structural());
        assert!(FailureCategory::Input.is_structural());
        assert!(!FailureCategory::Execution.is_structural());
        assert!(!FailureCategory::Timeout.is_structural());
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = AttemptOutcome::failure(
            FailureCategory::Timeout,
            FailureContext::new("maestro timed out"),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["result"], "failure");
        assert_eq!(json["category"], "timeout");
        assert_eq!(json["context"]["message"], "maestro timed out");
    }
}
