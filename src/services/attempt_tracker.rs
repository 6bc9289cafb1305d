//! Attempt tracker - per-case state machine for the retry loop.
//!
//! ```text
//! pending --success-------------------------> passed
//! pending --failure, attempts < max---------> pending
//! pending --failure, attempts == max--------> problematic
//! pending --structural failure--------------> problematic
//! ```
//!
//! `passed` and `problematic` are terminal. The next disposition depends
//! only on the attempt count, the outcome and the configured maximum.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AttemptOutcome, AttemptRecord, CaseState, Disposition, FailureContext, FlowArtifact,
    TestCase, TrackerSnapshot,
};

/// Digest of the inputs a run starts from.
///
/// A stored tracker is only resumed when its fingerprint matches, so
/// editing the case export, the exclusions or the attempt bound starts a
/// fresh run. Order of cases and exclusions does not matter.
pub fn run_fingerprint(cases: &[TestCase], excluded: &HashSet<String>, max_attempts: u32) -> String {
    let mut case_digests: Vec<String> = cases
        .iter()
        .map(|case| serde_json::to_string(case).unwrap_or_else(|_| case.id.clone()))
        .collect();
    case_digests.sort();
    let mut excluded: Vec<&String> = excluded.iter().collect();
    excluded.sort();

    let mut hasher = Sha256::new();
    for digest in &case_digests {
        hasher.update(digest.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(b"excluded");
    for id in excluded {
        hasher.update(id.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(max_attempts.to_le_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the disposition after an attempt.
pub fn next_disposition(attempts: u32, outcome: &AttemptOutcome, max_attempts: u32) -> Disposition {
    match outcome {
        AttemptOutcome::Success { .. } => Disposition::Passed,
        AttemptOutcome::Failure { category, .. } if category.is_structural() => {
            Disposition::Problematic
        }
        AttemptOutcome::Failure { .. } if attempts >= max_attempts => Disposition::Problematic,
        AttemptOutcome::Failure { .. } => Disposition::Pending,
    }
}

/// Tracks attempt history and dispositions for every case in a run.
#[derive(Debug, Clone)]
pub struct AttemptTracker {
    max_attempts: u32,
    fingerprint: String,
    cases: BTreeMap<String, CaseState>,
    records: Vec<AttemptRecord>,
}

impl AttemptTracker {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            fingerprint: String::new(),
            cases: BTreeMap::new(),
            records: Vec::new(),
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    /// Rebuild a tracker from a snapshot.
    ///
    /// Fails when the snapshot is internally inconsistent, since resuming
    /// from corrupted bookkeeping could break the attempt bound.
    pub fn restore(snapshot: TrackerSnapshot) -> DomainResult<Self> {
        for state in snapshot.cases.values() {
            let recorded = snapshot
                .records
                .iter()
                .filter(|r| r.case_id == state.case_id)
                .count();
            if state.attempts as usize != recorded || state.attempts > snapshot.max_attempts {
                return Err(DomainError::Persistence(format!(
                    "tracker snapshot inconsistent for case {}: {} attempts, {} records, max {}",
                    state.case_id, state.attempts, recorded, snapshot.max_attempts
                )));
            }
        }
        Ok(Self {
            max_attempts: snapshot.max_attempts.max(1),
            fingerprint: snapshot.fingerprint,
            cases: snapshot.cases,
            records: snapshot.records,
        })
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            fingerprint: self.fingerprint.clone(),
            max_attempts: self.max_attempts,
            cases: self.cases.clone(),
            records: self.records.clone(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Start tracking a case in `pending`. Already known cases keep their
    /// state, which is what lets a resumed run pick up where it stopped.
    pub fn register(&mut self, case_id: &str, scenario_id: &str) {
        self.cases
            .entry(case_id.to_string())
            .or_insert_with(|| CaseState::new(case_id, scenario_id));
    }

    pub fn state(&self, case_id: &str) -> Option<&CaseState> {
        self.cases.get(case_id)
    }

    pub fn states(&self) -> impl Iterator<Item = &CaseState> {
        self.cases.values()
    }

    pub fn records(&self) -> &[AttemptRecord] {
        &self.records
    }

    pub fn records_for<'a>(&'a self, case_id: &'a str) -> impl Iterator<Item = &'a AttemptRecord> {
        self.records.iter().filter(move |r| r.case_id == case_id)
    }

    /// Failure context of the most recent attempt, if it failed.
    pub fn last_failure(&self, case_id: &str) -> Option<&FailureContext> {
        let index = self.cases.get(case_id)?.last_record?;
        self.records.get(index)?.outcome.failure_context()
    }

    pub fn is_terminal(&self, case_id: &str) -> DomainResult<bool> {
        Ok(self.known(case_id)?.disposition.is_terminal())
    }

    pub fn remaining_attempts(&self, case_id: &str) -> DomainResult<u32> {
        let state = self.known(case_id)?;
        if state.disposition.is_terminal() {
            return Ok(0);
        }
        Ok(self.max_attempts.saturating_sub(state.attempts))
    }

    /// Record one attempt and advance the case's state machine.
    ///
    /// The record and the new disposition are computed before anything is
    /// mutated, so a failed call leaves the tracker unchanged.
    pub fn record_attempt(
        &mut self,
        case_id: &str,
        flow: Option<FlowArtifact>,
        outcome: AttemptOutcome,
    ) -> DomainResult<AttemptRecord> {
        let state = self
            .cases
            .get(case_id)
            .ok_or_else(|| DomainError::UnknownCase(case_id.to_string()))?;

        if state.disposition.is_terminal() {
            return Err(DomainError::InvalidTransition {
                case_id: case_id.to_string(),
                from: state.disposition,
                reason: "case already reached a terminal disposition".to_string(),
            });
        }
        if state.attempts >= self.max_attempts {
            return Err(DomainError::InvalidTransition {
                case_id: case_id.to_string(),
                from: state.disposition,
                reason: format!("attempt budget of {} exhausted", self.max_attempts),
            });
        }

        let attempt = state.attempts + 1;
        let disposition = next_disposition(attempt, &outcome, self.max_attempts);
        let reason = match (&outcome, disposition) {
            (AttemptOutcome::Failure { category, .. }, Disposition::Problematic)
                if category.is_structural() =>
            {
                Some(format!("{category} failure, not retried"))
            }
            (_, Disposition::Problematic) => {
                Some(format!("max attempts ({}) exhausted", self.max_attempts))
            }
            _ => None,
        };
        let record = AttemptRecord {
            case_id: case_id.to_string(),
            scenario_id: state.scenario_id.clone(),
            attempt,
            flow,
            outcome,
            recorded_at: Utc::now(),
        };

        let index = self.records.len();
        self.records.push(record.clone());
        if let Some(state) = self.cases.get_mut(case_id) {
            state.attempts = attempt;
            state.disposition = disposition;
            state.last_record = Some(index);
            state.evidence.extend(record.outcome.evidence().iter().cloned());
            state.reason = reason;
        }

        tracing::debug!(
            case_id,
            attempt,
            disposition = %disposition,
            "attempt recorded"
        );
        Ok(record)
    }

    fn known(&self, case_id: &str) -> DomainResult<&CaseState> {
        self.cases
            .get(case_id)
            .ok_or_else(|| DomainError::UnknownCase(case_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::FailureCategory;

    fn failure(message: &str) -> AttemptOutcome {
        AttemptOutcome::failure(FailureCategory::Execution, FailureContext::new(message))
    }

    fn tracker(max: u32) -> AttemptTracker {
        let mut tracker = AttemptTracker::new(max);
        tracker.register("TC-1", "s1");
        tracker
    }

    #[test]
    fn test_new_case_is_pending_with_full_budget() {
        let tracker = tracker(3);
        let state = tracker.state("TC-1").unwrap();
        assert_eq!(state.disposition, Disposition::Pending);
        assert_eq!(state.attempts, 0);
        assert_eq!(tracker.remaining_attempts("TC-1").unwrap(), 3);
        assert!(!tracker.is_terminal("TC-1").unwrap());
    }

    #[test]
    fn test_success_passes_case() {
        let mut tracker = tracker(3);
        tracker.record_attempt("TC-1", None, failure("element not found")).unwrap();
        let record = tracker
            .record_attempt("TC-1", None, AttemptOutcome::success(vec![]))
            .unwrap();

        assert_eq!(record.attempt, 2);
        assert_eq!(tracker.state("TC-1").unwrap().disposition, Disposition::Passed);
        assert_eq!(tracker.remaining_attempts("TC-1").unwrap(), 0);
        assert!(tracker.last_failure("TC-1").is_none());
    }

    #[test]
    fn test_failures_exhaust_budget() {
        let mut tracker = tracker(2);
        tracker.record_attempt("TC-1", None, failure("one")).unwrap();
        assert_eq!(tracker.last_failure("TC-1").unwrap().message, "one");
        assert_eq!(tracker.remaining_attempts("TC-1").unwrap(), 1);

        tracker.record_attempt("TC-1", None, failure("two")).unwrap();
        let state = tracker.state("TC-1").unwrap();
        assert_eq!(state.disposition, Disposition::Problematic);
        assert!(state.reason.as_deref().unwrap().contains("exhausted"));
    }

    #[test]
    fn test_terminal_case_rejects_attempts() {
        let mut tracker = tracker(3);
        tracker
            .record_attempt("TC-1", None, AttemptOutcome::success(vec![]))
            .unwrap();
        let err = tracker.record_attempt("TC-1", None, failure("late")).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidTransition { from: Disposition::Passed, .. }
        ));
        assert_eq!(tracker.records().len(), 1);
    }

    #[test]
    fn test_structural_failure_is_immediately_problematic() {
        let mut tracker = tracker(5);
        let outcome = AttemptOutcome::failure(
            FailureCategory::Producer,
            FailureContext::new("producer returned no flow"),
        );
        tracker.record_attempt("TC-1", None, outcome).unwrap();
        let state = tracker.state("TC-1").unwrap();
        assert_eq!(state.attempts, 1);
        assert_eq!(state.disposition, Disposition::Problematic);
    }

    #[test]
    fn test_unknown_case() {
        let mut tracker = AttemptTracker::new(3);
        assert!(matches!(
            tracker.record_attempt("nope", None, failure("x")),
            Err(DomainError::UnknownCase(_))
        ));
        assert!(tracker.is_terminal("nope").is_err());
    }

    #[test]
    fn test_evidence_accumulates() {
        let mut tracker = tracker(3);
        let outcome = AttemptOutcome::failure(
            FailureCategory::Execution,
            FailureContext::new("boom").with_evidence(vec!["shot-1.png".into()]),
        );
        tracker.record_attempt("TC-1", None, outcome).unwrap();
        tracker
            .record_attempt("TC-1", None, AttemptOutcome::success(vec!["shot-2.png".into()]))
            .unwrap();
        assert_eq!(
            tracker.state("TC-1").unwrap().evidence,
            vec!["shot-1.png".to_string(), "shot-2.png".to_string()]
        );
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut tracker = tracker(3).with_fingerprint("abc");
        tracker.record_attempt("TC-1", None, failure("one")).unwrap();

        let restored = AttemptTracker::restore(tracker.snapshot()).unwrap();
        assert_eq!(restored.fingerprint(), "abc");
        assert_eq!(restored.remaining_attempts("TC-1").unwrap(), 2);
        assert_eq!(restored.last_failure("TC-1").unwrap().message, "one");
    }

    #[test]
    fn test_restore_rejects_inconsistent_snapshot() {
        let mut snapshot = tracker(3).snapshot();
        snapshot.cases.get_mut("TC-1").unwrap().attempts = 2;
        assert!(matches!(
            AttemptTracker::restore(snapshot),
            Err(DomainError::Persistence(_))
        ));
    }

    #[test]
    fn test_fingerprint_ignores_order_but_not_content() {
        let a = TestCase::new("TC-1", "A").with_step("x");
        let b = TestCase::new("TC-2", "B").with_step("y");
        let none = HashSet::new();

        let forward = run_fingerprint(&[a.clone(), b.clone()], &none, 3);
        assert_eq!(forward, run_fingerprint(&[b.clone(), a.clone()], &none, 3));
        assert_eq!(forward.len(), 64);
        assert_ne!(forward, run_fingerprint(&[a.clone(), b.clone()], &none, 4));

        let excluded: HashSet<String> = ["TC-2".to_string()].into_iter().collect();
        assert_ne!(forward, run_fingerprint(&[a, b], &excluded, 3));
    }

    #[test]
    fn test_next_disposition_table() {
        let ok = AttemptOutcome::success(vec![]);
        let fail = failure("x");
        assert_eq!(next_disposition(1, &ok, 3), Disposition::Passed);
        assert_eq!(next_disposition(3, &ok, 3), Disposition::Passed);
        assert_eq!(next_disposition(2, &fail, 3), Disposition::Pending);
        assert_eq!(next_disposition(3, &fail, 3), Disposition::Problematic);
    }
}
