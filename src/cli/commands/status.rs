//! Implementation of the `qa-automator status` command.

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use crate::adapters::snapshot::JsonSnapshotStore;
use crate::cli::context::ProjectContext;
use crate::cli::display::{disposition_cell, list_table, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{CaseSummary, Disposition, TrackerSnapshot};
use crate::domain::ports::SnapshotStore;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only list problematic cases
    #[arg(long)]
    pub problematic: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub found: bool,
    pub fingerprint: Option<String>,
    pub max_attempts: Option<u32>,
    pub attempts_recorded: usize,
    pub passed: usize,
    pub problematic: usize,
    pub pending: usize,
    pub cases: Vec<CaseSummary>,
}

impl StatusOutput {
    fn empty() -> Self {
        Self {
            found: false,
            fingerprint: None,
            max_attempts: None,
            attempts_recorded: 0,
            passed: 0,
            problematic: 0,
            pending: 0,
            cases: vec![],
        }
    }

    fn from_snapshot(snapshot: &TrackerSnapshot, problematic_only: bool) -> Self {
        let count = |d: Disposition| snapshot.cases.values().filter(|c| c.disposition == d).count();
        Self {
            found: true,
            fingerprint: Some(snapshot.fingerprint.clone()),
            max_attempts: Some(snapshot.max_attempts),
            attempts_recorded: snapshot.records.len(),
            passed: count(Disposition::Passed),
            problematic: count(Disposition::Problematic),
            pending: count(Disposition::Pending),
            cases: snapshot
                .cases
                .values()
                .filter(|c| !problematic_only || c.disposition == Disposition::Problematic)
                .map(CaseSummary::from)
                .collect(),
        }
    }
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        if !self.found {
            return "No saved run state. Start one with `qa-automator run`.".to_string();
        }
        let mut table = list_table(&["case", "scenario", "status", "attempts", "reason"]);
        for case in &self.cases {
            table.add_row(vec![
                Cell::new(&case.case_id),
                Cell::new(&case.scenario_id),
                disposition_cell(case.disposition),
                Cell::new(case.attempts),
                Cell::new(truncate(case.reason.as_deref().unwrap_or(""), 60)),
            ]);
        }
        format!(
            "{}\n\n{} passed, {} problematic, {} pending ({} attempts recorded, max {} per case)",
            render_list("case", table, self.cases.len()),
            self.passed,
            self.problematic,
            self.pending,
            self.attempts_recorded,
            self.max_attempts.unwrap_or_default()
        )
    }
}

pub async fn execute(args: StatusArgs, ctx: &ProjectContext, json_mode: bool) -> Result<()> {
    let store = JsonSnapshotStore::new(ctx.state_dir());
    let snapshot = store
        .load_tracker()
        .await
        .context("Failed to read saved attempt state")?;
    let output_data = match snapshot {
        Some(snapshot) => StatusOutput::from_snapshot(&snapshot, args.problematic),
        None => StatusOutput::empty(),
    };
    output(&output_data, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CaseState;

    #[test]
    fn test_status_counts_and_filter() {
        let mut snapshot = TrackerSnapshot {
            fingerprint: "abc".into(),
            max_attempts: 3,
            cases: Default::default(),
            records: vec![],
        };
        let mut passed = CaseState::new("TC-1", "s1");
        passed.disposition = Disposition::Passed;
        passed.attempts = 1;
        let mut problematic = CaseState::new("TC-2", "s1");
        problematic.disposition = Disposition::Problematic;
        problematic.attempts = 3;
        problematic.reason = Some("element not found".into());
        snapshot.cases.insert("TC-1".into(), passed);
        snapshot.cases.insert("TC-2".into(), problematic);
        snapshot.cases.insert("TC-3".into(), CaseState::new("TC-3", "s2"));

        let all = StatusOutput::from_snapshot(&snapshot, false);
        assert_eq!((all.passed, all.problematic, all.pending), (1, 1, 1));
        assert_eq!(all.cases.len(), 3);

        let filtered = StatusOutput::from_snapshot(&snapshot, true);
        assert_eq!(filtered.cases.len(), 1);
        assert_eq!(filtered.cases[0].case_id, "TC-2");
        assert!(filtered.to_human().contains("element not found"));
    }
}
