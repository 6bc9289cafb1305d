//! Implementation of the `qa-automator memory` command.

use anyhow::{anyhow, Result};
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;
use std::sync::Arc;

use crate::adapters::snapshot::JsonSnapshotStore;
use crate::cli::context::ProjectContext;
use crate::cli::display::{confidence_cell, list_table, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{EntryKey, NavigationHypothesis};
use crate::services::{MemorySummary, NavigationMemory};

#[derive(Args, Debug)]
pub struct MemoryArgs {
    /// Show every hypothesis for one entry key (`<scenario>::<entry point>`)
    #[arg(long, short)]
    pub entry: Option<String>,

    /// Maximum number of entry keys to list
    #[arg(long, short, default_value = "50")]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct EntryRow {
    pub entry_key: String,
    pub hypotheses: usize,
    pub top: Option<NavigationHypothesis>,
}

#[derive(Debug, Serialize)]
pub struct MemoryListOutput {
    pub summary: MemorySummary,
    pub entries: Vec<EntryRow>,
}

impl CommandOutput for MemoryListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["entry key", "hypotheses", "best path", "confidence", "source"]);
        for row in &self.entries {
            let (path, confidence, source) = match &row.top {
                Some(top) => (
                    top.path.to_string(),
                    confidence_cell(top.confidence),
                    Cell::new(top.provenance.as_str()),
                ),
                None => (String::new(), Cell::new(""), Cell::new("")),
            };
            table.add_row(vec![
                Cell::new(&row.entry_key),
                Cell::new(row.hypotheses),
                Cell::new(truncate(&path, 50)),
                confidence,
                source,
            ]);
        }
        format!(
            "{}\n\n{} hypotheses ({} observed, {} heuristic) across {} entry keys",
            render_list("entry key", table, self.entries.len()),
            self.summary.hypotheses,
            self.summary.observed,
            self.summary.heuristic,
            self.summary.entry_keys
        )
    }
}

#[derive(Debug, Serialize)]
pub struct MemoryEntryOutput {
    pub entry_key: String,
    pub hypotheses: Vec<NavigationHypothesis>,
}

impl CommandOutput for MemoryEntryOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["rank", "path", "confidence", "source", "ok", "failed"]);
        for (rank, hypothesis) in self.hypotheses.iter().enumerate() {
            table.add_row(vec![
                Cell::new(rank + 1),
                Cell::new(hypothesis.path.to_string()),
                confidence_cell(hypothesis.confidence),
                Cell::new(hypothesis.provenance.as_str()),
                Cell::new(hypothesis.successes),
                Cell::new(hypothesis.failures),
            ]);
        }
        format!(
            "{}\n{}",
            self.entry_key,
            render_list("hypothesis", table, self.hypotheses.len())
        )
    }
}

pub async fn execute(args: MemoryArgs, ctx: &ProjectContext, json_mode: bool) -> Result<()> {
    let store = Arc::new(JsonSnapshotStore::new(ctx.state_dir()));
    let memory = NavigationMemory::load(store, ctx.config.memory.clone()).await;

    match args.entry {
        Some(raw) => {
            let key = EntryKey::try_from(raw).map_err(|err| anyhow!(err))?;
            let output_data = MemoryEntryOutput {
                entry_key: key.to_string(),
                hypotheses: memory.lookup(&key),
            };
            output(&output_data, json_mode);
        }
        None => {
            let entries = memory
                .snapshot()
                .entries
                .keys()
                .take(args.limit)
                .map(|key| EntryRow {
                    entry_key: key.to_string(),
                    hypotheses: memory.lookup(key).len(),
                    top: memory.top(key),
                })
                .collect();
            let output_data = MemoryListOutput {
                summary: memory.summary(),
                entries,
            };
            output(&output_data, json_mode);
        }
    }
    Ok(())
}
