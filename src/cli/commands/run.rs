//! Implementation of the `qa-automator run` command.

use anyhow::{bail, Context, Result};
use clap::Args;
use comfy_table::Cell;
use console::style;
use indicatif::ProgressBar;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::CaseInputArgs;
use crate::adapters::execution::{MaestroExecutor, ScriptedExecutor};
use crate::adapters::producers::{CommandFlowProducer, CommandProducerConfig, ScriptedFlowProducer};
use crate::adapters::report::{JsonReportWriter, RecordingReportSink};
use crate::adapters::snapshot::{InMemorySnapshotStore, JsonSnapshotStore};
use crate::cli::context::ProjectContext;
use crate::cli::display::{create_progress_bar, disposition_cell, list_table, ProgressReportSink};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::RunSummary;
use crate::domain::ports::{ExecutionCollaborator, FlowProducer, ReportSink, SnapshotStore};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{
    run_fingerprint, AttemptTracker, MemorySummary, NavigationMemory, OrchestratorConfig,
    OrchestratorPorts, RetryOrchestrator,
};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: CaseInputArgs,

    /// Maximum attempts per case, overrides retry.max_attempts
    #[arg(long, short = 'm')]
    pub max_attempts: Option<u32>,

    /// Run against scripted collaborators that pass every case; nothing is written
    #[arg(long)]
    pub dry_run: bool,

    /// Ignore saved attempt state and start every case from scratch
    #[arg(long)]
    pub fresh: bool,
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub dry_run: bool,
    pub scenarios: usize,
    pub excluded: usize,
    pub resumed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
    pub memory: MemorySummary,
    pub summary: RunSummary,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let summary = &self.summary;
        let mut table = list_table(&["case", "scenario", "status", "attempts", "reason"]);
        for case in &summary.cases {
            table.add_row(vec![
                Cell::new(&case.case_id),
                Cell::new(&case.scenario_id),
                disposition_cell(case.disposition),
                Cell::new(case.attempts),
                Cell::new(truncate(case.reason.as_deref().unwrap_or(""), 60)),
            ]);
        }

        let mut lines = vec![
            format!(
                "Run {}{}",
                style(summary.run_id).bold(),
                if self.dry_run { " (dry run)" } else { "" }
            ),
            table.to_string(),
            String::new(),
            format!(
                "{} passed, {} problematic, {} pending across {} scenario(s); {} excluded as already tested",
                style(summary.passed()).green().bold(),
                style(summary.problematic()).red().bold(),
                summary.pending(),
                self.scenarios,
                self.excluded
            ),
            format!(
                "Navigation memory: {} hypotheses across {} entry keys",
                self.memory.hypotheses, self.memory.entry_keys
            ),
        ];
        if self.resumed {
            lines.push("Resumed from saved attempt state.".to_string());
        }
        if summary.aborted {
            lines.push(format!(
                "{} {} (last consistent case: {})",
                style("Run aborted:").red().bold(),
                summary.abort_reason.as_deref().unwrap_or("unknown reason"),
                summary.last_consistent_case.as_deref().unwrap_or("none")
            ));
        }
        if let Some(path) = &self.report_path {
            lines.push(format!("Report: {}", path.display()));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: RunArgs, ctx: &ProjectContext, json_mode: bool) -> Result<()> {
    let mut config = ctx.config.clone();
    if let Some(max_attempts) = args.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    ConfigLoader::validate(&config)?;

    let loaded = args.input.load(&config.grouping).await?;
    let fingerprint = run_fingerprint(&loaded.cases, &loaded.excluded, config.retry.max_attempts);

    let store: Arc<dyn SnapshotStore> = if args.dry_run {
        let persisted = NavigationMemory::load(
            Arc::new(JsonSnapshotStore::new(ctx.state_dir())),
            config.memory.clone(),
        )
        .await;
        Arc::new(InMemorySnapshotStore::with_memory(persisted.snapshot().clone()))
    } else {
        let store = JsonSnapshotStore::new(ctx.state_dir());
        store.init().await.context("Failed to prepare state directory")?;
        Arc::new(store)
    };

    let (tracker, resumed) = restore_tracker(
        store.as_ref(),
        &fingerprint,
        config.retry.max_attempts,
        args.fresh || args.dry_run,
    )
    .await;
    let memory = NavigationMemory::load(Arc::clone(&store), config.memory.clone()).await;

    let flows_dir = ctx.flows_dir();
    let artifacts_dir = ctx.artifacts_dir();
    let (producer, executor): (Arc<dyn FlowProducer>, Arc<dyn ExecutionCollaborator>) =
        if args.dry_run {
            (
                Arc::new(ScriptedFlowProducer::with_flows_dir(flows_dir)),
                Arc::new(ScriptedExecutor::new()),
            )
        } else {
            let producer_config = CommandProducerConfig::from_producer(&config.producer, flows_dir)
                .context("No flow producer configured: set producer.command in .qa-automator/config.yaml or use --dry-run")?;
            (
                Arc::new(CommandFlowProducer::new(producer_config)),
                Arc::new(MaestroExecutor::new(ctx.maestro_config())),
            )
        };

    let (report, report_path): (Arc<dyn ReportSink>, Option<PathBuf>) = if args.dry_run {
        (Arc::new(RecordingReportSink::new()), None)
    } else {
        let writer = JsonReportWriter::new(artifacts_dir);
        let path = writer.report_path();
        (Arc::new(writer), Some(path))
    };

    let total: usize = loaded.scenarios.iter().map(|s| s.case_ids.len()).sum();
    let already_done = loaded
        .scenarios
        .iter()
        .flat_map(|s| &s.case_ids)
        .filter(|id| tracker.state(id).is_some_and(|s| s.disposition.is_terminal()))
        .count();
    let bar = if json_mode {
        ProgressBar::hidden()
    } else {
        create_progress_bar(total as u64)
    };
    bar.set_position(already_done as u64);

    let ports = OrchestratorPorts {
        producer,
        executor,
        sink: Arc::new(ProgressReportSink::new(report, bar.clone())),
        store,
    };

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            signal_token.cancel();
        }
    });

    let mut orchestrator = RetryOrchestrator::new(memory, tracker, ports, OrchestratorConfig::from(&config))
        .with_target(ctx.device_target())
        .with_cancellation(cancel);
    let result = orchestrator.run(&loaded.scenarios, &loaded.cases).await;
    signal_task.abort();
    bar.finish_and_clear();
    let summary = result.context("Run failed")?;

    let aborted = summary.aborted;
    let abort_reason = summary.abort_reason.clone();
    let output_data = RunOutput {
        dry_run: args.dry_run,
        scenarios: loaded.scenarios.len(),
        excluded: loaded.excluded.len(),
        resumed,
        report_path,
        memory: orchestrator.memory().summary(),
        summary,
    };
    output(&output_data, json_mode);

    if aborted {
        bail!(
            "run aborted: {}",
            abort_reason.unwrap_or_else(|| "unknown reason".to_string())
        );
    }
    Ok(())
}

/// Resume the saved tracker when it belongs to the same inputs.
///
/// Returns the tracker and whether it was resumed.
async fn restore_tracker(
    store: &dyn SnapshotStore,
    fingerprint: &str,
    max_attempts: u32,
    fresh: bool,
) -> (AttemptTracker, bool) {
    let new_tracker = || AttemptTracker::new(max_attempts).with_fingerprint(fingerprint);
    if fresh {
        return (new_tracker(), false);
    }

    match store.load_tracker().await {
        Ok(Some(snapshot)) if snapshot.fingerprint == fingerprint => {
            match AttemptTracker::restore(snapshot) {
                Ok(tracker) => {
                    tracing::info!(
                        records = tracker.records().len(),
                        "resuming from saved attempt state"
                    );
                    (tracker, true)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "saved attempt state is inconsistent, starting fresh");
                    (new_tracker(), false)
                }
            }
        }
        Ok(Some(snapshot)) => {
            tracing::info!(
                saved = %snapshot.fingerprint,
                current = %fingerprint,
                "saved attempt state is for different inputs, starting fresh"
            );
            (new_tracker(), false)
        }
        Ok(None) => (new_tracker(), false),
        Err(err) => {
            tracing::warn!(error = %err, "saved attempt state unreadable, starting fresh");
            (new_tracker(), false)
        }
    }
}
