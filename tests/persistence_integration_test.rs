//! Runs against the JSON snapshot store and report writer on disk.

mod common;

use std::sync::Arc;

use qa_automator::adapters::execution::{ScriptedExecutor, ScriptedRun};
use qa_automator::adapters::producers::ScriptedFlowProducer;
use qa_automator::adapters::report::JsonReportWriter;
use qa_automator::adapters::snapshot::JsonSnapshotStore;
use qa_automator::domain::models::{Disposition, EntryKey, MemoryConfig};
use qa_automator::domain::ports::{ExecutionOutcome, SnapshotStore};
use qa_automator::services::{
    AttemptTracker, NavigationMemory, OrchestratorPorts, RetryOrchestrator,
};
use tempfile::TempDir;

use common::{fast_config, group, login_case};

#[tokio::test]
async fn test_run_state_and_report_survive_on_disk() {
    let dir = TempDir::new().unwrap();
    let state_dir = dir.path().join("state");
    let artifacts_dir = dir.path().join("artifacts");

    let store = Arc::new(JsonSnapshotStore::new(&state_dir));
    store.init().await.unwrap();
    let writer = Arc::new(JsonReportWriter::new(&artifacts_dir));
    let executor = Arc::new(ScriptedExecutor::new());
    executor.push(ScriptedRun::Outcome(ExecutionOutcome::failure("Element not found: Login")));

    let ports = OrchestratorPorts {
        producer: Arc::new(ScriptedFlowProducer::new()),
        executor,
        sink: writer.clone(),
        store: store.clone(),
    };
    let memory = NavigationMemory::load(store.clone(), MemoryConfig::default()).await;
    let tracker = AttemptTracker::new(3).with_fingerprint("disk");
    let mut orchestrator = RetryOrchestrator::new(memory, tracker, ports, fast_config());

    let cases = vec![login_case("TC-1")];
    let scenarios = group(&cases);
    let summary = orchestrator.run(&scenarios, &cases).await.unwrap();
    assert_eq!(summary.passed(), 1);

    let report = JsonReportWriter::load(&writer.report_path()).await.unwrap();
    assert_eq!(report.run_id, Some(summary.run_id));
    assert_eq!(report.totals.passed, 1);
    let entry = &report.tests[0];
    assert_eq!(entry.id, "TC-1");
    assert_eq!(entry.status, Disposition::Passed);
    assert_eq!(entry.attempts, 2);
    assert_eq!(entry.history.len(), 2);
    assert_eq!(
        std::fs::read_to_string(writer.attempts_path()).unwrap().lines().count(),
        2
    );

    let reopened = Arc::new(JsonSnapshotStore::new(&state_dir));
    let reloaded = NavigationMemory::load(reopened.clone(), MemoryConfig::default()).await;
    let key = EntryKey::new(&scenarios[0].id, "auth/login");
    let before = orchestrator.memory().lookup(&key);
    let after = reloaded.lookup(&key);
    assert_eq!(after.len(), before.len());
    for (a, b) in after.iter().zip(&before) {
        assert_eq!(a.path, b.path);
        assert_eq!((a.successes, a.failures), (b.successes, b.failures));
        assert!((a.confidence - b.confidence).abs() < 1e-12);
    }

    let saved = reopened.load_tracker().await.unwrap().unwrap();
    assert_eq!(saved.fingerprint, "disk");
    let restored = AttemptTracker::restore(saved).unwrap();
    assert_eq!(restored.records().len(), 2);
    assert_eq!(restored.state("TC-1").unwrap().disposition, Disposition::Passed);
}

#[tokio::test]
async fn test_corrupt_memory_file_starts_cold() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonSnapshotStore::new(dir.path()));
    store.init().await.unwrap();
    std::fs::write(store.memory_path(), "{ not json").unwrap();

    let mut memory = NavigationMemory::load(store.clone(), MemoryConfig::default()).await;
    assert_eq!(memory.summary().hypotheses, 0);

    // The next write replaces the damaged file with a valid snapshot.
    let key = EntryKey::new("auth", "auth/login");
    memory
        .seed_heuristic(&key, &qa_automator::NavigationPath::new(["auth/login"]))
        .await
        .unwrap();
    let snapshot = store.load_memory().await.unwrap().unwrap();
    assert_eq!(snapshot.hypothesis_count(), 1);
}

#[tokio::test]
async fn test_init_discards_interrupted_writes() {
    let dir = TempDir::new().unwrap();
    let leftover = dir.path().join("attempt_state.json.tmp");
    std::fs::write(&leftover, "{\"partial\": ").unwrap();

    let store = JsonSnapshotStore::new(dir.path());
    store.init().await.unwrap();

    assert!(!leftover.exists());
    assert!(store.load_tracker().await.unwrap().is_none());
}
