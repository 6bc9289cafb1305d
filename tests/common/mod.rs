//! Common test utilities for integration tests
//!
//! Provides shared fixtures and a harness wiring the orchestrator to the
//! scripted collaborators.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use qa_automator::adapters::execution::ScriptedExecutor;
use qa_automator::adapters::producers::ScriptedFlowProducer;
use qa_automator::adapters::report::RecordingReportSink;
use qa_automator::adapters::snapshot::InMemorySnapshotStore;
use qa_automator::domain::models::{GroupingConfig, MemoryConfig, MemorySnapshot, Scenario, TestCase};
use qa_automator::services::{
    AttemptTracker, CaseGrouper, NavigationMemory, OrchestratorConfig, OrchestratorPorts,
    RetryOrchestrator,
};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A login case; its entry point is inferred as `auth/login`.
pub fn login_case(id: &str) -> TestCase {
    TestCase::new(id, "Login with valid credentials")
        .with_step("Open the app")
        .with_step("Sign in with a valid user")
        .with_step("Verify the home screen is shown")
}

/// Short timeouts, no backoff.
pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        producer_timeout: Duration::from_millis(200),
        execution_timeout: Duration::from_millis(200),
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    }
}

/// Group with the default policy and no exclusions.
pub fn group(cases: &[TestCase]) -> Vec<Scenario> {
    CaseGrouper::new(GroupingConfig::default())
        .group(cases, &HashSet::new())
        .expect("cases should group")
}

pub struct Harness {
    pub producer: Arc<ScriptedFlowProducer>,
    pub executor: Arc<ScriptedExecutor>,
    pub sink: Arc<RecordingReportSink>,
    pub store: Arc<InMemorySnapshotStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(InMemorySnapshotStore::new())
    }

    pub fn with_memory(snapshot: MemorySnapshot) -> Self {
        Self::with_store(InMemorySnapshotStore::with_memory(snapshot))
    }

    fn with_store(store: InMemorySnapshotStore) -> Self {
        Self {
            producer: Arc::new(ScriptedFlowProducer::new()),
            executor: Arc::new(ScriptedExecutor::new()),
            sink: Arc::new(RecordingReportSink::new()),
            store: Arc::new(store),
        }
    }

    pub fn ports(&self) -> OrchestratorPorts {
        OrchestratorPorts {
            producer: self.producer.clone(),
            executor: self.executor.clone(),
            sink: self.sink.clone(),
            store: self.store.clone(),
        }
    }

    pub async fn memory(&self) -> NavigationMemory {
        NavigationMemory::load(self.store.clone(), MemoryConfig::default()).await
    }

    pub async fn orchestrator(&self, max_attempts: u32) -> RetryOrchestrator {
        let tracker = AttemptTracker::new(max_attempts).with_fingerprint("integration");
        self.orchestrator_with(tracker, fast_config()).await
    }

    pub async fn orchestrator_with(
        &self,
        tracker: AttemptTracker,
        config: OrchestratorConfig,
    ) -> RetryOrchestrator {
        RetryOrchestrator::new(self.memory().await, tracker, self.ports(), config)
    }
}
