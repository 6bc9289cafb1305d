//! Retry orchestrator - drives every case through the bounded
//! produce/execute/observe loop.
//!
//! Cases run strictly one after another in scenario precedence order.
//! For each attempt the orchestrator:
//!
//! 1. prepares the device when the attempt is the first of a new
//!    scenario (app install or reinstall, see
//!    [`ExecutionCollaborator::prepare_scenario`]),
//! 2. asks the flow producer for a flow, passing the navigation hint and
//!    the last failure context,
//! 3. runs the flow through the execution collaborator,
//! 4. records the attempt in the tracker and persists the tracker,
//! 5. feeds the outcome back into navigation memory.
//!
//! Producer and executor calls are raced against their timeouts and the
//! run's cancellation token. A cancelled attempt leaves no record behind.

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AttemptOutcome, CaseSummary, Config, DeviceTarget, EntryKey, FailureCategory, FailureContext,
    FlowArtifact, NavigationHypothesis, NavigationPath, ObservationOutcome, RunSummary, Scenario,
    TestCase,
};
use crate::domain::ports::{
    ExecutionCollaborator, ExecutionError, ExecutionOutcome, FlowProducer, FlowRequest,
    ProducerError, ReportSink, SnapshotStore,
};
use crate::services::attempt_tracker::AttemptTracker;
use crate::services::navigation_memory::NavigationMemory;

/// Timing knobs for the retry loop.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub producer_timeout: Duration,
    pub execution_timeout: Duration,
    /// Delay before the second attempt of a case. Zero disables backoff.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            producer_timeout: Duration::from_secs(config.timeouts.producer_secs),
            execution_timeout: Duration::from_secs(config.timeouts.execution_secs),
            initial_backoff: Duration::from_millis(config.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.retry.max_backoff_ms),
        }
    }
}

/// External collaborators the orchestrator talks to.
#[derive(Clone)]
pub struct OrchestratorPorts {
    pub producer: Arc<dyn FlowProducer>,
    pub executor: Arc<dyn ExecutionCollaborator>,
    pub sink: Arc<dyn ReportSink>,
    pub store: Arc<dyn SnapshotStore>,
}

/// Result of racing a collaborator call against timeout and cancellation.
enum Guarded<T> {
    Done(T),
    TimedOut,
    Cancelled,
}

/// What one attempt produced before it is handed to the tracker.
struct AttemptResult {
    flow: Option<FlowArtifact>,
    outcome: AttemptOutcome,
    /// Path reported by the executor on success.
    observed_path: Option<NavigationPath>,
}

enum CaseRun {
    Finished,
    Cancelled,
}

pub struct RetryOrchestrator {
    memory: NavigationMemory,
    tracker: AttemptTracker,
    ports: OrchestratorPorts,
    config: OrchestratorConfig,
    target: DeviceTarget,
    cancel: CancellationToken,
    last_consistent_case: Option<String>,
    /// Scenario the device was last prepared for.
    prepared_scenario: Option<String>,
}

impl RetryOrchestrator {
    pub fn new(
        memory: NavigationMemory,
        tracker: AttemptTracker,
        ports: OrchestratorPorts,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            memory,
            tracker,
            ports,
            config,
            target: DeviceTarget::default(),
            cancel: CancellationToken::new(),
            last_consistent_case: None,
            prepared_scenario: None,
        }
    }

    pub fn with_target(mut self, target: DeviceTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn tracker(&self) -> &AttemptTracker {
        &self.tracker
    }

    pub fn memory(&self) -> &NavigationMemory {
        &self.memory
    }

    pub fn into_parts(self) -> (NavigationMemory, AttemptTracker) {
        (self.memory, self.tracker)
    }

    /// Run every scenario to completion.
    ///
    /// Returns a summary with `aborted = true` when the run was cancelled
    /// or state could not be persisted. Errors that mean the bookkeeping
    /// itself is wrong are returned as `Err`.
    #[instrument(skip_all, fields(scenarios = scenarios.len(), cases = cases.len()))]
    pub async fn run(&mut self, scenarios: &[Scenario], cases: &[TestCase]) -> DomainResult<RunSummary> {
        let started_at = Utc::now();
        let by_id: HashMap<&str, &TestCase> = cases.iter().map(|c| (c.id.as_str(), c)).collect();

        for scenario in scenarios {
            for case_id in &scenario.case_ids {
                if !by_id.contains_key(case_id.as_str()) {
                    return Err(DomainError::input(format!(
                        "scenario {} references unknown case {case_id}",
                        scenario.id
                    )));
                }
                self.tracker.register(case_id, &scenario.id);
            }
        }

        if let Err(err) = self.persist_tracker().await {
            return Ok(self.finish(started_at, scenarios, Some(err.to_string())).await);
        }

        tracing::info!(
            max_attempts = self.tracker.max_attempts(),
            "starting orchestration run"
        );

        for scenario in scenarios {
            for case_id in &scenario.case_ids {
                let Some(case) = by_id.get(case_id.as_str()) else {
                    continue;
                };
                if self.tracker.is_terminal(case_id)? {
                    tracing::debug!(case_id = %case_id, "case already terminal, skipping");
                    continue;
                }

                match self.run_case(scenario, case).await {
                    Ok(CaseRun::Finished) => {}
                    Ok(CaseRun::Cancelled) => {
                        tracing::warn!(case_id = %case_id, "run cancelled");
                        let reason = format!("cancelled while processing case {case_id}");
                        return Ok(self.finish(started_at, scenarios, Some(reason)).await);
                    }
                    Err(DomainError::Persistence(message)) => {
                        tracing::error!(case_id = %case_id, error = %message, "state could not be persisted, aborting run");
                        return Ok(self.finish(started_at, scenarios, Some(message)).await);
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(self.finish(started_at, scenarios, None).await)
    }

    /// Drive one case until it is terminal or the run is cancelled.
    #[instrument(skip(self, scenario, case), fields(scenario_id = %scenario.id, case_id = %case.id))]
    async fn run_case(&mut self, scenario: &Scenario, case: &TestCase) -> DomainResult<CaseRun> {
        let key = EntryKey::new(&scenario.id, case.entry_point());
        let hint = self.navigation_hint(&key, case).await?;
        let skip_onboarding = !case.is_onboarding;
        let mut backoff = self.backoff();

        loop {
            if self.tracker.is_terminal(&case.id)? {
                return Ok(CaseRun::Finished);
            }
            if self.cancel.is_cancelled() {
                return Ok(CaseRun::Cancelled);
            }

            let attempt = self
                .tracker
                .state(&case.id)
                .map(|s| s.attempts + 1)
                .ok_or_else(|| DomainError::UnknownCase(case.id.clone()))?;
            let request = FlowRequest {
                case: case.clone(),
                scenario_id: scenario.id.clone(),
                app_id: self.target.app_id.clone(),
                attempt,
                skip_onboarding,
                navigation_hint: hint.clone(),
                prior_failure: self.tracker.last_failure(&case.id).cloned(),
            };

            tracing::info!(attempt, remaining = self.tracker.remaining_attempts(&case.id)?, "starting attempt");
            let Some(result) = self.attempt(request).await else {
                return Ok(CaseRun::Cancelled);
            };

            let observation = observation_path(&result, hint.as_ref());
            let record = self
                .tracker
                .record_attempt(&case.id, result.flow, result.outcome)?;
            self.persist_tracker().await?;
            self.last_consistent_case = Some(case.id.clone());
            self.ports
                .sink
                .attempt_recorded(&case.id, &scenario.id, &record)
                .await;

            if let Some(path) = observation {
                let outcome = if record.outcome.is_success() {
                    ObservationOutcome::Positive
                } else {
                    ObservationOutcome::Negative
                };
                self.memory.record_observation(&key, &path, outcome).await?;
            }

            match &record.outcome {
                AttemptOutcome::Success { .. } => {
                    tracing::info!(attempt, "case passed");
                }
                AttemptOutcome::Failure { category, context } => {
                    tracing::warn!(
                        attempt,
                        category = %category,
                        error = %context.message,
                        "attempt failed"
                    );
                }
            }

            if let Some(state) = self.tracker.state(&case.id).filter(|s| s.disposition.is_terminal()) {
                self.ports
                    .sink
                    .case_finished(&case.id, state.disposition, &state.evidence)
                    .await;
                return Ok(CaseRun::Finished);
            }

            if let Some(delay) = backoff.as_mut().and_then(|b| b.next_backoff()) {
                tracing::debug!(delay_ms = delay.as_millis() as u64, "backing off before next attempt");
                tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(CaseRun::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    /// Best known hypothesis for the key, seeding a heuristic one if the
    /// memory has nothing yet.
    async fn navigation_hint(
        &mut self,
        key: &EntryKey,
        case: &TestCase,
    ) -> DomainResult<Option<NavigationHypothesis>> {
        if let Some(top) = self.memory.top(key) {
            tracing::debug!(entry_key = %key, path = %top.path, confidence = top.confidence, "using remembered navigation");
            return Ok(Some(top));
        }
        let Some(path) = self.ports.producer.heuristic_entry(case) else {
            return Ok(None);
        };
        self.memory.seed_heuristic(key, &path).await?;
        tracing::debug!(entry_key = %key, path = %path, "seeded heuristic navigation");
        Ok(self.memory.top(key))
    }

    /// Prepare the device for `scenario_id` unless that already happened.
    ///
    /// A failed preparation becomes a retryable attempt without a flow,
    /// so it never counts against a navigation path. `None` means the run
    /// was cancelled.
    async fn prepare_scenario(&mut self, scenario_id: &str) -> Option<Result<(), AttemptResult>> {
        if self.prepared_scenario.as_deref() == Some(scenario_id) {
            return Some(Ok(()));
        }

        let executor = Arc::clone(&self.ports.executor);
        let failure = match self
            .guarded(
                self.config.execution_timeout,
                executor.prepare_scenario(scenario_id, &self.target),
            )
            .await
        {
            Guarded::Cancelled => return None,
            Guarded::Done(Ok(evidence)) => {
                tracing::debug!(scenario_id, evidence = evidence.len(), "device prepared for scenario");
                self.prepared_scenario = Some(scenario_id.to_string());
                return Some(Ok(()));
            }
            Guarded::TimedOut => AttemptOutcome::failure(
                FailureCategory::Timeout,
                FailureContext::new(format!(
                    "scenario preparation timed out after {}s",
                    self.config.execution_timeout.as_secs_f64()
                ))
                .with_cause("app_install_timeout"),
            ),
            Guarded::Done(Err(err)) => {
                let cause = match err {
                    ExecutionError::Launch(_) => "install_backend_not_found",
                    _ => "app_install_failed",
                };
                AttemptOutcome::failure(
                    FailureCategory::Execution,
                    FailureContext::new(err.to_string())
                        .with_evidence(err.evidence().to_vec())
                        .with_cause(cause),
                )
            }
        };

        tracing::warn!(scenario_id, "scenario preparation failed");
        Some(Err(AttemptResult {
            flow: None,
            outcome: failure,
            observed_path: None,
        }))
    }

    /// One prepare/produce/execute cycle. `None` means the run was cancelled.
    async fn attempt(&mut self, request: FlowRequest) -> Option<AttemptResult> {
        if let Err(failed) = self.prepare_scenario(&request.scenario_id).await? {
            return Some(failed);
        }

        let producer = Arc::clone(&self.ports.producer);
        let flow = match self
            .guarded(self.config.producer_timeout, producer.produce_flow(request))
            .await
        {
            Guarded::Cancelled => return None,
            Guarded::TimedOut => {
                return Some(AttemptResult {
                    flow: None,
                    outcome: AttemptOutcome::failure(
                        FailureCategory::Timeout,
                        FailureContext::new(format!(
                            "flow producer timed out after {}s",
                            self.config.producer_timeout.as_secs_f64()
                        ))
                        .with_cause("producer_timeout"),
                    ),
                    observed_path: None,
                });
            }
            Guarded::Done(Err(err)) => {
                let category = match err {
                    ProducerError::UnsupportedCase(_) => FailureCategory::Input,
                    _ => FailureCategory::Producer,
                };
                return Some(AttemptResult {
                    flow: None,
                    outcome: AttemptOutcome::failure(category, FailureContext::new(err.to_string())),
                    observed_path: None,
                });
            }
            Guarded::Done(Ok(flow)) => flow,
        };

        let executor = Arc::clone(&self.ports.executor);
        let (outcome, observed_path) = match self
            .guarded(self.config.execution_timeout, executor.execute(&flow, &self.target))
            .await
        {
            Guarded::Cancelled => return None,
            Guarded::TimedOut => (
                AttemptOutcome::failure(
                    FailureCategory::Timeout,
                    FailureContext::new(format!(
                        "flow execution timed out after {}s",
                        self.config.execution_timeout.as_secs_f64()
                    ))
                    .with_cause("timeout"),
                ),
                None,
            ),
            Guarded::Done(Err(err)) => (
                AttemptOutcome::failure(FailureCategory::Execution, FailureContext::new(err.to_string())),
                None,
            ),
            Guarded::Done(Ok(ExecutionOutcome::Success { evidence, observed_path })) => {
                (AttemptOutcome::success(evidence), observed_path)
            }
            Guarded::Done(Ok(ExecutionOutcome::Failure { message, evidence, cause })) => (
                AttemptOutcome::failure(
                    FailureCategory::Execution,
                    FailureContext {
                        message,
                        evidence,
                        cause,
                    },
                ),
                None,
            ),
            Guarded::Done(Ok(ExecutionOutcome::TimedOut { evidence })) => (
                AttemptOutcome::failure(
                    FailureCategory::Timeout,
                    FailureContext::new("executor reported a timeout")
                        .with_evidence(evidence)
                        .with_cause("timeout"),
                ),
                None,
            ),
        };

        Some(AttemptResult {
            flow: Some(flow),
            outcome,
            observed_path,
        })
    }

    async fn guarded<F, T>(&self, limit: Duration, future: F) -> Guarded<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Guarded::Cancelled,
            result = tokio::time::timeout(limit, future) => match result {
                Ok(value) => Guarded::Done(value),
                Err(_) => Guarded::TimedOut,
            },
        }
    }

    fn backoff(&self) -> Option<ExponentialBackoff> {
        if self.config.initial_backoff.is_zero() {
            return None;
        }
        Some(
            ExponentialBackoffBuilder::new()
                .with_initial_interval(self.config.initial_backoff)
                .with_max_interval(self.config.max_backoff.max(self.config.initial_backoff))
                .with_multiplier(2.0)
                .with_randomization_factor(0.0)
                .with_max_elapsed_time(None)
                .build(),
        )
    }

    async fn persist_tracker(&self) -> DomainResult<()> {
        self.ports.store.save_tracker(&self.tracker.snapshot()).await
    }

    async fn finish(
        &self,
        started_at: DateTime<Utc>,
        scenarios: &[Scenario],
        abort_reason: Option<String>,
    ) -> RunSummary {
        let cases = scenarios
            .iter()
            .flat_map(|s| s.case_ids.iter())
            .filter_map(|id| self.tracker.state(id))
            .map(CaseSummary::from)
            .collect();

        let summary = RunSummary {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            cases,
            aborted: abort_reason.is_some(),
            last_consistent_case: self.last_consistent_case.clone(),
            abort_reason,
        };

        tracing::info!(
            run_id = %summary.run_id,
            passed = summary.passed(),
            problematic = summary.problematic(),
            pending = summary.pending(),
            aborted = summary.aborted,
            "orchestration run finished"
        );
        self.ports.sink.run_finished(&summary).await;
        summary
    }
}

/// Path the attempt tells us something about.
///
/// Attempts that never produced a flow say nothing about navigation.
fn observation_path(
    result: &AttemptResult,
    hint: Option<&NavigationHypothesis>,
) -> Option<NavigationPath> {
    let flow = result.flow.as_ref()?;
    let hinted = || hint.map(|h| h.path.clone());
    let path = if result.outcome.is_success() {
        result
            .observed_path
            .clone()
            .or_else(|| flow.navigation_path.clone())
            .or_else(hinted)
    } else {
        flow.navigation_path.clone().or_else(hinted)
    };
    Some(path.unwrap_or_default())
}
