//! Scripted execution collaborator for tests and dry runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::domain::models::{DeviceTarget, FlowArtifact};
use crate::domain::ports::{ExecutionCollaborator, ExecutionError, ExecutionOutcome};

/// One scripted reaction to an execute call.
#[derive(Debug, Clone)]
pub enum ScriptedRun {
    Outcome(ExecutionOutcome),
    /// Fail to reach the device at all.
    DeviceError(String),
    /// Never answer.
    Hang,
}

/// Answers execute calls from a FIFO script, falling back to a default
/// outcome once the script runs dry.
#[derive(Debug)]
pub struct ScriptedExecutor {
    fallback: ExecutionOutcome,
    script: Mutex<VecDeque<ScriptedRun>>,
    executed: Mutex<Vec<FlowArtifact>>,
    prepare_failures: Mutex<VecDeque<String>>,
    prepared: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    /// Executor whose unscripted calls succeed.
    pub fn new() -> Self {
        Self::with_fallback(ExecutionOutcome::success())
    }

    pub fn with_fallback(fallback: ExecutionOutcome) -> Self {
        Self {
            fallback,
            script: Mutex::new(VecDeque::new()),
            executed: Mutex::new(Vec::new()),
            prepare_failures: Mutex::new(VecDeque::new()),
            prepared: Mutex::new(Vec::new()),
        }
    }

    /// Make the next scenario preparation fail with an install error.
    pub fn fail_next_prepare(&self, message: impl Into<String>) {
        self.prepare_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(message.into());
    }

    /// Scenario ids passed to `prepare_scenario`, failed calls included.
    pub fn prepared(&self) -> Vec<String> {
        self.prepared.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn push(&self, run: ScriptedRun) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(run);
    }

    /// Flows handed to the executor, in call order.
    pub fn executed(&self) -> Vec<FlowArtifact> {
        self.executed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionCollaborator for ScriptedExecutor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(
        &self,
        flow: &FlowArtifact,
        _target: &DeviceTarget,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(flow.clone());
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match next {
            None => Ok(self.fallback.clone()),
            Some(ScriptedRun::Outcome(outcome)) => Ok(outcome),
            Some(ScriptedRun::DeviceError(message)) => Err(ExecutionError::Device(message)),
            Some(ScriptedRun::Hang) => std::future::pending().await,
        }
    }

    async fn prepare_scenario(
        &self,
        scenario_id: &str,
        _target: &DeviceTarget,
    ) -> Result<Vec<String>, ExecutionError> {
        self.prepared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(scenario_id.to_string());
        let failure = self
            .prepare_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match failure {
            Some(message) => Err(ExecutionError::AppInstall {
                message,
                evidence: vec![format!("logs/{scenario_id}-app-install.log")],
            }),
            None => Ok(Vec::new()),
        }
    }
}
