//! Execution collaborator port - runs a flow on a device and reports
//! what happened.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::{DeviceTarget, FlowArtifact, NavigationPath};

/// Transient problems talking to the automation tool or the device.
///
/// These are retried as ordinary failed attempts.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Failed to launch automation tool: {0}")]
    Launch(String),

    #[error("Device unavailable: {0}")]
    Device(String),

    /// Installing the app under test failed.
    #[error("App installation failed: {message}")]
    AppInstall {
        message: String,
        evidence: Vec<String>,
    },

    #[error("Execution I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecutionError {
    /// Evidence collected before the error, if any.
    pub fn evidence(&self) -> &[String] {
        match self {
            Self::AppInstall { evidence, .. } => evidence,
            _ => &[],
        }
    }
}

/// Structured result of running a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success {
        #[serde(default)]
        evidence: Vec<String>,
        /// Path actually walked to the entry point, when the tool reports one.
        #[serde(default)]
        observed_path: Option<NavigationPath>,
    },
    Failure {
        message: String,
        #[serde(default)]
        evidence: Vec<String>,
        #[serde(default)]
        cause: Option<String>,
    },
    /// The collaborator hit its own timeout and says so explicitly.
    TimedOut {
        #[serde(default)]
        evidence: Vec<String>,
    },
}

impl ExecutionOutcome {
    pub fn success() -> Self {
        Self::Success {
            evidence: Vec::new(),
            observed_path: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            evidence: Vec::new(),
            cause: None,
        }
    }
}

/// Trait for execution collaborators.
///
/// Implementations must be safe to invoke repeatedly for the same case.
#[async_trait]
pub trait ExecutionCollaborator: Send + Sync {
    /// Get the collaborator name.
    fn name(&self) -> &'static str;

    /// Run the flow against the device target.
    async fn execute(
        &self,
        flow: &FlowArtifact,
        target: &DeviceTarget,
    ) -> Result<ExecutionOutcome, ExecutionError>;

    /// Called before the first attempt of each scenario, and again on the
    /// next attempt if it failed.
    ///
    /// Returns evidence produced while preparing the device.
    async fn prepare_scenario(
        &self,
        _scenario_id: &str,
        _target: &DeviceTarget,
    ) -> Result<Vec<String>, ExecutionError> {
        Ok(Vec::new())
    }
}
