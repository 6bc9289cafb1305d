//! Scripted flow producer for tests and dry runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::domain::models::{FlowArtifact, NavigationPath};
use crate::domain::ports::{FlowProducer, FlowRequest, ProducerError};

/// One scripted reaction to a produce call.
#[derive(Debug, Clone)]
pub enum ScriptedProduction {
    /// Return a flow, optionally declaring its navigation path.
    Flow(Option<NavigationPath>),
    ContractViolation(String),
    Unsupported(String),
    /// Never answer; exercises producer timeouts and cancellation.
    Hang,
}

/// Answers produce calls from a FIFO script.
///
/// When the script is empty every call yields a flow that follows the
/// navigation hint, which is what a dry run wants.
#[derive(Debug)]
pub struct ScriptedFlowProducer {
    flows_dir: PathBuf,
    script: Mutex<VecDeque<ScriptedProduction>>,
    requests: Mutex<Vec<FlowRequest>>,
}

impl ScriptedFlowProducer {
    pub fn new() -> Self {
        Self::with_flows_dir("flows")
    }

    pub fn with_flows_dir(flows_dir: impl Into<PathBuf>) -> Self {
        Self {
            flows_dir: flows_dir.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue the reaction for the next produce call.
    pub fn push(&self, production: ScriptedProduction) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(production);
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<FlowRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn flow_location(&self, request: &FlowRequest) -> PathBuf {
        self.flows_dir
            .join(&request.scenario_id)
            .join(format!("{}-attempt-{}.yaml", request.case.id, request.attempt))
    }
}

impl Default for ScriptedFlowProducer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlowProducer for ScriptedFlowProducer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn produce_flow(&self, request: FlowRequest) -> Result<FlowArtifact, ProducerError> {
        let production = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(ScriptedProduction::Flow(None));
        let location = self.flow_location(&request);
        let hinted = request.navigation_hint.as_ref().map(|h| h.path.clone());
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        match production {
            ScriptedProduction::Flow(path) => {
                let flow = FlowArtifact::new(location);
                Ok(match path.or(hinted) {
                    Some(path) => flow.with_navigation_path(path),
                    None => flow,
                })
            }
            ScriptedProduction::ContractViolation(message) => {
                Err(ProducerError::ContractViolation(message))
            }
            ScriptedProduction::Unsupported(message) => Err(ProducerError::UnsupportedCase(message)),
            ScriptedProduction::Hang => std::future::pending().await,
        }
    }
}
