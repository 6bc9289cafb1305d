//! Flow producer port - interface for whatever turns a test case into an
//! automation flow.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::{FailureContext, FlowArtifact, NavigationHypothesis, NavigationPath, TestCase};

/// Errors a flow producer can report.
///
/// All of them are structural: the orchestrator records one attempt and
/// flags the case as problematic. `UnsupportedCase` is recorded with the
/// `input` category, everything else with `producer`.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("Producer contract violation: {0}")]
    ContractViolation(String),

    /// The case cannot be expressed as a flow at all.
    #[error("Case cannot be automated: {0}")]
    UnsupportedCase(String),

    #[error("Producer unavailable: {0}")]
    Unavailable(String),

    #[error("Producer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a producer needs to write or repair a flow for one case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRequest {
    pub case: TestCase,
    pub scenario_id: String,
    /// Application id the flow header must target.
    #[serde(default)]
    pub app_id: String,
    /// 1-based attempt this flow is produced for.
    pub attempt: u32,
    /// Whether the flow must start with the onboarding-skip action.
    pub skip_onboarding: bool,
    /// Best known way to reach the case's entry point.
    pub navigation_hint: Option<NavigationHypothesis>,
    /// Diagnostics from the previous failed attempt; the producer should
    /// fix the flow from here rather than regenerate it blind.
    pub prior_failure: Option<FailureContext>,
}

/// Trait for flow producers.
///
/// Implementations may be backed by templates, an LLM, or a human; the
/// orchestrator only relies on this contract.
#[async_trait]
pub trait FlowProducer: Send + Sync {
    /// Get the producer name.
    fn name(&self) -> &'static str;

    /// Produce a flow for the request.
    async fn produce_flow(&self, request: FlowRequest) -> Result<FlowArtifact, ProducerError>;

    /// Fallback navigation guess used when memory has nothing for a case.
    fn heuristic_entry(&self, case: &TestCase) -> Option<NavigationPath> {
        case.inferred_entry_point()
            .map(|entry| NavigationPath::new([entry]))
    }
}
