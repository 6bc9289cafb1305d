//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - FlowProducer: turns a test case into an automation flow
//! - ExecutionCollaborator: runs a flow on a device
//! - ReportSink: receives attempt and run events
//! - SnapshotStore: persists engine state between runs

pub mod execution;
pub mod flow_producer;
pub mod report_sink;
pub mod snapshot_store;

pub use execution::{ExecutionCollaborator, ExecutionError, ExecutionOutcome};
pub use flow_producer::{FlowProducer, FlowRequest, ProducerError};
pub use report_sink::ReportSink;
pub use snapshot_store::SnapshotStore;
