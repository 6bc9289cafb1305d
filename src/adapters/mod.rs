//! Adapters for the engine's ports and for the case source.

pub mod execution;
pub mod producers;
pub mod qase;
pub mod report;
pub mod snapshot;
