//! Snapshot store port - persistence for the navigation memory and the
//! attempt tracker.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{MemorySnapshot, TrackerSnapshot};

/// Durable storage for engine state.
///
/// Saves must be atomic: a failed or interrupted save leaves the previous
/// snapshot loadable.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the navigation memory, `Ok(None)` when nothing was saved yet.
    async fn load_memory(&self) -> DomainResult<Option<MemorySnapshot>>;

    async fn save_memory(&self, snapshot: &MemorySnapshot) -> DomainResult<()>;

    /// Load the attempt tracker, `Ok(None)` when nothing was saved yet.
    async fn load_tracker(&self) -> DomainResult<Option<TrackerSnapshot>>;

    async fn save_tracker(&self, snapshot: &TrackerSnapshot) -> DomainResult<()>;
}
