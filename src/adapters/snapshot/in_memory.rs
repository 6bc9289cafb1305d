//! In-memory snapshot store for tests and dry runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{MemorySnapshot, TrackerSnapshot};
use crate::domain::ports::SnapshotStore;

/// Keeps the latest snapshots in memory.
///
/// Saves can be forced to fail to exercise rollback paths.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    memory: Mutex<Option<MemorySnapshot>>,
    tracker: Mutex<Option<TrackerSnapshot>>,
    fail_saves: AtomicBool,
    memory_saves: AtomicUsize,
    tracker_saves: AtomicUsize,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing memory snapshot.
    pub fn with_memory(snapshot: MemorySnapshot) -> Self {
        let store = Self::default();
        *store.memory.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot);
        store
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn memory_saves(&self) -> usize {
        self.memory_saves.load(Ordering::SeqCst)
    }

    pub fn tracker_saves(&self) -> usize {
        self.tracker_saves.load(Ordering::SeqCst)
    }

    pub fn saved_memory(&self) -> Option<MemorySnapshot> {
        self.memory.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn saved_tracker(&self) -> Option<TrackerSnapshot> {
        self.tracker.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn check_writable(&self) -> DomainResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(DomainError::Persistence("simulated write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load_memory(&self) -> DomainResult<Option<MemorySnapshot>> {
        Ok(self.saved_memory())
    }

    async fn save_memory(&self, snapshot: &MemorySnapshot) -> DomainResult<()> {
        self.check_writable()?;
        *self.memory.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.clone());
        self.memory_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_tracker(&self) -> DomainResult<Option<TrackerSnapshot>> {
        Ok(self.saved_tracker())
    }

    async fn save_tracker(&self, snapshot: &TrackerSnapshot) -> DomainResult<()> {
        self.check_writable()?;
        *self.tracker.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.clone());
        self.tracker_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
