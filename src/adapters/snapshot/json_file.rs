//! JSON file snapshot store.
//!
//! Each snapshot lives in its own file under the state directory. Writes
//! go to a sibling `.tmp` file which is synced and then renamed over the
//! target, so a crash mid-write never leaves a partial snapshot visible.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{MemorySnapshot, TrackerSnapshot};
use crate::domain::ports::SnapshotStore;

const MEMORY_FILE: &str = "navigation_memory.json";
const TRACKER_FILE: &str = "attempt_state.json";

#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    state_dir: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Create the state directory and drop leftovers of interrupted writes.
    pub async fn init(&self) -> DomainResult<()> {
        fs::create_dir_all(&self.state_dir).await?;
        self.recover_interrupted_writes().await;
        Ok(())
    }

    pub fn memory_path(&self) -> PathBuf {
        self.state_dir.join(MEMORY_FILE)
    }

    pub fn tracker_path(&self) -> PathBuf {
        self.state_dir.join(TRACKER_FILE)
    }

    async fn read<T: DeserializeOwned>(&self, path: &Path) -> DomainResult<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(DomainError::Persistence(format!(
                "failed to read {}: {err}",
                path.display()
            ))),
        }
    }

    async fn write_atomic<T: Serialize>(&self, path: &Path, value: &T) -> DomainResult<()> {
        let content = serde_json::to_vec_pretty(value).map_err(|e| {
            DomainError::Persistence(format!("failed to encode {}: {e}", path.display()))
        })?;
        fs::create_dir_all(&self.state_dir).await?;
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, &content).await?;

        let tmp_path_clone = tmp_path.clone();
        let sync_result = tokio::task::spawn_blocking(move || {
            std::fs::File::open(&tmp_path_clone).and_then(|file| file.sync_all())
        })
        .await;
        match sync_result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "failed to sync snapshot to disk"),
            Err(e) => tracing::warn!(error = %e, "snapshot sync task failed"),
        }

        fs::rename(&tmp_path, path).await.map_err(|e| {
            DomainError::Persistence(format!("failed to replace {}: {e}", path.display()))
        })?;

        tracing::trace!(path = %path.display(), bytes = content.len(), "snapshot written");
        Ok(())
    }

    async fn recover_interrupted_writes(&self) {
        if let Ok(mut entries) = fs::read_dir(&self.state_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    tracing::debug!(path = %path.display(), "removing interrupted snapshot write");
                    if let Err(e) = fs::remove_file(&path).await {
                        tracing::debug!(path = %path.display(), error = %e, "failed to remove interrupted snapshot write");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn load_memory(&self) -> DomainResult<Option<MemorySnapshot>> {
        self.read(&self.memory_path()).await
    }

    async fn save_memory(&self, snapshot: &MemorySnapshot) -> DomainResult<()> {
        self.write_atomic(&self.memory_path(), snapshot).await
    }

    async fn load_tracker(&self) -> DomainResult<Option<TrackerSnapshot>> {
        self.read(&self.tracker_path()).await
    }

    async fn save_tracker(&self, snapshot: &TrackerSnapshot) -> DomainResult<()> {
        self.write_atomic(&self.tracker_path(), snapshot).await
    }
}
