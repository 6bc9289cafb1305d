//! Navigation memory - persistent, ranked knowledge of how to reach the
//! screen each case starts from.
//!
//! The memory is loaded once per run, passed to the orchestrator, and
//! written through the [`SnapshotStore`] port after every mutation. A
//! missing or unreadable snapshot is a cold start, never an error.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    EntryKey, MemoryConfig, MemorySnapshot, NavigationHypothesis, NavigationPath,
    ObservationOutcome, Provenance,
};
use crate::domain::ports::SnapshotStore;

/// Counts reported by the `memory` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemorySummary {
    pub entry_keys: usize,
    pub hypotheses: usize,
    pub observed: usize,
    pub heuristic: usize,
}

pub struct NavigationMemory {
    snapshot: MemorySnapshot,
    config: MemoryConfig,
    store: Arc<dyn SnapshotStore>,
}

impl NavigationMemory {
    /// Load the memory from the store, falling back to an empty memory.
    pub async fn load(store: Arc<dyn SnapshotStore>, config: MemoryConfig) -> Self {
        let snapshot = match store.load_memory().await {
            Ok(Some(snapshot)) if snapshot.version == MemorySnapshot::CURRENT_VERSION => {
                tracing::info!(
                    entry_keys = snapshot.entries.len(),
                    hypotheses = snapshot.hypothesis_count(),
                    "navigation memory loaded"
                );
                sanitize(snapshot)
            }
            Ok(Some(snapshot)) => {
                tracing::warn!(
                    version = snapshot.version,
                    "unsupported navigation memory version, starting cold"
                );
                MemorySnapshot::empty()
            }
            Ok(None) => {
                tracing::info!("no navigation memory yet, starting cold");
                MemorySnapshot::empty()
            }
            Err(err) => {
                tracing::warn!(error = %err, "navigation memory unreadable, starting cold");
                MemorySnapshot::empty()
            }
        };

        Self {
            snapshot,
            config,
            store,
        }
    }

    pub fn snapshot(&self) -> &MemorySnapshot {
        &self.snapshot
    }

    /// Hypotheses for `key`, highest confidence first.
    ///
    /// Ties go to observed hypotheses, then to the older one.
    pub fn lookup(&self, key: &EntryKey) -> Vec<NavigationHypothesis> {
        let mut ranked = self.snapshot.entries.get(key).cloned().unwrap_or_default();
        ranked.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| provenance_rank(a.provenance).cmp(&provenance_rank(b.provenance)))
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        ranked
    }

    pub fn top(&self, key: &EntryKey) -> Option<NavigationHypothesis> {
        self.lookup(key).into_iter().next()
    }

    /// Add a heuristic hypothesis unless one with the same path exists.
    ///
    /// Returns whether anything was inserted.
    pub async fn seed_heuristic(&mut self, key: &EntryKey, path: &NavigationPath) -> DomainResult<bool> {
        if self
            .snapshot
            .entries
            .get(key)
            .is_some_and(|hypotheses| hypotheses.iter().any(|h| &h.path == path))
        {
            return Ok(false);
        }

        let confidence = self.config.heuristic_confidence;
        self.mutate(key, |hypotheses| {
            hypotheses.push(NavigationHypothesis::new(
                path.clone(),
                confidence,
                Provenance::Heuristic,
            ));
        })
        .await?;
        Ok(true)
    }

    /// Fold the outcome of an attempt into the memory.
    ///
    /// A positive outcome reinforces the matching hypothesis (inserting an
    /// observed one if needed) and weakens every other hypothesis under the
    /// key. A negative outcome weakens the matching hypothesis. An unknown
    /// failed path is kept as a penalised heuristic so the failure stays
    /// auditable. Only a success makes a hypothesis observed. Nothing is
    /// ever removed.
    pub async fn record_observation(
        &mut self,
        key: &EntryKey,
        path: &NavigationPath,
        outcome: ObservationOutcome,
    ) -> DomainResult<()> {
        let config = self.config.clone();
        self.mutate(key, |hypotheses| {
            let position = hypotheses.iter().position(|h| &h.path == path);
            match outcome {
                ObservationOutcome::Positive => {
                    let index = position.unwrap_or_else(|| {
                        hypotheses.push(NavigationHypothesis::new(
                            path.clone(),
                            config.observed_confidence,
                            Provenance::Observed,
                        ));
                        hypotheses.len() - 1
                    });
                    for (i, hypothesis) in hypotheses.iter_mut().enumerate() {
                        if i == index {
                            hypothesis.reinforce(config.reinforce_rate);
                            hypothesis.provenance = Provenance::Observed;
                            hypothesis.successes += 1;
                        } else {
                            hypothesis.weaken(config.contradiction_rate);
                        }
                    }
                }
                ObservationOutcome::Negative => {
                    // A path that has only failed is unconfirmed, so it starts
                    // from the heuristic floor and never outranks an untried guess.
                    let index = position.unwrap_or_else(|| {
                        hypotheses.push(NavigationHypothesis::new(
                            path.clone(),
                            config.heuristic_confidence,
                            Provenance::Heuristic,
                        ));
                        hypotheses.len() - 1
                    });
                    let hypothesis = &mut hypotheses[index];
                    hypothesis.weaken(config.penalty_rate);
                    hypothesis.failures += 1;
                }
            }
        })
        .await?;

        tracing::debug!(entry_key = %key, path = %path, ?outcome, "navigation observation recorded");
        Ok(())
    }

    pub fn summary(&self) -> MemorySummary {
        let all = self.snapshot.entries.values().flatten();
        let (observed, heuristic) = all.fold((0, 0), |(o, h), hypothesis| match hypothesis.provenance {
            Provenance::Observed => (o + 1, h),
            Provenance::Heuristic => (o, h + 1),
        });
        MemorySummary {
            entry_keys: self.snapshot.entries.len(),
            hypotheses: observed + heuristic,
            observed,
            heuristic,
        }
    }

    /// Apply `change` to the hypotheses under `key` and persist.
    ///
    /// If the snapshot cannot be written the in-memory change is undone, so
    /// memory and disk never disagree.
    async fn mutate<F>(&mut self, key: &EntryKey, change: F) -> DomainResult<()>
    where
        F: FnOnce(&mut Vec<NavigationHypothesis>),
    {
        let previous_entry = self.snapshot.entries.get(key).cloned();
        let previous_updated = self.snapshot.updated_at;

        change(self.snapshot.entries.entry(key.clone()).or_default());
        self.snapshot.updated_at = Some(Utc::now());

        if let Err(err) = self.store.save_memory(&self.snapshot).await {
            match previous_entry {
                Some(entry) => {
                    self.snapshot.entries.insert(key.clone(), entry);
                }
                None => {
                    self.snapshot.entries.remove(key);
                }
            }
            self.snapshot.updated_at = previous_updated;
            tracing::error!(entry_key = %key, error = %err, "failed to persist navigation memory");
            return Err(err);
        }
        Ok(())
    }
}

fn provenance_rank(provenance: Provenance) -> u8 {
    match provenance {
        Provenance::Observed => 0,
        Provenance::Heuristic => 1,
    }
}

/// Hand-edited or damaged files can carry out-of-range confidences.
fn sanitize(mut snapshot: MemorySnapshot) -> MemorySnapshot {
    for hypothesis in snapshot.entries.values_mut().flatten() {
        hypothesis.confidence = if hypothesis.confidence.is_finite() {
            hypothesis.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
    snapshot
}
