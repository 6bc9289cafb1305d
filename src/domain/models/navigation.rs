//! Navigation knowledge domain model.
//!
//! The navigation memory holds ranked hypotheses about how to reach the
//! screen a case starts from. Hypotheses are keyed by [`EntryKey`] and
//! carry a confidence score plus provenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator between the scenario and entry point parts of an entry key.
const KEY_SEPARATOR: &str = "::";

/// Identity under which navigation hypotheses are stored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EntryKey {
    pub scenario_id: String,
    pub entry_point: String,
}

impl EntryKey {
    pub fn new(scenario_id: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            entry_point: entry_point.into(),
        }
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.scenario_id, KEY_SEPARATOR, self.entry_point)
    }
}

impl From<EntryKey> for String {
    fn from(key: EntryKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for EntryKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.split_once(KEY_SEPARATOR) {
            Some((scenario, entry)) if !scenario.is_empty() && !entry.is_empty() => {
                Ok(Self::new(scenario, entry))
            }
            _ => Err(format!("invalid entry key: {value}")),
        }
    }
}

/// Ordered screen/step labels leading to an entry point.
///
/// An empty path means the entry point is the screen shown at launch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationPath(pub Vec<String>);

impl NavigationPath {
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(steps.into_iter().map(Into::into).collect())
    }

    pub fn steps(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for NavigationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("<launch>")
        } else {
            f.write_str(&self.0.join(" > "))
        }
    }
}

/// Where a hypothesis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Inferred from case text, never confirmed by a run.
    Heuristic,
    /// Confirmed by at least one successful attempt.
    Observed,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heuristic => "heuristic",
            Self::Observed => "observed",
        }
    }
}

/// Outcome of an attempt as reported to the navigation memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationOutcome {
    Positive,
    Negative,
}

/// A candidate way to reach an entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationHypothesis {
    pub path: NavigationPath,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub provenance: Provenance,
    #[serde(default)]
    pub successes: u32,
    #[serde(default)]
    pub failures: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NavigationHypothesis {
    pub fn new(path: NavigationPath, confidence: f64, provenance: Provenance) -> Self {
        let now = Utc::now();
        Self {
            path,
            confidence: confidence.clamp(0.0, 1.0),
            provenance,
            successes: 0,
            failures: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move confidence toward 1 by `rate` of the remaining headroom.
    pub fn reinforce(&mut self, rate: f64) {
        self.confidence = (self.confidence + rate * (1.0 - self.confidence)).clamp(0.0, 1.0);
        self.updated_at = Utc::now();
    }

    /// Move confidence toward 0 by `rate` of its current value.
    pub fn weaken(&mut self, rate: f64) {
        self.confidence = (self.confidence - rate * self.confidence).clamp(0.0, 1.0);
        self.updated_at = Utc::now();
    }
}

/// Full serialized state of the navigation memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub version: u32,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entries: BTreeMap<EntryKey, Vec<NavigationHypothesis>>,
}

impl MemorySnapshot {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn empty() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            updated_at: None,
            entries: BTreeMap::new(),
        }
    }

    pub fn hypothesis_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

impl Default for MemorySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_key_round_trips_through_string() {
        let key = EntryKey::new("checkout", "auth/login");
        let text: String = key.clone().into();
        assert_eq!(text, "checkout::auth/login");
        assert_eq!(EntryKey::try_from(text).unwrap(), key);
        assert!(EntryKey::try_from("no-separator".to_string()).is_err());
    }

    #[test]
    fn test_reinforce_and_weaken_stay_bounded() {
        let mut hypothesis =
            NavigationHypothesis::new(NavigationPath::new(["Home"]), 0.9, Provenance::Observed);
        for _ in 0..50 {
            hypothesis.reinforce(0.9);
        }
        assert!(hypothesis.confidence <= 1.0);
        for _ in 0..50 {
            hypothesis.weaken(0.9);
        }
        assert!(hypothesis.confidence >= 0.0);
    }

    #[test]
    fn test_snapshot_serializes_keys_as_strings() {
        let mut snapshot = MemorySnapshot::empty();
        snapshot.entries.insert(
            EntryKey::new("s1", "home"),
            vec![NavigationHypothesis::new(
                NavigationPath::default(),
                0.5,
                Provenance::Heuristic,
            )],
        );
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"s1::home\""));
        let back: MemorySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hypothesis_count(), 1);
    }
}
