//! Scenario domain model.
//!
//! A scenario is an ordered group of test cases representing one
//! end-to-end user journey. Scenarios are created once per run by the
//! case grouper and are immutable afterwards.

use serde::{Deserialize, Serialize};

use super::test_case::CasePriority;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    /// Case ids in execution order.
    pub case_ids: Vec<String>,
    /// Rank in the automation order, 0 runs first.
    pub precedence: usize,
    pub priority: CasePriority,
    pub is_onboarding: bool,
    /// Journey or suite key that produced this scenario.
    pub group_key: String,
}

impl Scenario {
    pub fn contains(&self, case_id: &str) -> bool {
        self.case_ids.iter().any(|id| id == case_id)
    }

    pub fn len(&self) -> usize {
        self.case_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.case_ids.is_empty()
    }
}
