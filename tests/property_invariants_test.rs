//! Property tests for the attempt bound, memory confidence and grouping.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use qa_automator::adapters::snapshot::InMemorySnapshotStore;
use qa_automator::domain::models::{
    AttemptOutcome, CasePriority, Disposition, EntryKey, FailureCategory, FailureContext,
    Config, GroupingConfig, MemoryConfig, NavigationPath, ObservationOutcome, Provenance, TestCase,
};
use qa_automator::infrastructure::config::ConfigLoader;
use qa_automator::services::{AttemptTracker, CaseGrouper, NavigationMemory};

fn outcome_strategy() -> impl Strategy<Value = AttemptOutcome> {
    prop_oneof![
        3 => Just(AttemptOutcome::success(vec![])),
        5 => Just(AttemptOutcome::failure(FailureCategory::Execution, FailureContext::new("failed"))),
        2 => Just(AttemptOutcome::failure(FailureCategory::Timeout, FailureContext::new("slow"))),
        1 => Just(AttemptOutcome::failure(FailureCategory::Producer, FailureContext::new("bad flow"))),
    ]
}

fn case_strategy() -> impl Strategy<Value = Vec<(Option<u8>, u8, bool, u8)>> {
    prop::collection::vec(
        (prop::option::of(0u8..3), 0u8..4, any::<bool>(), 0u8..3),
        1..25,
    )
}

fn build_cases(specs: &[(Option<u8>, u8, bool, u8)]) -> Vec<TestCase> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (journey, priority, onboarding, suite))| {
            let priority = match priority {
                0 => CasePriority::High,
                1 => CasePriority::Medium,
                2 => CasePriority::Low,
                _ => CasePriority::Undefined,
            };
            let mut case = TestCase::new(format!("TC-{i}"), format!("Case {i}"))
                .with_step("Open the app")
                .with_priority(priority)
                .with_suite_path(format!("Suite {suite}"));
            if let Some(journey) = journey {
                case = case.with_tag(format!("journey:flow-{journey}"));
            }
            if *onboarding {
                case = case.with_tag("onboarding");
            }
            case
        })
        .collect()
}

proptest! {
    /// Property: no case is ever attempted more than `max_attempts` times,
    /// and a terminal case accepts no further attempts.
    #[test]
    fn prop_attempts_never_exceed_budget(
        max_attempts in 1u32..=10,
        outcomes in prop::collection::vec(outcome_strategy(), 0..15),
    ) {
        let mut tracker = AttemptTracker::new(max_attempts);
        tracker.register("TC-1", "s1");

        for outcome in outcomes {
            let terminal = tracker.is_terminal("TC-1").unwrap();
            let result = tracker.record_attempt("TC-1", None, outcome);
            prop_assert_eq!(result.is_err(), terminal);
            let state = tracker.state("TC-1").unwrap();
            prop_assert!(state.attempts <= max_attempts);
            if state.attempts == max_attempts {
                prop_assert!(state.disposition.is_terminal());
            }
        }

        let state = tracker.state("TC-1").unwrap();
        prop_assert_eq!(tracker.records().len() as u32, state.attempts);
        if state.disposition == Disposition::Pending {
            prop_assert_eq!(tracker.remaining_attempts("TC-1").unwrap(), max_attempts - state.attempts);
        }
    }

    /// Property: confidences stay in [0, 1], hypotheses are never removed
    /// and a reload sees exactly what was persisted.
    #[test]
    fn prop_memory_confidence_bounded_and_monotone(
        observations in prop::collection::vec((0usize..4, any::<bool>()), 1..30),
        reinforce_rate in 0.0f64..=1.0,
        penalty_rate in 0.0f64..=1.0,
    ) {
        tokio_test::block_on(async {
            let config = MemoryConfig {
                reinforce_rate,
                penalty_rate,
                ..MemoryConfig::default()
            };
            let store = Arc::new(InMemorySnapshotStore::new());
            let mut memory = NavigationMemory::load(store.clone(), config.clone()).await;
            let key = EntryKey::new("checkout", "cart");
            let paths: Vec<NavigationPath> = (0..4)
                .map(|i| NavigationPath::new(["Home".to_string(), format!("Step {i}")]))
                .collect();

            let mut count = 0;
            for (index, positive) in observations {
                let outcome = if positive {
                    ObservationOutcome::Positive
                } else {
                    ObservationOutcome::Negative
                };
                memory.record_observation(&key, &paths[index], outcome).await.unwrap();

                let hypotheses = memory.lookup(&key);
                prop_assert!(hypotheses.len() >= count);
                count = hypotheses.len();
                for hypothesis in &hypotheses {
                    prop_assert!((0.0..=1.0).contains(&hypothesis.confidence));
                    if hypothesis.provenance == Provenance::Observed {
                        prop_assert!(hypothesis.successes > 0);
                    }
                }
                prop_assert!(hypotheses
                    .windows(2)
                    .all(|pair| pair[0].confidence >= pair[1].confidence));
            }

            let reloaded = NavigationMemory::load(store, config).await;
            prop_assert_eq!(reloaded.lookup(&key).len(), count);
            Ok(())
        })?;
    }

    /// Property: with any memory tuning that passes validation, one
    /// success puts the walked path above the untried heuristic.
    #[test]
    fn prop_valid_tuning_ranks_success_above_heuristic(
        heuristic_confidence in 0.0f64..=1.0,
        observed_confidence in 0.0f64..=1.0,
        reinforce_rate in 0.0f64..=1.0,
        contradiction_rate in 0.0f64..=1.0,
    ) {
        let mut config = Config::default();
        config.memory = MemoryConfig {
            heuristic_confidence,
            observed_confidence,
            reinforce_rate,
            contradiction_rate,
            ..MemoryConfig::default()
        };
        prop_assume!(ConfigLoader::validate(&config).is_ok());

        tokio_test::block_on(async {
            let store = Arc::new(InMemorySnapshotStore::new());
            let mut memory = NavigationMemory::load(store, config.memory.clone()).await;
            let key = EntryKey::new("auth", "auth/login");
            memory.seed_heuristic(&key, &NavigationPath::new(["home"])).await.unwrap();
            let walked = NavigationPath::new(["Home", "Login"]);
            memory
                .record_observation(&key, &walked, ObservationOutcome::Positive)
                .await
                .unwrap();

            let top = memory.top(&key).unwrap();
            prop_assert_eq!(top.path, walked);
            prop_assert_eq!(top.provenance, Provenance::Observed);
            Ok(())
        })?;
    }

    /// Property: grouping partitions the non-excluded cases, respects the
    /// size limit and does not depend on input order.
    #[test]
    fn prop_grouping_is_a_deterministic_partition(
        specs in case_strategy(),
        excluded_mask in prop::collection::vec(any::<bool>(), 25),
        max_cases in 1usize..6,
    ) {
        let cases = build_cases(&specs);
        let excluded: HashSet<String> = cases
            .iter()
            .zip(&excluded_mask)
            .filter(|(_, excluded)| **excluded)
            .map(|(case, _)| case.id.clone())
            .collect();
        let grouper = CaseGrouper::new(GroupingConfig {
            max_cases_per_scenario: max_cases,
            ..GroupingConfig::default()
        });

        let scenarios = grouper.group(&cases, &excluded).unwrap();

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for scenario in &scenarios {
            prop_assert!(!scenario.case_ids.is_empty());
            prop_assert!(scenario.case_ids.len() <= max_cases);
            for id in &scenario.case_ids {
                *seen.entry(id.as_str()).or_default() += 1;
            }
        }
        for case in &cases {
            let expected = usize::from(!excluded.contains(&case.id));
            prop_assert_eq!(seen.get(case.id.as_str()).copied().unwrap_or(0), expected);
        }
        for (precedence, scenario) in scenarios.iter().enumerate() {
            prop_assert_eq!(scenario.precedence, precedence);
        }
        let ids: HashSet<&str> = scenarios.iter().map(|s| s.id.as_str()).collect();
        prop_assert_eq!(ids.len(), scenarios.len());

        let mut reversed = cases.clone();
        reversed.reverse();
        prop_assert_eq!(grouper.group(&reversed, &excluded).unwrap(), scenarios);
    }
}
