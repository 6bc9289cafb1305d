//! Case grouper - partitions test cases into ordered scenarios.
//!
//! Grouping rule:
//! 1. A case's group key is its first journey tag (`journey:<name>` or any
//!    other configured prefix). Without one, the suite path is used when
//!    `group_by_suite` is enabled; otherwise the case is a singleton.
//! 2. Onboarding and regular cases never share a group.
//! 3. Inside a group cases run by `order:<n>` tag, then priority, then id.
//! 4. Groups larger than `max_cases_per_scenario` are split into chunks.
//! 5. Scenarios run onboarding first, then by best priority, then by key.
//!
//! The result is a pure function of the case set, the exclusions and the
//! policy.

use std::collections::{BTreeMap, HashSet};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CasePriority, GroupingConfig, Scenario, TestCase};

/// Origin of a group key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupSource {
    Journey,
    Suite,
    Single,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    onboarding: bool,
    source: GroupSource,
    name: String,
}

impl GroupKey {
    fn label(&self) -> String {
        let marker = if self.onboarding { "onboarding" } else { "regular" };
        match self.source {
            GroupSource::Journey => format!("journey:{}:{}", self.name, marker),
            GroupSource::Suite => format!("suite:{}:{}", self.name, marker),
            GroupSource::Single => format!("case:{}", self.name),
        }
    }

    fn slug(&self) -> String {
        let base = slugify(&self.name);
        match (&self.source, self.onboarding) {
            (GroupSource::Single, _) => base,
            (_, true) => format!("{base}-onboarding"),
            (_, false) => base,
        }
    }
}

/// Partitions cases into scenarios.
#[derive(Debug, Clone, Default)]
pub struct CaseGrouper {
    policy: GroupingConfig,
}

impl CaseGrouper {
    pub fn new(policy: GroupingConfig) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GroupingConfig {
        &self.policy
    }

    /// Group every case not in `excluded` into exactly one scenario.
    ///
    /// Fails with [`DomainError::Input`] on duplicate ids or on a case
    /// whose step list is missing or malformed. Excluded cases are not
    /// validated.
    pub fn group(
        &self,
        cases: &[TestCase],
        excluded: &HashSet<String>,
    ) -> DomainResult<Vec<Scenario>> {
        let mut seen = HashSet::new();
        let mut groups: BTreeMap<GroupKey, Vec<&TestCase>> = BTreeMap::new();

        for case in cases.iter().filter(|c| !excluded.contains(&c.id)) {
            case.validate().map_err(DomainError::Input)?;
            if !seen.insert(case.id.as_str()) {
                return Err(DomainError::input(format!("duplicate case id {}", case.id)));
            }
            groups.entry(self.group_key(case)).or_default().push(case);
        }

        let chunk_size = self.policy.max_cases_per_scenario.max(1);
        let mut drafts = Vec::new();
        for (key, mut members) in groups {
            members.sort_by(|a, b| case_sort_key(a).cmp(&case_sort_key(b)));
            let chunks: Vec<_> = members.chunks(chunk_size).collect();
            let split = chunks.len() > 1;
            for (index, chunk) in chunks.into_iter().enumerate() {
                let id = if split {
                    format!("{}-{}", key.slug(), index + 1)
                } else {
                    key.slug()
                };
                let priority = chunk
                    .iter()
                    .map(|c| c.priority)
                    .min_by_key(CasePriority::rank)
                    .unwrap_or(CasePriority::Undefined);
                drafts.push((
                    (!key.onboarding, priority.rank(), key.label(), index),
                    Scenario {
                        id,
                        title: scenario_title(&key, chunk, index, split),
                        case_ids: chunk.iter().map(|c| c.id.clone()).collect(),
                        precedence: 0,
                        priority,
                        is_onboarding: key.onboarding,
                        group_key: key.label(),
                    },
                ));
            }
        }

        drafts.sort_by(|a, b| a.0.cmp(&b.0));
        let mut scenarios: Vec<Scenario> = drafts.into_iter().map(|(_, s)| s).collect();
        dedupe_ids(&mut scenarios);
        for (precedence, scenario) in scenarios.iter_mut().enumerate() {
            scenario.precedence = precedence;
        }

        tracing::debug!(
            cases = cases.len(),
            excluded = excluded.len(),
            scenarios = scenarios.len(),
            "grouped cases into scenarios"
        );
        Ok(scenarios)
    }

    fn group_key(&self, case: &TestCase) -> GroupKey {
        let journey = self
            .policy
            .journey_tag_prefixes
            .iter()
            .find_map(|prefix| case.tag_value(&prefix.to_lowercase()));

        let (source, name) = if let Some(journey) = journey {
            (GroupSource::Journey, journey.to_string())
        } else if self.policy.group_by_suite && !case.suite_path.trim().is_empty() {
            (GroupSource::Suite, case.suite_path.trim().to_string())
        } else {
            (GroupSource::Single, case.id.clone())
        };

        GroupKey {
            onboarding: case.is_onboarding,
            source,
            name,
        }
    }
}

fn case_sort_key(case: &TestCase) -> (u32, u8, &str) {
    (
        case.order_hint().unwrap_or(u32::MAX),
        case.priority.rank(),
        case.id.as_str(),
    )
}

fn scenario_title(key: &GroupKey, chunk: &[&TestCase], index: usize, split: bool) -> String {
    let base = match key.source {
        GroupSource::Single => chunk
            .first()
            .map(|c| c.title.clone())
            .unwrap_or_else(|| key.name.clone()),
        _ => key.name.clone(),
    };
    if split {
        format!("{base} - batch {}", index + 1)
    } else {
        base
    }
}

/// Lower-case, keep alphanumerics, collapse everything else into `-`.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "scenario".to_string()
    } else {
        slug
    }
}

/// Distinct keys can slugify to the same id; suffix later duplicates.
fn dedupe_ids(scenarios: &mut [Scenario]) {
    let mut used = HashSet::new();
    for scenario in scenarios.iter_mut() {
        if used.insert(scenario.id.clone()) {
            continue;
        }
        let mut n = 2;
        while used.contains(&format!("{}-{n}", scenario.id)) {
            n += 1;
        }
        scenario.id = format!("{}-{n}", scenario.id);
        used.insert(scenario.id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: &str) -> TestCase {
        TestCase::new(id, format!("Case {id}")).with_step("Open the app")
    }

    fn ids(scenario: &Scenario) -> Vec<&str> {
        scenario.case_ids.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_journey_tags_group_cases() {
        let cases = vec![
            case("TC-2").with_tag("journey:checkout").with_tag("order:2"),
            case("TC-1").with_tag("journey:checkout").with_tag("order:1"),
            case("TC-3"),
        ];
        let scenarios = CaseGrouper::default().group(&cases, &HashSet::new()).unwrap();

        assert_eq!(scenarios.len(), 2);
        let checkout = scenarios.iter().find(|s| s.id == "checkout").unwrap();
        assert_eq!(ids(checkout), vec!["TC-1", "TC-2"]);
        let single = scenarios.iter().find(|s| s.id == "tc-3").unwrap();
        assert_eq!(ids(single), vec!["TC-3"]);
    }

    #[test]
    fn test_onboarding_cases_run_first_and_separately() {
        let cases = vec![
            case("TC-1").with_suite_path("Regression / Auth"),
            case("TC-2")
                .with_suite_path("Regression / Auth")
                .with_tag("onboarding"),
        ];
        let scenarios = CaseGrouper::default().group(&cases, &HashSet::new()).unwrap();

        assert_eq!(scenarios.len(), 2);
        assert!(scenarios[0].is_onboarding);
        assert_eq!(ids(&scenarios[0]), vec!["TC-2"]);
        assert_eq!(scenarios[0].id, "regression-auth-onboarding");
        assert_eq!(scenarios[1].id, "regression-auth");
        assert_eq!(scenarios[1].precedence, 1);
    }

    #[test]
    fn test_excluded_cases_are_skipped_and_not_validated() {
        let broken = TestCase::new("TC-9", "No steps");
        let cases = vec![case("TC-1"), broken];
        let excluded: HashSet<String> = ["TC-9".to_string()].into_iter().collect();

        let scenarios = CaseGrouper::default().group(&cases, &excluded).unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(ids(&scenarios[0]), vec!["TC-1"]);
    }

    #[test]
    fn test_missing_steps_is_input_error() {
        let cases = vec![case("TC-1"), TestCase::new("TC-2", "Empty")];
        let err = CaseGrouper::default()
            .group(&cases, &HashSet::new())
            .unwrap_err();
        assert!(matches!(err, DomainError::Input(msg) if msg.contains("TC-2")));
    }

    #[test]
    fn test_duplicate_ids_are_input_error() {
        let cases = vec![case("TC-1"), case("TC-1")];
        let err = CaseGrouper::default()
            .group(&cases, &HashSet::new())
            .unwrap_err();
        assert!(matches!(err, DomainError::Input(_)));
    }

    #[test]
    fn test_large_groups_are_chunked() {
        let policy = GroupingConfig {
            max_cases_per_scenario: 2,
            ..Default::default()
        };
        let cases: Vec<_> = (1..=5)
            .map(|i| case(&format!("TC-{i}")).with_tag("journey:settings"))
            .collect();
        let scenarios = CaseGrouper::new(policy).group(&cases, &HashSet::new()).unwrap();

        assert_eq!(scenarios.len(), 3);
        assert_eq!(scenarios[0].id, "settings-1");
        assert_eq!(ids(&scenarios[2]), vec!["TC-5"]);
        assert!(scenarios[1].title.ends_with("batch 2"));
    }

    #[test]
    fn test_priority_orders_scenarios() {
        let cases = vec![
            case("TC-1").with_priority(CasePriority::Low),
            case("TC-2").with_priority(CasePriority::High),
        ];
        let scenarios = CaseGrouper::default().group(&cases, &HashSet::new()).unwrap();
        assert_eq!(ids(&scenarios[0]), vec!["TC-2"]);
        assert_eq!(scenarios[0].priority, CasePriority::High);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Regression / Auth"), "regression-auth");
        assert_eq!(slugify("  Ünïcode!! "), "ünïcode");
        assert_eq!(slugify("///"), "scenario");
    }
}
