//! Qase export loader.
//!
//! Accepts the three shapes Qase exports come in: a flat list of cases,
//! an object with a `cases` list, or a nested `suites` tree whose titles
//! become each case's suite path. The exclusion file is either a list of
//! ids or an object mapping ids to a truthy "already tested" flag.

use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CasePriority, CaseStep, TestCase};

/// Load and normalize the cases in a Qase export file.
pub async fn load_cases(path: &Path) -> DomainResult<Vec<TestCase>> {
    let content = fs::read_to_string(path).await.map_err(|err| {
        DomainError::input(format!("cannot read test cases {}: {err}", path.display()))
    })?;
    let cases = parse_cases(&content)?;
    tracing::info!(path = %path.display(), cases = cases.len(), "loaded test cases");
    Ok(cases)
}

/// Load the ids of cases already tested. A missing or empty file means
/// nothing is excluded.
pub async fn load_tested(path: &Path) -> DomainResult<HashSet<String>> {
    match fs::read_to_string(path).await {
        Ok(content) => parse_tested(&content),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no tested-cases file, nothing excluded");
            Ok(HashSet::new())
        }
        Err(err) => Err(DomainError::input(format!(
            "cannot read tested cases {}: {err}",
            path.display()
        ))),
    }
}

pub fn parse_cases(content: &str) -> DomainResult<Vec<TestCase>> {
    let raw: Value = serde_json::from_str(content)
        .map_err(|err| DomainError::input(format!("test cases are not valid JSON: {err}")))?;

    let mut items = Vec::new();
    match &raw {
        Value::Array(list) => items.extend(list.iter().map(|item| (item, String::new()))),
        Value::Object(map) => {
            if let Some(Value::Array(cases)) = map.get("cases") {
                items.extend(cases.iter().map(|item| (item, String::new())));
            }
            if let Some(Value::Array(suites)) = map.get("suites") {
                for suite in suites {
                    collect_suite(suite, &[], &mut items);
                }
            }
            if items.is_empty() && ["id", "title", "steps"].iter().any(|k| map.contains_key(*k)) {
                items.push((&raw, String::new()));
            }
        }
        _ => {}
    }

    items
        .into_iter()
        .filter(|(item, _)| item.is_object())
        .map(|(item, suite_path)| normalize_case(item, suite_path))
        .collect()
}

pub fn parse_tested(content: &str) -> DomainResult<HashSet<String>> {
    if content.trim().is_empty() {
        return Ok(HashSet::new());
    }
    let raw: Value = serde_json::from_str(content)
        .map_err(|err| DomainError::input(format!("tested cases are not valid JSON: {err}")))?;
    match raw {
        Value::Array(ids) => Ok(ids.iter().filter_map(id_string).collect()),
        Value::Object(map) => Ok(map
            .into_iter()
            .filter(|(_, tested)| truthy(tested))
            .map(|(id, _)| id)
            .collect()),
        _ => Err(DomainError::input(
            "tested cases must be a JSON list or object",
        )),
    }
}

fn collect_suite<'a>(node: &'a Value, parents: &[String], out: &mut Vec<(&'a Value, String)>) {
    let Some(map) = node.as_object() else {
        return;
    };
    let mut path = parents.to_vec();
    if let Some(title) = map.get("title").and_then(Value::as_str).map(str::trim) {
        if !title.is_empty() {
            path.push(title.to_string());
        }
    }
    if let Some(Value::Array(cases)) = map.get("cases") {
        let suite_path = path.join(" / ");
        out.extend(cases.iter().map(|case| (case, suite_path.clone())));
    }
    if let Some(Value::Array(children)) = map.get("suites") {
        for child in children {
            collect_suite(child, &path, out);
        }
    }
}

fn normalize_case(item: &Value, suite_path: String) -> DomainResult<TestCase> {
    let id = ["id", "case_id", "public_id"]
        .iter()
        .find_map(|key| item.get(*key).and_then(id_string))
        .unwrap_or_default();
    let title = text(item.get("title"));

    let mut case = TestCase::new(id, title);
    case.preconditions = text(item.get("preconditions"));
    case.priority = priority(item.get("priority"));
    case.suite_path = match item.get("_suite_path").and_then(Value::as_str) {
        Some(explicit) if suite_path.is_empty() => explicit.trim().to_string(),
        _ => suite_path,
    };

    if let Some(Value::Array(steps)) = item.get("steps") {
        case.steps = steps.iter().map(step).collect::<DomainResult<_>>()?;
    }
    if let Some(Value::Array(tags)) = item.get("tags") {
        for tag in tags {
            let label = match tag {
                Value::String(s) => Some(s.clone()),
                Value::Object(map) => map.get("title").and_then(Value::as_str).map(str::to_string),
                _ => None,
            };
            if let Some(label) = label.filter(|l| !l.trim().is_empty()) {
                case = case.with_tag(label.trim());
            }
        }
    }
    if case.title.to_lowercase().contains("onboarding") {
        case.is_onboarding = true;
    }
    Ok(case)
}

fn step(raw: &Value) -> DomainResult<CaseStep> {
    match raw {
        Value::String(s) => Ok(CaseStep::Text(s.clone())),
        Value::Object(map) => {
            let optional = |key: &str| {
                map.get(key)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .filter(|s| !s.trim().is_empty())
            };
            Ok(CaseStep::Structured {
                action: text(map.get("action")),
                data: optional("data"),
                expected_result: optional("expected_result"),
            })
        }
        other => Err(DomainError::input(format!("malformed step: {other}"))),
    }
}

fn priority(raw: Option<&Value>) -> CasePriority {
    match raw {
        Some(Value::String(label)) => CasePriority::parse(label),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(1) => CasePriority::High,
            Some(2) => CasePriority::Medium,
            Some(3) => CasePriority::Low,
            _ => CasePriority::Undefined,
        },
        _ => CasePriority::default(),
    }
}

fn id_string(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(raw: Option<&Value>) -> String {
    raw.and_then(Value::as_str).unwrap_or_default().to_string()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_list_with_mixed_steps() {
        let cases = parse_cases(
            r#"[{
                "id": 12,
                "title": "Login with email",
                "priority": "high",
                "tags": ["Smoke", {"title": "journey:auth"}],
                "steps": ["Open app", {"action": "Tap login", "expected_result": "Form shown", "data": null}]
            }]"#,
        )
        .unwrap();

        let case = &cases[0];
        assert_eq!(case.id, "12");
        assert_eq!(case.priority, CasePriority::High);
        assert_eq!(case.tags, vec!["smoke", "journey:auth"]);
        assert_eq!(case.steps.len(), 2);
        assert_eq!(case.steps[1].action(), "Tap login");
        assert!(!case.is_onboarding);
    }

    #[test]
    fn test_suite_tree_builds_paths() {
        let cases = parse_cases(
            r#"{"suites": [{
                "title": "Regression",
                "cases": [{"id": 1, "title": "A", "steps": ["x"]}],
                "suites": [{"title": "Auth", "cases": [{"id": 2, "title": "Onboarding carousel", "steps": ["y"], "priority": 3}]}]
            }]}"#,
        )
        .unwrap();

        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].suite_path, "Regression");
        assert_eq!(cases[1].suite_path, "Regression / Auth");
        assert_eq!(cases[1].priority, CasePriority::Low);
        assert!(cases[1].is_onboarding);
    }

    #[test]
    fn test_malformed_step_is_input_error() {
        let err = parse_cases(r#"[{"id": "TC-1", "title": "t", "steps": [42]}]"#).unwrap_err();
        assert!(matches!(err, DomainError::Input(_)));
        assert!(parse_cases("not json").is_err());
    }

    #[test]
    fn test_tested_formats() {
        let list = parse_tested(r#"["TC-1", 2]"#).unwrap();
        assert!(list.contains("TC-1") && list.contains("2"));

        let map = parse_tested(r#"{"TC-1": true, "TC-2": false, "TC-3": 1}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert!(!map.contains("TC-2"));

        assert!(parse_tested("  ").unwrap().is_empty());
        assert!(parse_tested("3").is_err());
    }

    #[tokio::test]
    async fn test_missing_tested_file_excludes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let tested = load_tested(&dir.path().join("tested.json")).await.unwrap();
        assert!(tested.is_empty());
    }
}
