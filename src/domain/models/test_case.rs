//! Test case domain model.
//!
//! A test case is one manual QA case exported from the test management
//! tool. Cases are immutable once loaded for a run.

use serde::{Deserialize, Serialize};

/// Entry point used when nothing more specific is known.
pub const DEFAULT_ENTRY_POINT: &str = "home";

/// Keyword groups checked in order; the first match names the entry point.
const ENTRY_KEYWORDS: &[(&[&str], &str)] = &[
    (&["onboarding"], "onboarding"),
    (&["login", "log in", "sign in"], "auth/login"),
    (&["profile"], "profile"),
    (&["settings"], "settings"),
];

/// Priority declared on a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CasePriority {
    High,
    #[default]
    Medium,
    Low,
    Undefined,
}

impl CasePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Undefined => "undefined",
        }
    }

    /// Parse a priority label; unknown labels map to `Undefined`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" | "critical" | "blocker" => Self::High,
            "medium" | "normal" | "major" => Self::Medium,
            "low" | "minor" | "trivial" => Self::Low,
            _ => Self::Undefined,
        }
    }

    /// Sort rank, lower runs first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
            Self::Undefined => 3,
        }
    }
}

impl std::fmt::Display for CasePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw step of a test case.
///
/// Exports contain either plain text steps or structured
/// action/data/expected-result triples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaseStep {
    Text(String),
    Structured {
        #[serde(default)]
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_result: Option<String>,
    },
}

impl CaseStep {
    /// The step's primary text.
    pub fn action(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Structured { action, .. } => action,
        }
    }

    /// A step is blank when it carries no action text at all.
    pub fn is_blank(&self) -> bool {
        self.action().trim().is_empty()
    }
}

/// A test case as loaded for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub steps: Vec<CaseStep>,
    /// Lower-cased tags.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: CasePriority,
    #[serde(default)]
    pub preconditions: String,
    /// Suite path joined with `" / "`, empty when the export had no suites.
    #[serde(default)]
    pub suite_path: String,
    #[serde(default)]
    pub is_onboarding: bool,
}

impl TestCase {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            steps: Vec::new(),
            tags: Vec::new(),
            priority: CasePriority::default(),
            preconditions: String::new(),
            suite_path: String::new(),
            is_onboarding: false,
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(CaseStep::Text(step.into()));
        self
    }

    /// Add a tag. An `onboarding` tag also marks the case as onboarding.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into().to_lowercase();
        if tag == "onboarding" {
            self.is_onboarding = true;
        }
        self.tags.push(tag);
        self
    }

    pub fn with_priority(mut self, priority: CasePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_suite_path(mut self, suite_path: impl Into<String>) -> Self {
        self.suite_path = suite_path.into();
        self
    }

    /// Value of the first `prefix:value` tag, if any.
    pub fn tag_value(&self, prefix: &str) -> Option<&str> {
        self.tags.iter().find_map(|tag| {
            tag.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix(':'))
                .map(str::trim)
                .filter(|value| !value.is_empty())
        })
    }

    /// Explicit ordering hint from an `order:<n>` tag.
    pub fn order_hint(&self) -> Option<u32> {
        self.tag_value("order").and_then(|v| v.parse().ok())
    }

    /// Compact text of all steps, used for heuristics and prompts.
    pub fn steps_text(&self) -> String {
        self.steps
            .iter()
            .map(CaseStep::action)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Entry point the case starts from.
    ///
    /// An explicit `entry:<name>` tag wins; otherwise keywords in the
    /// title, preconditions and steps decide, falling back to `home`.
    pub fn entry_point(&self) -> String {
        if let Some(entry) = self.tag_value("entry") {
            return entry.to_string();
        }
        self.inferred_entry_point()
            .unwrap_or(DEFAULT_ENTRY_POINT)
            .to_string()
    }

    /// Keyword inference of the starting screen, `None` if nothing matched.
    pub fn inferred_entry_point(&self) -> Option<&'static str> {
        let haystack = [self.title.as_str(), self.preconditions.as_str()]
            .into_iter()
            .chain(self.steps.iter().map(CaseStep::action))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        ENTRY_KEYWORDS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| haystack.contains(k)))
            .map(|(_, entry)| *entry)
    }

    /// Validate the case for automation.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err(format!("case '{}' has an empty id", self.title));
        }
        if self.steps.is_empty() {
            return Err(format!("case {} has no steps", self.id));
        }
        if let Some(index) = self.steps.iter().position(CaseStep::is_blank) {
            return Err(format!("case {} has a blank step at position {}", self.id, index + 1));
        }
        Ok(())
    }
}
