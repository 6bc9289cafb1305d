//! CLI command implementations.

pub mod init;
pub mod memory;
pub mod run;
pub mod scenarios;
pub mod status;

use anyhow::{Context, Result};
use clap::Args;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::adapters::qase;
use crate::domain::models::{GroupingConfig, Scenario, TestCase};
use crate::services::CaseGrouper;

/// Where the cases come from.
#[derive(Args, Debug, Clone)]
pub struct CaseInputArgs {
    /// Qase JSON export with the test cases
    #[arg(long, short = 'c')]
    pub test_cases: PathBuf,

    /// JSON list (or id -> flag object) of cases already tested
    #[arg(long, short = 't')]
    pub tested: Option<PathBuf>,
}

/// Cases, exclusions and the scenarios they group into.
#[derive(Debug)]
pub struct LoadedCases {
    pub cases: Vec<TestCase>,
    pub excluded: HashSet<String>,
    pub scenarios: Vec<Scenario>,
}

impl CaseInputArgs {
    pub async fn load(&self, grouping: &GroupingConfig) -> Result<LoadedCases> {
        let cases = qase::load_cases(&self.test_cases).await?;
        let excluded = match &self.tested {
            Some(path) => qase::load_tested(path).await?,
            None => HashSet::new(),
        };
        let scenarios = CaseGrouper::new(grouping.clone())
            .group(&cases, &excluded)
            .context("Failed to group test cases into scenarios")?;
        Ok(LoadedCases {
            cases,
            excluded,
            scenarios,
        })
    }
}
