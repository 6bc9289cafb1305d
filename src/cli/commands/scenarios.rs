//! Implementation of the `qa-automator scenarios` command.

use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use super::CaseInputArgs;
use crate::cli::context::ProjectContext;
use crate::cli::display::{list_table, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::Scenario;

#[derive(Args, Debug)]
pub struct ScenariosArgs {
    #[command(flatten)]
    pub input: CaseInputArgs,
}

#[derive(Debug, Serialize)]
pub struct ScenariosOutput {
    pub total_cases: usize,
    pub excluded: usize,
    pub scenarios: Vec<Scenario>,
}

impl CommandOutput for ScenariosOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["#", "id", "title", "priority", "cases"]);
        for scenario in &self.scenarios {
            let title = if scenario.is_onboarding {
                format!("{} (onboarding)", scenario.title)
            } else {
                scenario.title.clone()
            };
            table.add_row(vec![
                Cell::new(scenario.precedence + 1),
                Cell::new(&scenario.id),
                Cell::new(truncate(&title, 40)),
                Cell::new(scenario.priority.as_str()),
                Cell::new(truncate(&scenario.case_ids.join(", "), 50)),
            ]);
        }
        format!(
            "{}\n\n{} case(s) loaded, {} excluded as already tested",
            render_list("scenario", table, self.scenarios.len()),
            self.total_cases,
            self.excluded
        )
    }
}

pub async fn execute(args: ScenariosArgs, ctx: &ProjectContext, json_mode: bool) -> Result<()> {
    let loaded = args.input.load(&ctx.config.grouping).await?;
    let output_data = ScenariosOutput {
        total_cases: loaded.cases.len(),
        excluded: loaded.excluded.len(),
        scenarios: loaded.scenarios,
    };
    output(&output_data, json_mode);
    Ok(())
}
