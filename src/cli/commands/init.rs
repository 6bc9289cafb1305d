//! Implementation of the `qa-automator init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::cli::context::PROJECT_DIR;
use crate::cli::display::{action_failure, action_success};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

const CONFIG_FILE: &str = "config.yaml";

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config.yaml with the defaults
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub directories_created: Vec<String>,
    pub config_written: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![if self.success {
            action_success(&self.message)
        } else {
            action_failure(&self.message)
        }];
        if !self.directories_created.is_empty() {
            lines.push("\nCreated directories:".to_string());
            for dir in &self.directories_created {
                lines.push(format!("  - {dir}"));
            }
        }
        if self.config_written {
            lines.push(format!("\nWrote {PROJECT_DIR}/{CONFIG_FILE}"));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, root: &Path, json_mode: bool) -> Result<()> {
    let output_data = initialize(root, args.force).await?;
    output(&output_data, json_mode);
    Ok(())
}

/// Create the project directory, the default config and the working
/// directories it names. Saved state is never touched.
pub async fn initialize(root: &Path, force: bool) -> Result<InitOutput> {
    let project_dir = root.join(PROJECT_DIR);
    let config_path = project_dir.join(CONFIG_FILE);

    if config_path.exists() && !force {
        return Ok(InitOutput {
            success: false,
            message: "Project already initialized. Use --force to rewrite the config.".to_string(),
            initialized_path: root.to_path_buf(),
            directories_created: vec![],
            config_written: false,
        });
    }

    let config = Config::default();
    let mut directories_created = vec![];
    for dir in [
        project_dir.clone(),
        root.join(&config.paths.state_dir),
        root.join(&config.paths.artifacts_dir),
        root.join(&config.paths.flows_dir),
    ] {
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let relative = dir.strip_prefix(root).unwrap_or(&dir).to_string_lossy().to_string();
            directories_created.push(relative);
        }
    }

    let yaml = serde_yaml::to_string(&config).context("Failed to serialize default config")?;
    fs::write(&config_path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    tracing::info!(path = %config_path.display(), "project initialized");

    Ok(InitOutput {
        success: true,
        message: if force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        initialized_path: root.to_path_buf(),
        directories_created,
        config_written: true,
    })
}
