//! QA Automator CLI entry point.

use clap::Parser;

use qa_automator::cli::{commands, handle_error, Cli, Commands, ProjectContext};
use qa_automator::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let context = ProjectContext::load(&cli.project);
    let log_config = context
        .as_ref()
        .map(ProjectContext::log_config)
        .unwrap_or_else(|_| LogConfig::default());
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, &cli.project, cli.json).await,
        command => match context {
            Ok(ctx) => match command {
                Commands::Run(args) => commands::run::execute(args, &ctx, cli.json).await,
                Commands::Scenarios(args) => {
                    commands::scenarios::execute(args, &ctx, cli.json).await
                }
                Commands::Memory(args) => commands::memory::execute(args, &ctx, cli.json).await,
                Commands::Status(args) => commands::status::execute(args, &ctx, cli.json).await,
                Commands::Init(args) => commands::init::execute(args, &cli.project, cli.json).await,
            },
            Err(err) => Err(err),
        },
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
