//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Builds CliArgs and discovers Config
//! - Installs the tracing subscriber
//! - Creates the tokio runtime
//! - Dispatches to command handlers
//! - Handles all error output

use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};

use super::args::{Cli, Commands};
use super::commands;

use crate::{CliArgs, Config, ExitCode, ReqforgeError};
use reqforge_utils::error::ConfigError;
use reqforge_utils::logging::init_tracing;

/// Main CLI execution function.
///
/// Handles ALL output including errors. On error it prints a report and
/// returns the exit code; `main` only maps it to the process exit status.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let requirements = match &cli.command {
        Commands::Run { requirements, .. } | Commands::Requirements { requirements } => {
            requirements.as_deref().map(absolute)
        }
        Commands::Check { .. } | Commands::Config => None,
    };

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        root: cli.root.as_deref().map(absolute),
        requirements,
        verbose: cli.verbose.then_some(true),
        llm_provider: cli.llm_provider.clone(),
        model: cli.model.clone(),
        budget: cli.budget,
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            report_error(&err);
            return Err(ExitCode::CLI_ARGS);
        }
    };

    let log_file = config.log_file();
    if let Err(e) = init_tracing(config.verbose(), log_file.as_deref()) {
        eprintln!("✗ Failed to initialise logging: {e:#}");
        return Err(ExitCode::INTERNAL);
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Commands::Run { dry_run, json, .. } => {
                commands::execute_run_command(&config, dry_run, json).await
            }
            Commands::Check { json } => commands::execute_check_command(&config, json),
            Commands::Requirements { .. } => commands::execute_requirements_command(&config),
            Commands::Config => commands::execute_config_command(&config),
        }
    });

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(error) => {
            report_error(&error);
            Err(error
                .downcast_ref::<ReqforgeError>()
                .map_or(ExitCode::INTERNAL, ReqforgeError::to_exit_code))
        }
    }
}

/// Print an error, using the structured report when the cause is known.
fn report_error(error: &anyhow::Error) {
    if let Some(err) = error.downcast_ref::<ReqforgeError>() {
        eprintln!("{}", err.display_for_user());
    } else if let Some(err) = error.downcast_ref::<ConfigError>() {
        eprintln!("{}", ReqforgeError::Config(err.clone()).display_for_user());
    } else {
        eprintln!("✗ {error:#}");
        eprintln!("\n  Run with --verbose for more detailed output");
    }
}

/// Resolve a CLI path against the working directory.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
