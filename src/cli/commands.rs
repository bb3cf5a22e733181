//! Command implementations
//!
//! Each command returns the exit code to report; errors are rendered by
//! the caller.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

use reqforge_engine::{
    CheckStatus, GenerationOracle, LlmOracle, OfflineOracle, ReconciliationLoop, RunContext,
    RunSummary, load_requirements,
};

use crate::{Config, ExitCode, ReqforgeError};

/// `reqforge run`
pub async fn execute_run_command(config: &Config, dry_run: bool, json: bool) -> Result<ExitCode> {
    // Nothing to reconcile: no provider is needed, so none is built.
    let source = config.requirements_path();
    if !source.exists() {
        warn!(path = %source, "Requirements source not found; nothing to do");
        print_summary(&RunSummary::default(), dry_run, json)?;
        return Ok(ExitCode::SUCCESS);
    }

    let oracle: Arc<dyn GenerationOracle> = if dry_run {
        Arc::new(OfflineOracle::default())
    } else {
        let (oracle, fallback) = LlmOracle::from_config(config).map_err(ReqforgeError::Llm)?;
        if let Some(info) = fallback {
            warn!(
                primary = %info.primary_provider,
                fallback = %info.fallback_provider,
                reason = %info.reason,
                "Using fallback provider"
            );
            eprintln!(
                "⚠ Provider '{}' unavailable, using '{}'",
                info.primary_provider, info.fallback_provider
            );
        }
        Arc::new(oracle)
    };

    let ctx = RunContext::from_config(config, oracle);
    let reconciler = ReconciliationLoop::new(ctx).context("Failed to prepare the run")?;

    let summary = if dry_run {
        reconciler.dry_run().await
    } else {
        reconciler.run().await
    };

    print_summary(&summary, dry_run, json)?;
    Ok(ExitCode::SUCCESS)
}

fn print_summary(summary: &RunSummary, dry_run: bool, json: bool) -> Result<()> {
    if json {
        let output = serde_json::to_string_pretty(summary).context("Failed to emit run summary")?;
        println!("{output}");
    } else {
        if dry_run {
            println!("Dry run: no oracle calls were made and nothing was written.");
        }
        print!("{summary}");
    }
    Ok(())
}

/// `reqforge check`
pub fn execute_check_command(config: &Config, json: bool) -> Result<ExitCode> {
    let ctx = RunContext::from_config(config, Arc::new(OfflineOracle::default()));
    let root = ctx.project_root.clone();
    let reconciler = ReconciliationLoop::new(ctx).context("Failed to prepare the check")?;
    let checks = reconciler.check_tree();

    let failing = checks
        .iter()
        .filter(|check| check.status != CheckStatus::Valid)
        .count();

    if json {
        let output = serde_json::to_string_pretty(&checks).context("Failed to emit check results")?;
        println!("{output}");
    } else {
        for check in &checks {
            let path = check.path.strip_prefix(&root).unwrap_or(check.path.as_path());
            match &check.status {
                CheckStatus::Valid => println!("  ✓ {path}"),
                CheckStatus::Invalid { diagnostic } => println!("  ✗ {path}: {diagnostic}"),
                CheckStatus::Unreadable { reason } => println!("  ✗ {path}: {reason}"),
            }
        }
        println!();
        println!("{} artifacts checked, {failing} invalid", checks.len());
    }

    if failing > 0 {
        Ok(ExitCode::INVALID_ARTIFACTS)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// `reqforge requirements`
pub fn execute_requirements_command(config: &Config) -> Result<ExitCode> {
    let path = config.requirements_path();
    let Some(requirements) = load_requirements(&path).map_err(ReqforgeError::Store)? else {
        println!("No requirements source found at {path}");
        return Ok(ExitCode::SUCCESS);
    };

    for (index, requirement) in requirements.iter().enumerate() {
        let mut lines = requirement.text().lines();
        println!("{:>3}. {}", index + 1, lines.next().unwrap_or(""));
        for line in lines {
            println!("     {line}");
        }
    }
    if requirements.is_empty() {
        println!("{path} contains no requirements");
    }

    Ok(ExitCode::SUCCESS)
}

/// `reqforge config`
pub fn execute_config_command(config: &Config) -> Result<ExitCode> {
    match &config.config_file {
        Some(path) => println!("Config file: {path}"),
        None => println!("Config file: none (using defaults)"),
    }
    println!();

    let effective = config.effective_config();
    let width = effective.keys().map(String::len).max().unwrap_or(0);
    for (key, (value, source)) in &effective {
        println!("  {key:<width$} = {value}  [{source}]");
    }

    Ok(ExitCode::SUCCESS)
}
