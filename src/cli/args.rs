//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface using clap: the
//! global `Cli` struct and the `Commands` enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// reqforge - reconcile written requirements against generated web artifacts
#[derive(Parser)]
#[command(name = "reqforge")]
#[command(about = "Reconcile feature requirements against a generated web artifact set")]
#[command(long_about = r#"
reqforge reads a requirements document and, for each requirement, asks an LLM
provider whether the project's markup, style and behavior files already
implement it. Missing requirements are synthesized and merged without
duplication; every artifact is then syntax-checked and, when broken, repaired
once with a backup and an audit record.

EXAMPLES:
  # Reconcile REQUIREMENTS.md in the current project
  reqforge run

  # Use another requirements document
  reqforge run --requirements docs/features.md

  # Show what would be processed without oracle calls or writes
  reqforge run --dry-run

  # Validate every HTML, CSS and JavaScript file in the tree
  reqforge check

  # List the parsed requirements
  reqforge requirements

  # Show the effective configuration with value sources
  reqforge config

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > environment > config file > defaults
  Config file is discovered by searching upward from CWD for .reqforge/config.toml
  Use --config to specify an explicit config file path
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root holding the requirements and artifacts
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// LLM provider to use (anthropic or openrouter)
    #[arg(long, global = true)]
    pub llm_provider: Option<String>,

    /// Model to use for LLM provider calls
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Maximum number of oracle calls for this run
    #[arg(long, global = true)]
    pub budget: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile every requirement, then sweep and repair the project tree
    ///
    /// Individual requirement or artifact failures are logged and do not
    /// change the exit code.
    ///
    /// EXAMPLES:
    ///   reqforge run
    ///   reqforge run --dry-run
    ///   reqforge run --json
    Run {
        /// Requirements document (default: REQUIREMENTS.md in the project root)
        #[arg(long)]
        requirements: Option<PathBuf>,

        /// Skip judgment and synthesis; validate without repairing or writing
        #[arg(long)]
        dry_run: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate every artifact in the project tree without repairing
    ///
    /// Exits with code 3 when any artifact is invalid.
    ///
    /// EXAMPLES:
    ///   reqforge check
    ///   reqforge check --json
    Check {
        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the parsed requirements in source order
    Requirements {
        /// Requirements document (default: REQUIREMENTS.md in the project root)
        #[arg(long)]
        requirements: Option<PathBuf>,
    },

    /// Show the effective configuration and where each value came from
    Config,
}

/// Build the clap command (for completions and white-box tests)
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
