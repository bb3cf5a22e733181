//! reqforge - requirement reconciliation for small generated web projects
//!
//! reqforge reads a requirements document, asks a generation oracle (an LLM
//! provider) whether each requirement is already implemented by the
//! project's markup, style and behavior files, synthesizes the missing ones,
//! and merges the result without duplication. Every artifact is then
//! syntax-checked; a broken file gets exactly one repair attempt, backed up
//! and recorded in an audit log.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Reconcile REQUIREMENTS.md against index.html / styles.css / script.js
//! reqforge run
//!
//! # Show what would be processed, without oracle calls or writes
//! reqforge run --dry-run
//!
//! # Validate every artifact in the tree (exit 3 when any is invalid)
//! reqforge check
//!
//! # Effective configuration and where each value came from
//! reqforge config
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reqforge::{Config, LlmOracle, ReconciliationLoop, RunContext};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::builder().root("/path/to/site").build()?;
//! let (oracle, _fallback) = LlmOracle::from_config(&config)?;
//! let ctx = RunContext::from_config(&config, Arc::new(oracle));
//!
//! let summary = ReconciliationLoop::new(ctx)?.run().await;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

/// Configuration for reqforge runs.
///
/// Use [`Config::discover()`] for CLI-like behavior or [`Config::builder()`]
/// for programmatic configuration.
pub use reqforge_config::Config;

/// Builder for programmatic configuration.
pub use reqforge_config::ConfigBuilder;

/// Command-line overrides applied on top of the config file.
pub use reqforge_config::CliArgs;

/// Library-level error type with user-facing rendering and exit code mapping.
pub use reqforge_utils::error::ReqforgeError;

/// Error categories for grouping similar errors.
pub use reqforge_utils::error::ErrorCategory;

/// Trait for providing user-friendly error reporting.
pub use reqforge_utils::error::UserFriendlyError;

/// Exit codes matching the documented exit code table.
pub use reqforge_utils::exit_codes::ExitCode;

pub use reqforge_utils::types::{ArtifactKind, Diagnostic};

pub use reqforge_engine::{
    ArtifactCheck, ArtifactStore, CheckStatus, GenerationOracle, ImplementationOracle,
    ImplementationProposal, LlmOracle, MergeOutcome, ReconciliationLoop, RepairCycle,
    RepairEngine, Requirement, RunContext, RunSummary, Synthesizer,
};

pub use reqforge_audit::{FixLog, FixOutcome, FixRecord};

pub use reqforge_validation::SyntaxValidator;

/// Returns the reqforge version string.
#[must_use]
pub fn reqforge_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[doc(hidden)]
pub use reqforge_utils::{atomic_write, error, exit_codes, logging, types};

#[doc(hidden)]
pub use reqforge_config as config;

#[doc(hidden)]
pub use reqforge_llm as llm;

#[doc(hidden)]
pub use reqforge_engine as engine;

// CLI internals, exported for white-box tests of flag parsing
#[doc(hidden)]
pub mod cli;
