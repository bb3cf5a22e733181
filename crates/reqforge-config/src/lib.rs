//! Configuration management for reqforge
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > file > defaults. The TOML file has `[project]`,
//! `[artifacts]`, `[llm]` and `[logging]` sections.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use discovery::{CONFIG_DIR, CONFIG_FILE, PROVIDER_ENV};
pub use model::*;
pub use reqforge_utils::types::ConfigSource;
