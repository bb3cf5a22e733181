//! Command-line interface for reqforge
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions (clap)
//! - `run`: entry point, configuration loading and command dispatch
//! - `commands`: command implementations
//! - `tests`: flag parsing tests (cfg(test) only)

pub mod args;
mod commands;
mod run;


pub use args::{Cli, Commands, build_cli};
pub use run::run;
