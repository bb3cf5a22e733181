use std::path::PathBuf;

/// Command-line overrides, applied on top of the config file.
///
/// Paths are taken as given; the CLI makes them absolute before handing
/// them over so they do not get re-rooted under the project directory.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file (`--config`); disables discovery.
    pub config_path: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub requirements: Option<PathBuf>,
    pub verbose: Option<bool>,
    pub llm_provider: Option<String>,
    pub model: Option<String>,
    pub budget: Option<u32>,
}
