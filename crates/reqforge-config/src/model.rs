use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use reqforge_utils::types::{ArtifactKind, ConfigSource};

/// Default requirements document, relative to the project root
pub const DEFAULT_REQUIREMENTS_FILE: &str = "REQUIREMENTS.md";

/// Default changelog, relative to the project root
pub const DEFAULT_CHANGELOG_FILE: &str = "FEATURES.md";

/// Default fix record directory, relative to the project root
pub const DEFAULT_FIXES_DIR: &str = ".reqforge/fixes";

/// Default LLM provider
pub const DEFAULT_PROVIDER: &str = "anthropic";

/// Default per-call timeout for the generation oracle
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Providers the backend factory knows how to build
pub const SUPPORTED_PROVIDERS: &[&str] = &["anthropic", "openrouter"];

/// Directory patterns skipped by the final sweep unless configured otherwise
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules/**",
    "target/**",
    ".git/**",
    "dist/**",
    ".reqforge/**",
];

/// Configuration for a reqforge run.
///
/// Precedence is CLI arguments > config file > built-in defaults. Relative
/// paths in the `[project]` section resolve against the project root, and
/// the project root itself resolves against `base_dir` (the directory that
/// holds `.reqforge/`, or the starting directory when no file was found).
///
/// # Example
///
/// ```rust,no_run
/// use reqforge_config::{CliArgs, Config};
///
/// let config = Config::discover(&CliArgs::default())?;
/// println!("requirements: {}", config.requirements_path());
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// # Configuration File Format
///
/// ```toml
/// [project]
/// requirements = "REQUIREMENTS.md"
/// changelog = "FEATURES.md"
/// exclude = ["node_modules/**"]
///
/// [artifacts]
/// markup = "index.html"
///
/// [llm]
/// provider = "anthropic"
/// model = "claude-sonnet-4-5"
/// timeout_secs = 120
///
/// [logging]
/// file = ".reqforge/run.log"
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub artifacts: ArtifactsConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
    /// Directory the project root is resolved against.
    pub base_dir: Utf8PathBuf,
    /// Config file that contributed values, if any.
    pub config_file: Option<Utf8PathBuf>,
    /// Source attribution for each setting (for `reqforge config`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[project]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProjectConfig {
    pub root: Option<String>,
    pub requirements: Option<String>,
    pub changelog: Option<String>,
    pub fixes_dir: Option<String>,
    pub exclude: Option<Vec<String>>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: Some(".".to_string()),
            requirements: Some(DEFAULT_REQUIREMENTS_FILE.to_string()),
            changelog: Some(DEFAULT_CHANGELOG_FILE.to_string()),
            fixes_dir: Some(DEFAULT_FIXES_DIR.to_string()),
            exclude: Some(DEFAULT_EXCLUDES.iter().map(|s| (*s).to_string()).collect()),
        }
    }
}

/// `[artifacts]` section: the tracked file name for each kind
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArtifactsConfig {
    pub markup: Option<String>,
    pub style: Option<String>,
    pub behavior: Option<String>,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            markup: Some(ArtifactKind::Markup.default_file_name().to_string()),
            style: Some(ArtifactKind::Style.default_file_name().to_string()),
            behavior: Some(ArtifactKind::Behavior.default_file_name().to_string()),
        }
    }
}

impl ArtifactsConfig {
    /// Configured file name for `kind`, or its built-in default.
    #[must_use]
    pub fn file_name(&self, kind: ArtifactKind) -> &str {
        let configured = match kind {
            ArtifactKind::Markup => self.markup.as_deref(),
            ArtifactKind::Style => self.style.as_deref(),
            ArtifactKind::Behavior => self.behavior.as_deref(),
        };
        configured.unwrap_or(kind.default_file_name())
    }

    pub(crate) fn slot_mut(&mut self, kind: ArtifactKind) -> &mut Option<String> {
        match kind {
            ArtifactKind::Markup => &mut self.markup,
            ArtifactKind::Style => &mut self.style,
            ArtifactKind::Behavior => &mut self.behavior,
        }
    }
}

/// `[llm]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub fallback_provider: Option<String>,
    /// Model override applied to whichever provider is selected.
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Maximum oracle calls per run.
    pub budget: Option<u32>,
    /// System prompt sent with every oracle call.
    pub system_prompt: Option<String>,
    pub anthropic: Option<AnthropicConfig>,
    pub openrouter: Option<OpenRouterConfig>,
}

/// `[llm.anthropic]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnthropicConfig {
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// `[llm.openrouter]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OpenRouterConfig {
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    /// Optional run log file, relative to the project root.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbose: Some(false),
            file: None,
        }
    }
}

impl Config {
    /// Resolved project root.
    #[must_use]
    pub fn project_root(&self) -> Utf8PathBuf {
        match self.project.root.as_deref() {
            None | Some("") | Some(".") => self.base_dir.clone(),
            Some(root) => self.base_dir.join(root),
        }
    }

    fn in_root(&self, relative: &str) -> Utf8PathBuf {
        let path = Utf8Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root().join(path)
        }
    }

    #[must_use]
    pub fn requirements_path(&self) -> Utf8PathBuf {
        self.in_root(
            self.project
                .requirements
                .as_deref()
                .unwrap_or(DEFAULT_REQUIREMENTS_FILE),
        )
    }

    #[must_use]
    pub fn changelog_path(&self) -> Utf8PathBuf {
        self.in_root(
            self.project
                .changelog
                .as_deref()
                .unwrap_or(DEFAULT_CHANGELOG_FILE),
        )
    }

    #[must_use]
    pub fn fixes_dir(&self) -> Utf8PathBuf {
        self.in_root(self.project.fixes_dir.as_deref().unwrap_or(DEFAULT_FIXES_DIR))
    }

    /// Path of the tracked artifact for `kind`.
    #[must_use]
    pub fn artifact_path(&self, kind: ArtifactKind) -> Utf8PathBuf {
        self.in_root(self.artifacts.file_name(kind))
    }

    /// Exclusion globs for the final sweep, relative to the project root.
    #[must_use]
    pub fn exclude_patterns(&self) -> Vec<String> {
        self.project.exclude.clone().unwrap_or_else(|| {
            DEFAULT_EXCLUDES.iter().map(|s| (*s).to_string()).collect()
        })
    }

    #[must_use]
    pub fn log_file(&self) -> Option<Utf8PathBuf> {
        self.logging.file.as_deref().map(|f| self.in_root(f))
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.logging.verbose.unwrap_or(false)
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        self.llm.provider.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    #[must_use]
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}
