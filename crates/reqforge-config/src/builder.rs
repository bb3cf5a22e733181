use camino::Utf8PathBuf;
use std::collections::HashMap;

use reqforge_utils::error::ConfigError;
use reqforge_utils::types::{ArtifactKind, ConfigSource};

use super::{
    AnthropicConfig, ArtifactsConfig, Config, DEFAULT_PROVIDER, DEFAULT_TIMEOUT_SECS, LlmConfig,
    LoggingConfig, OpenRouterConfig, ProjectConfig,
};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding reqforge or in tests, where neither the
    /// environment nor a config file should influence the result.
    ///
    /// # Example
    ///
    /// ```rust
    /// use reqforge_config::Config;
    /// use reqforge_utils::types::ArtifactKind;
    ///
    /// let config = Config::builder()
    ///     .root("/srv/site")
    ///     .artifact(ArtifactKind::Markup, "home.html")
    ///     .budget(20)
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.artifact_path(ArtifactKind::Markup).as_str(), "/srv/site/home.html");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration.
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    root: Option<Utf8PathBuf>,
    requirements: Option<String>,
    changelog: Option<String>,
    fixes_dir: Option<String>,
    exclude: Option<Vec<String>>,
    artifacts: ArtifactsConfig,
    artifacts_set: Vec<ArtifactKind>,
    provider: Option<String>,
    fallback_provider: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    budget: Option<u32>,
    system_prompt: Option<String>,
    anthropic: Option<AnthropicConfig>,
    openrouter: Option<OpenRouterConfig>,
    verbose: Option<bool>,
    log_file: Option<String>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            artifacts: ArtifactsConfig::default(),
            ..Self::default()
        }
    }

    /// Project root; defaults to the current directory (`.`).
    #[must_use]
    pub fn root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    #[must_use]
    pub fn requirements(mut self, path: impl Into<String>) -> Self {
        self.requirements = Some(path.into());
        self
    }

    #[must_use]
    pub fn changelog(mut self, path: impl Into<String>) -> Self {
        self.changelog = Some(path.into());
        self
    }

    #[must_use]
    pub fn fixes_dir(mut self, path: impl Into<String>) -> Self {
        self.fixes_dir = Some(path.into());
        self
    }

    /// Replace the sweep exclusion globs.
    #[must_use]
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Tracked file name for one artifact kind.
    #[must_use]
    pub fn artifact(mut self, kind: ArtifactKind, file_name: impl Into<String>) -> Self {
        *self.artifacts.slot_mut(kind) = Some(file_name.into());
        self.artifacts_set.push(kind);
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    #[must_use]
    pub fn fallback_provider(mut self, provider: impl Into<String>) -> Self {
        self.fallback_provider = Some(provider.into());
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn budget(mut self, calls: u32) -> Self {
        self.budget = Some(calls);
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn anthropic(mut self, anthropic: AnthropicConfig) -> Self {
        self.anthropic = Some(anthropic);
        self
    }

    #[must_use]
    pub fn openrouter(mut self, openrouter: OpenRouterConfig) -> Self {
        self.openrouter = Some(openrouter);
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    #[must_use]
    pub fn log_file(mut self, path: impl Into<String>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut attribution = HashMap::new();
        let mut mark = |key: &str, set: bool| {
            let source = if set {
                ConfigSource::Programmatic
            } else {
                ConfigSource::Defaults
            };
            attribution.insert(key.to_string(), source);
        };

        mark("project.root", self.root.is_some());
        mark("project.requirements", self.requirements.is_some());
        mark("project.changelog", self.changelog.is_some());
        mark("project.fixes_dir", self.fixes_dir.is_some());
        mark("project.exclude", self.exclude.is_some());
        for kind in ArtifactKind::ALL {
            mark(&format!("artifacts.{kind}"), self.artifacts_set.contains(&kind));
        }
        mark("llm.provider", self.provider.is_some());
        mark("llm.timeout_secs", self.timeout_secs.is_some());
        mark("logging.verbose", self.verbose.is_some());
        if self.fallback_provider.is_some() {
            mark("llm.fallback_provider", true);
        }
        if self.model.is_some() {
            mark("llm.model", true);
        }
        if self.budget.is_some() {
            mark("llm.budget", true);
        }
        if self.log_file.is_some() {
            mark("logging.file", true);
        }

        let defaults = ProjectConfig::default();
        let project = ProjectConfig {
            root: Some(".".to_string()),
            requirements: self.requirements.or(defaults.requirements),
            changelog: self.changelog.or(defaults.changelog),
            fixes_dir: self.fixes_dir.or(defaults.fixes_dir),
            exclude: self.exclude.or(defaults.exclude),
        };

        let llm = LlmConfig {
            provider: Some(self.provider.unwrap_or_else(|| DEFAULT_PROVIDER.to_string())),
            fallback_provider: self.fallback_provider,
            model: self.model,
            timeout_secs: Some(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            budget: self.budget,
            system_prompt: self.system_prompt,
            anthropic: self.anthropic,
            openrouter: self.openrouter,
        };

        let logging = LoggingConfig {
            verbose: Some(self.verbose.unwrap_or(false)),
            file: self.log_file,
        };

        let config = Config {
            project,
            artifacts: self.artifacts,
            llm,
            logging,
            base_dir: self.root.unwrap_or_else(|| Utf8PathBuf::from(".")),
            config_file: None,
            source_attribution: attribution,
        };

        config.validate()?;
        Ok(config)
    }
}
