use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use reqforge_utils::types::{ArtifactKind, ConfigSource};

use super::{ArtifactsConfig, CliArgs, Config, LlmConfig, LoggingConfig, ProjectConfig};

/// Directory holding the config file and default state
pub const CONFIG_DIR: &str = ".reqforge";

/// Config file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.toml";

/// Environment override for `[llm] provider`
pub const PROVIDER_ENV: &str = "REQFORGE_LLM_PROVIDER";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct TomlConfig {
    pub(crate) project: Option<ProjectConfig>,
    pub(crate) artifacts: Option<ArtifactsConfig>,
    pub(crate) llm: Option<LlmConfig>,
    pub(crate) logging: Option<LoggingConfig>,
}

/// Overwrite `slot` when `value` is set and record where it came from.
fn apply<T>(
    slot: &mut Option<T>,
    value: Option<T>,
    key: &str,
    source: &ConfigSource,
    attribution: &mut HashMap<String, ConfigSource>,
) {
    if value.is_some() {
        *slot = value;
        attribution.insert(key.to_string(), source.clone());
    }
}

fn to_utf8(path: &Path) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|p| anyhow::anyhow!("Path is not valid UTF-8: {}", p.display()))
}

impl Config {
    /// Discover and load configuration with precedence: CLI > environment > file > defaults
    ///
    /// Uses the current working directory as the discovery starting point
    /// when no explicit config path is given.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut source_attribution = HashMap::new();

        let mut project = ProjectConfig::default();
        let mut artifacts = ArtifactsConfig::default();
        let mut llm = LlmConfig::default();
        let mut logging = LoggingConfig::default();

        for key in [
            "project.root",
            "project.requirements",
            "project.changelog",
            "project.fixes_dir",
            "project.exclude",
            "artifacts.markup",
            "artifacts.style",
            "artifacts.behavior",
            "logging.verbose",
        ] {
            source_attribution.insert(key.to_string(), ConfigSource::Defaults);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(reqforge_utils::error::ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    }
                    .into());
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir)?,
        };

        let mut base_dir = to_utf8(start_dir)?;
        let mut config_file = None;

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            let source = ConfigSource::ConfigFile(path.clone());
            let path = to_utf8(path)?;
            base_dir = Self::base_dir_for(&path);
            config_file = Some(path);

            if let Some(file_project) = file_config.project {
                let attr = &mut source_attribution;
                apply(&mut project.root, file_project.root, "project.root", &source, attr);
                apply(
                    &mut project.requirements,
                    file_project.requirements,
                    "project.requirements",
                    &source,
                    attr,
                );
                apply(
                    &mut project.changelog,
                    file_project.changelog,
                    "project.changelog",
                    &source,
                    attr,
                );
                apply(
                    &mut project.fixes_dir,
                    file_project.fixes_dir,
                    "project.fixes_dir",
                    &source,
                    attr,
                );
                apply(&mut project.exclude, file_project.exclude, "project.exclude", &source, attr);
            }

            if let Some(mut file_artifacts) = file_config.artifacts {
                for kind in ArtifactKind::ALL {
                    let value = file_artifacts.slot_mut(kind).take();
                    apply(
                        artifacts.slot_mut(kind),
                        value,
                        &format!("artifacts.{kind}"),
                        &source,
                        &mut source_attribution,
                    );
                }
            }

            if let Some(file_llm) = file_config.llm {
                let attr = &mut source_attribution;
                apply(&mut llm.provider, file_llm.provider, "llm.provider", &source, attr);
                apply(
                    &mut llm.fallback_provider,
                    file_llm.fallback_provider,
                    "llm.fallback_provider",
                    &source,
                    attr,
                );
                apply(&mut llm.model, file_llm.model, "llm.model", &source, attr);
                apply(&mut llm.timeout_secs, file_llm.timeout_secs, "llm.timeout_secs", &source, attr);
                apply(&mut llm.budget, file_llm.budget, "llm.budget", &source, attr);
                apply(
                    &mut llm.system_prompt,
                    file_llm.system_prompt,
                    "llm.system_prompt",
                    &source,
                    attr,
                );
                apply(&mut llm.anthropic, file_llm.anthropic, "llm.anthropic", &source, attr);
                apply(&mut llm.openrouter, file_llm.openrouter, "llm.openrouter", &source, attr);
            }

            if let Some(file_logging) = file_config.logging {
                let attr = &mut source_attribution;
                apply(&mut logging.verbose, file_logging.verbose, "logging.verbose", &source, attr);
                apply(&mut logging.file, file_logging.file, "logging.file", &source, attr);
            }
        }

        // Environment sits between the file and the command line
        if let Ok(env_provider) = env::var(PROVIDER_ENV)
            && !env_provider.is_empty()
        {
            llm.provider = Some(env_provider);
            source_attribution.insert("llm.provider".to_string(), ConfigSource::Environment);
        }

        let cli = ConfigSource::Cli;
        let attr = &mut source_attribution;
        apply(
            &mut project.root,
            cli_args.root.as_ref().map(|p| p.display().to_string()),
            "project.root",
            &cli,
            attr,
        );
        apply(
            &mut project.requirements,
            cli_args.requirements.as_ref().map(|p| p.display().to_string()),
            "project.requirements",
            &cli,
            attr,
        );
        apply(&mut logging.verbose, cli_args.verbose, "logging.verbose", &cli, attr);
        apply(&mut llm.provider, cli_args.llm_provider.clone(), "llm.provider", &cli, attr);
        apply(&mut llm.model, cli_args.model.clone(), "llm.model", &cli, attr);
        apply(&mut llm.budget, cli_args.budget, "llm.budget", &cli, attr);

        if llm.provider.is_none() {
            llm.provider = Some(super::DEFAULT_PROVIDER.to_string());
            source_attribution.insert("llm.provider".to_string(), ConfigSource::Defaults);
        }
        if llm.timeout_secs.is_none() {
            llm.timeout_secs = Some(super::DEFAULT_TIMEOUT_SECS);
            source_attribution.insert("llm.timeout_secs".to_string(), ConfigSource::Defaults);
        }

        let config = Self {
            project,
            artifacts,
            llm,
            logging,
            base_dir,
            config_file,
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }

    /// Discover config file by searching upward from a given directory
    ///
    /// Walks up the directory tree looking for `.reqforge/config.toml`, stopping
    /// at repository root markers (.git, .hg, .svn) or the filesystem root.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.is_file() {
                return Ok(Some(config_path));
            }

            if [".git", ".hg", ".svn"]
                .iter()
                .any(|marker| current_dir.join(marker).exists())
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    /// Directory the project root resolves against for a given config file.
    ///
    /// `<dir>/.reqforge/config.toml` yields `<dir>`; any other location
    /// yields the file's own directory.
    fn base_dir_for(config_path: &Utf8Path) -> Utf8PathBuf {
        let parent = config_path.parent().unwrap_or(Utf8Path::new("."));
        if parent.file_name() == Some(CONFIG_DIR) {
            parent.parent().unwrap_or(Utf8Path::new(".")).to_path_buf()
        } else {
            parent.to_path_buf()
        }
    }

    /// Load configuration from TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).map_err(|e| {
            reqforge_utils::error::ConfigError::InvalidFile(format!("{}: {e}", path.display()))
                .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let config_dir = dir.join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join(CONFIG_FILE);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    #[serial]
    fn test_defaults_without_config_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        let config = Config::discover_from(temp.path(), &CliArgs::default()).unwrap();

        assert!(config.config_file.is_none());
        assert_eq!(config.provider(), "anthropic");
        assert_eq!(config.base_dir.as_std_path(), temp.path());
        assert_eq!(
            config.source_attribution.get("project.requirements"),
            Some(&ConfigSource::Defaults)
        );
    }

    #[test]
    #[serial]
    fn test_discovers_config_in_ancestor() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            "[project]\nrequirements = \"docs/REQS.md\"\n\n[artifacts]\nmarkup = \"page.html\"\n",
        );
        let nested = temp.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::discover_from(&nested, &CliArgs::default()).unwrap();

        assert_eq!(config.base_dir.as_std_path(), temp.path());
        assert_eq!(
            config.requirements_path().as_std_path(),
            temp.path().join("docs/REQS.md")
        );
        assert_eq!(config.artifacts.file_name(ArtifactKind::Markup), "page.html");
        assert!(matches!(
            config.source_attribution.get("artifacts.markup"),
            Some(ConfigSource::ConfigFile(_))
        ));
        assert_eq!(
            config.source_attribution.get("artifacts.style"),
            Some(&ConfigSource::Defaults)
        );
    }

    #[test]
    #[serial]
    fn test_discovery_stops_at_repository_root() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "[llm]\nprovider = \"openrouter\"\n");
        let repo = temp.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        let found = Config::discover_config_file_from(&repo).unwrap();
        assert!(found.is_none());
    }

    #[test]
    #[serial]
    fn test_cli_overrides_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[llm]\nprovider = \"openrouter\"\nbudget = 10\n");

        let cli = CliArgs {
            llm_provider: Some("anthropic".to_string()),
            budget: Some(3),
            verbose: Some(true),
            ..CliArgs::default()
        };
        let config = Config::discover_from(temp.path(), &cli).unwrap();

        assert_eq!(config.provider(), "anthropic");
        assert_eq!(config.llm.budget, Some(3));
        assert!(config.verbose());
        assert_eq!(config.source_attribution.get("llm.budget"), Some(&ConfigSource::Cli));
    }

    #[test]
    #[serial]
    fn test_env_provider_between_file_and_cli() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[llm]\nprovider = \"anthropic\"\n");

        unsafe {
            env::set_var(PROVIDER_ENV, "openrouter");
        }
        let from_env = Config::discover_from(temp.path(), &CliArgs::default()).unwrap();
        let from_cli = Config::discover_from(
            temp.path(),
            &CliArgs {
                llm_provider: Some("anthropic".to_string()),
                ..CliArgs::default()
            },
        )
        .unwrap();
        unsafe {
            env::remove_var(PROVIDER_ENV);
        }

        assert_eq!(from_env.provider(), "openrouter");
        assert_eq!(
            from_env.source_attribution.get("llm.provider"),
            Some(&ConfigSource::Environment)
        );
        assert_eq!(from_cli.provider(), "anthropic");
    }

    #[test]
    #[serial]
    fn test_explicit_missing_config_is_not_found() {
        let temp = TempDir::new().unwrap();
        let cli = CliArgs {
            config_path: Some(temp.path().join("nope.toml")),
            ..CliArgs::default()
        };

        let err = Config::discover_from(temp.path(), &cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<reqforge_utils::error::ConfigError>(),
            Some(reqforge_utils::error::ConfigError::NotFound { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_malformed_toml_is_invalid_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[project\nrequirements = ");

        let err = Config::discover_from(temp.path(), &CliArgs::default()).unwrap_err();
        let config_err = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<reqforge_utils::error::ConfigError>());
        assert!(matches!(
            config_err,
            Some(reqforge_utils::error::ConfigError::InvalidFile(_))
        ));
    }

    #[test]
    fn test_base_dir_for_explicit_file_outside_config_dir() {
        let base = Config::base_dir_for(Utf8Path::new("/etc/reqforge/site.toml"));
        assert_eq!(base, Utf8PathBuf::from("/etc/reqforge"));

        let base = Config::base_dir_for(Utf8Path::new("/work/.reqforge/config.toml"));
        assert_eq!(base, Utf8PathBuf::from("/work"));
    }
}
