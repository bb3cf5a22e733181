use std::collections::BTreeMap;

use reqforge_utils::types::{ArtifactKind, ConfigSource};

use super::Config;

fn source_label(source: Option<&ConfigSource>) -> String {
    match source {
        Some(ConfigSource::Cli) => "cli".to_string(),
        Some(ConfigSource::Environment) => "env".to_string(),
        Some(ConfigSource::ConfigFile(_)) => "config".to_string(),
        Some(ConfigSource::Programmatic) => "programmatic".to_string(),
        Some(ConfigSource::Defaults) | None => "default".to_string(),
    }
}

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    ///
    /// API key values are never included; only the name of the environment
    /// variable they are read from.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut out = BTreeMap::new();
        let mut add = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                let source = source_label(self.source_attribution.get(key));
                out.insert(key.to_string(), (value, source));
            }
        };

        add("project.root", Some(self.project_root().to_string()));
        add("project.requirements", Some(self.requirements_path().to_string()));
        add("project.changelog", Some(self.changelog_path().to_string()));
        add("project.fixes_dir", Some(self.fixes_dir().to_string()));
        add("project.exclude", Some(self.exclude_patterns().join(", ")));

        for kind in ArtifactKind::ALL {
            add(
                &format!("artifacts.{kind}"),
                Some(self.artifacts.file_name(kind).to_string()),
            );
        }

        add("llm.provider", Some(self.provider().to_string()));
        add("llm.fallback_provider", self.llm.fallback_provider.clone());
        add("llm.model", self.llm.model.clone());
        add("llm.timeout_secs", Some(self.llm_timeout().as_secs().to_string()));
        add("llm.budget", self.llm.budget.map(|b| b.to_string()));
        add(
            "llm.anthropic",
            self.llm.anthropic.as_ref().map(|a| {
                format!(
                    "api_key_env={}",
                    a.api_key_env.as_deref().unwrap_or("ANTHROPIC_API_KEY")
                )
            }),
        );
        add(
            "llm.openrouter",
            self.llm.openrouter.as_ref().map(|o| {
                format!(
                    "api_key_env={}",
                    o.api_key_env.as_deref().unwrap_or("OPENROUTER_API_KEY")
                )
            }),
        );

        add("logging.verbose", Some(self.verbose().to_string()));
        add("logging.file", self.log_file().map(|p| p.to_string()));

        out
    }
}
