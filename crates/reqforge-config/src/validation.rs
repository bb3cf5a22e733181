use globset::Glob;
use std::collections::HashMap;

use reqforge_utils::error::ConfigError;
use reqforge_utils::types::ArtifactKind;

use super::{Config, SUPPORTED_PROVIDERS};

/// Upper bound for `[llm] timeout_secs` (one hour)
const MAX_TIMEOUT_SECS: u64 = 3600;

impl Config {
    /// Validate configuration values.
    ///
    /// A single problem is reported as `InvalidValue`; several are collected
    /// into `ValidationFailed` so the user can fix them in one pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<(String, String)> = Vec::new();

        let provider = self.provider();
        if !SUPPORTED_PROVIDERS.contains(&provider) {
            errors.push((
                "llm.provider".to_string(),
                format!(
                    "unknown provider '{provider}' (supported: {})",
                    SUPPORTED_PROVIDERS.join(", ")
                ),
            ));
        }
        if let Some(fallback) = self.llm.fallback_provider.as_deref() {
            if !SUPPORTED_PROVIDERS.contains(&fallback) {
                errors.push((
                    "llm.fallback_provider".to_string(),
                    format!("unknown provider '{fallback}'"),
                ));
            } else if fallback == provider {
                errors.push((
                    "llm.fallback_provider".to_string(),
                    "must differ from llm.provider".to_string(),
                ));
            }
        }

        if let Some(timeout) = self.llm.timeout_secs {
            if timeout == 0 {
                errors.push(("llm.timeout_secs".to_string(), "must be greater than 0".to_string()));
            } else if timeout > MAX_TIMEOUT_SECS {
                errors.push((
                    "llm.timeout_secs".to_string(),
                    format!("exceeds maximum limit of {MAX_TIMEOUT_SECS} seconds"),
                ));
            }
        }

        if self.llm.budget == Some(0) {
            errors.push(("llm.budget".to_string(), "must be greater than 0".to_string()));
        }

        for pattern in self.exclude_patterns() {
            if let Err(e) = Glob::new(&pattern) {
                errors.push((
                    "project.exclude".to_string(),
                    format!("invalid glob '{pattern}': {e}"),
                ));
            }
        }

        let mut seen: HashMap<String, ArtifactKind> = HashMap::new();
        for kind in ArtifactKind::ALL {
            let name = self.artifacts.file_name(kind).trim();
            if name.is_empty() {
                errors.push((format!("artifacts.{kind}"), "must not be empty".to_string()));
                continue;
            }
            if let Some(other) = seen.insert(name.to_string(), kind) {
                errors.push((
                    format!("artifacts.{kind}"),
                    format!("'{name}' is already used for {other}"),
                ));
            }
        }

        for (key, value) in [
            ("project.requirements", self.project.requirements.as_deref()),
            ("project.changelog", self.project.changelog.as_deref()),
            ("project.fixes_dir", self.project.fixes_dir.as_deref()),
        ] {
            if value.is_some_and(|v| v.trim().is_empty()) {
                errors.push((key.to_string(), "must not be empty".to_string()));
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => {
                let (key, value) = errors.remove(0);
                Err(ConfigError::InvalidValue { key, value })
            }
            n => Err(ConfigError::ValidationFailed {
                errors: errors
                    .into_iter()
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect(),
                error_count: n,
            }),
        }
    }
}
