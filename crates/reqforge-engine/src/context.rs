use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;

use reqforge_config::Config;
use reqforge_utils::types::ArtifactKind;

use crate::oracle::GenerationOracle;

/// File names of the three tracked artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    markup: String,
    style: String,
    behavior: String,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            markup: ArtifactKind::Markup.default_file_name().to_string(),
            style: ArtifactKind::Style.default_file_name().to_string(),
            behavior: ArtifactKind::Behavior.default_file_name().to_string(),
        }
    }
}

impl ArtifactLayout {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            markup: config.artifacts.file_name(ArtifactKind::Markup).to_string(),
            style: config.artifacts.file_name(ArtifactKind::Style).to_string(),
            behavior: config.artifacts.file_name(ArtifactKind::Behavior).to_string(),
        }
    }

    #[must_use]
    pub fn file_name(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Markup => &self.markup,
            ArtifactKind::Style => &self.style,
            ArtifactKind::Behavior => &self.behavior,
        }
    }
}

/// Everything a run needs, built once at startup and handed to each
/// component at construction.
#[derive(Clone)]
pub struct RunContext {
    pub project_root: Utf8PathBuf,
    pub layout: ArtifactLayout,
    pub requirements_path: Utf8PathBuf,
    pub changelog_path: Utf8PathBuf,
    pub fixes_dir: Utf8PathBuf,
    /// Sweep exclusion globs, relative to the project root
    pub exclude: Vec<String>,
    pub oracle: Arc<dyn GenerationOracle>,
}

impl RunContext {
    #[must_use]
    pub fn from_config(config: &Config, oracle: Arc<dyn GenerationOracle>) -> Self {
        Self {
            project_root: config.project_root(),
            layout: ArtifactLayout::from_config(config),
            requirements_path: config.requirements_path(),
            changelog_path: config.changelog_path(),
            fixes_dir: config.fixes_dir(),
            exclude: config.exclude_patterns(),
            oracle,
        }
    }

    /// Context for `root` with default file names and exclusions.
    #[must_use]
    pub fn for_root(root: &Utf8Path, oracle: Arc<dyn GenerationOracle>) -> Self {
        Self {
            project_root: root.to_path_buf(),
            layout: ArtifactLayout::default(),
            requirements_path: root.join(reqforge_config::DEFAULT_REQUIREMENTS_FILE),
            changelog_path: root.join(reqforge_config::DEFAULT_CHANGELOG_FILE),
            fixes_dir: root.join(reqforge_config::DEFAULT_FIXES_DIR),
            exclude: reqforge_config::DEFAULT_EXCLUDES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            oracle,
        }
    }

    /// Path of the tracked artifact for `kind`.
    #[must_use]
    pub fn artifact_path(&self, kind: ArtifactKind) -> Utf8PathBuf {
        self.project_root.join(self.layout.file_name(kind))
    }
}
