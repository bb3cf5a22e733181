use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The three kinds of persisted web artifacts reqforge reconciles.
///
/// Every kind is backed by exactly one tracked file in the project root
/// (see the `[artifacts]` configuration section) and is validated with its
/// own syntax checker.
///
/// # Example
///
/// ```rust
/// use reqforge_utils::types::ArtifactKind;
///
/// assert_eq!(ArtifactKind::Style.as_str(), "style");
/// assert_eq!(ArtifactKind::from_extension("HTML"), Some(ArtifactKind::Markup));
/// assert_eq!(ArtifactKind::from_extension("rs"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Document structure (HTML).
    Markup,
    /// Presentation rules (CSS).
    Style,
    /// Client-side script (JavaScript).
    Behavior,
}

impl ArtifactKind {
    /// All kinds in their canonical processing order.
    pub const ALL: [ArtifactKind; 3] = [Self::Markup, Self::Style, Self::Behavior];

    /// Canonical lowercase name, also the field name in implementation proposals.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Markup => "markup",
            Self::Style => "style",
            Self::Behavior => "behavior",
        }
    }

    /// Name of the source language, used in prompts.
    #[must_use]
    pub const fn language(&self) -> &'static str {
        match self {
            Self::Markup => "HTML",
            Self::Style => "CSS",
            Self::Behavior => "JavaScript",
        }
    }

    /// File extensions (lowercase, without the dot) that belong to this kind.
    #[must_use]
    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Markup => &["html", "htm"],
            Self::Style => &["css"],
            Self::Behavior => &["js", "mjs", "cjs"],
        }
    }

    /// Default file name of the tracked artifact for this kind.
    #[must_use]
    pub const fn default_file_name(&self) -> &'static str {
        match self {
            Self::Markup => "index.html",
            Self::Style => "styles.css",
            Self::Behavior => "script.js",
        }
    }

    /// Map a file extension (case-insensitive, no leading dot) to a kind.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.extensions().contains(&ext.as_str()))
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markup" | "html" => Ok(Self::Markup),
            "style" | "css" => Ok(Self::Style),
            "behavior" | "behaviour" | "js" | "javascript" => Ok(Self::Behavior),
            other => Err(format!(
                "unknown artifact kind '{other}' (expected markup, style or behavior)"
            )),
        }
    }
}

/// A syntax checker's description of a structural defect in one artifact.
///
/// Positions are 1-based. They are optional because some defects (for
/// example an element left open at end of input) are best reported without
/// a precise location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: ArtifactKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: ArtifactKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    #[must_use]
    pub fn at(kind: ArtifactKind, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                write!(f, "{} error at {line}:{column}: {}", self.kind, self.message)
            }
            (Some(line), None) => write!(f, "{} error at line {line}: {}", self.kind, self.message),
            _ => write!(f, "{} error: {}", self.kind, self.message),
        }
    }
}

/// Where an effective configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Command-line flag
    Cli,
    /// Environment variable
    Environment,
    /// Discovered or explicit `config.toml`
    ConfigFile(PathBuf),
    /// Set through `ConfigBuilder`
    Programmatic,
    /// Built-in default
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Environment => write!(f, "env"),
            Self::ConfigFile(path) => write!(f, "config ({})", path.display()),
            Self::Programmatic => write!(f, "programmatic"),
            Self::Defaults => write!(f, "default"),
        }
    }
}
