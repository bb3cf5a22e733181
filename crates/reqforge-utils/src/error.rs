use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::types::Diagnostic;

/// Library-level error type with user-friendly reporting.
///
/// `ReqforgeError` is what startup and command-level operations return. The
/// reconciliation loop itself never surfaces one for a single requirement or
/// artifact: those failures are logged and isolated, and only configuration
/// or backend construction problems reach the CLI.
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration/CLI argument errors |
/// | 70 | Generation backend could not be constructed or failed |
/// | 1 | Other errors |
#[derive(Error, Debug)]
pub enum ReqforgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Repair error: {0}")]
    Repair(#[from] RepairError),

    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fix record write failed at {path}: {reason}")]
    AuditWriteFailed { path: String, reason: String },
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Generation,
    FileSystem,
    ResourceLimits,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Generation => write!(f, "Generation"),
            Self::FileSystem => write!(f, "File System"),
            Self::ResourceLimits => write!(f, "Resource Limits"),
            Self::Validation => write!(f, "Validation"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration validation failed: {error_count} errors")]
    ValidationFailed {
        errors: Vec<String>,
        error_count: usize,
    },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::MissingRequired(key) => {
                format!("Required configuration '{key}' is missing")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => {
                format!("Configuration file not found: {path}")
            }
            Self::ValidationFailed { errors, .. } => {
                format!(
                    "Configuration validation failed with {} errors: {}",
                    errors.len(),
                    errors.join(", ")
                )
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => {
                Some("Configuration files use TOML with [project], [artifacts], [llm] and [logging] sections.".to_string())
            }
            Self::NotFound { .. } => Some(
                "reqforge searches upward from the working directory for .reqforge/config.toml."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of .reqforge/config.toml".to_string(),
                "Run 'reqforge config' to see the effective configuration".to_string(),
            ],
            Self::MissingRequired(key) => vec![format!("Add '{key}' to your configuration file")],
            Self::InvalidValue { key, .. } => {
                vec![format!("Correct the value of '{key}' in the configuration file or CLI flag")]
            }
            Self::NotFound { .. } => vec![
                "Check the path passed to --config".to_string(),
                "Omit --config to use discovery and built-in defaults".to_string(),
            ],
            Self::ValidationFailed { .. } => {
                vec!["Fix the listed configuration problems and re-run".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Errors that can occur during LLM backend operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, undecodable provider payload)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Budget limit exceeded
    #[error("Budget exceeded: attempted {attempted} calls, limit is {limit}")]
    BudgetExceeded { limit: u32, attempted: u32 },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("LLM transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("LLM provider authentication failed: {msg}"),
            Self::ProviderQuota(msg) => format!("LLM provider quota exceeded: {msg}"),
            Self::ProviderOutage(msg) => format!("LLM provider service outage: {msg}"),
            Self::Timeout { duration } => {
                format!("LLM invocation timed out after {duration:?}")
            }
            Self::BudgetExceeded { limit, attempted } => {
                format!("LLM budget exceeded: attempted {attempted} calls, limit is {limit}")
            }
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
            Self::Unsupported(msg) => format!("LLM feature not supported: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Transport(_) => Some(
                "Transport errors occur when the LLM provider cannot be reached or returns an unreadable payload."
                    .to_string(),
            ),
            Self::ProviderAuth(_) => Some(
                "Authentication errors indicate missing or invalid API keys.".to_string(),
            ),
            Self::ProviderQuota(_) => Some(
                "Quota errors occur when rate limits or usage limits are exceeded.".to_string(),
            ),
            Self::ProviderOutage(_) => {
                Some("Provider outages are temporary service disruptions.".to_string())
            }
            Self::Timeout { .. } => Some(
                "Timeouts occur when an oracle call takes longer than [llm] timeout_secs."
                    .to_string(),
            ),
            Self::BudgetExceeded { .. } => {
                Some("The per-run call budget caps how many oracle calls a single run may make.".to_string())
            }
            Self::Misconfiguration(_) => Some(
                "Configuration errors indicate missing or invalid LLM provider settings."
                    .to_string(),
            ),
            Self::Unsupported(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) => vec![
                "Verify network connectivity to the provider".to_string(),
                "Run with --verbose to see detailed error information".to_string(),
            ],
            Self::ProviderAuth(_) => vec![
                "Check that the API key environment variable is set".to_string(),
                "Verify the API key is valid and not expired".to_string(),
            ],
            Self::ProviderQuota(_) | Self::ProviderOutage(_) => vec![
                "Wait a few minutes and try again".to_string(),
                "Configure [llm] fallback_provider".to_string(),
            ],
            Self::Timeout { .. } => vec!["Increase [llm] timeout_secs".to_string()],
            Self::BudgetExceeded { .. } => vec![
                "Increase [llm] budget or set REQFORGE_LLM_BUDGET".to_string(),
                "Split the requirements document into smaller runs".to_string(),
            ],
            Self::Misconfiguration(_) => vec![
                "Check the [llm] section in .reqforge/config.toml".to_string(),
            ],
            Self::Unsupported(_) => vec![
                "Use one of the supported providers: anthropic, openrouter".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) | Self::Unsupported(_) => {
                ErrorCategory::Configuration
            }
            Self::ProviderQuota(_) | Self::BudgetExceeded { .. } => ErrorCategory::ResourceLimits,
            Self::Transport(_) | Self::ProviderOutage(_) | Self::Timeout { .. } => {
                ErrorCategory::Generation
            }
        }
    }
}

/// Failure of a single generation-oracle call.
///
/// A successful call always carries non-blank text; a blank reply is
/// reported as `EmptyResponse` rather than `Ok("")`.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("generation backend failed: {0}")]
    Backend(#[from] LlmError),

    #[error("generation oracle returned an empty response")]
    EmptyResponse,
}

/// Failure to obtain a usable implementation proposal for a requirement.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("malformed implementation proposal: {reason}")]
    Malformed { reason: String, raw: String },
}

/// Failure of a single repair attempt.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("corrected source still fails validation: {0}")]
    StillInvalid(Diagnostic),
}

/// Artifact, changelog and requirements I/O failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {reason}")]
    Write { path: String, reason: String },
}

impl UserFriendlyError for ReqforgeError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Llm(err) => err.user_message(),
            Self::Oracle(OracleError::Backend(err)) => err.user_message(),
            Self::Oracle(OracleError::EmptyResponse) => {
                "The generation oracle returned an empty response".to_string()
            }
            Self::Synthesis(err) => format!("Could not synthesize an implementation: {err}"),
            Self::Repair(err) => format!("Could not repair artifact: {err}"),
            Self::Store(err) => format!("Artifact file operation failed: {err}"),
            Self::Io(err) => format!("File system operation failed: {err}"),
            Self::AuditWriteFailed { path, reason } => {
                format!("Could not write fix record '{path}': {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Llm(err) | Self::Oracle(OracleError::Backend(err)) => err.context(),
            Self::Store(_) | Self::Io(_) | Self::AuditWriteFailed { .. } => Some(
                "Artifacts, backups and fix records are written atomically in the project directory."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Llm(err) | Self::Oracle(OracleError::Backend(err)) => err.suggestions(),
            Self::Store(_) | Self::Io(_) | Self::AuditWriteFailed { .. } => vec![
                "Check file permissions in the project directory".to_string(),
                "Ensure sufficient disk space is available".to_string(),
            ],
            _ => vec!["Re-run with --verbose and inspect the run log".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Llm(err) | Self::Oracle(OracleError::Backend(err)) => err.category(),
            Self::Oracle(_) | Self::Synthesis(_) => ErrorCategory::Generation,
            Self::Repair(_) => ErrorCategory::Validation,
            Self::Store(_) | Self::Io(_) | Self::AuditWriteFailed { .. } => {
                ErrorCategory::FileSystem
            }
        }
    }
}

impl ReqforgeError {
    /// Render the error with context and suggestions for terminal output.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut out = format!("✗ {}", self.user_message());
        if let Some(context) = self.context() {
            out.push_str(&format!("\n\n  {context}"));
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for suggestion in suggestions {
                out.push_str(&format!("\n  • {suggestion}"));
            }
        }
        out
    }

    /// Map the error to the CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        crate::exit_codes::error_to_exit_code(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArtifactKind;

    #[test]
    fn test_llm_error_categories() {
        assert_eq!(
            LlmError::ProviderAuth("401".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            LlmError::BudgetExceeded {
                limit: 1,
                attempted: 2
            }
            .category(),
            ErrorCategory::ResourceLimits
        );
        assert_eq!(
            LlmError::Timeout {
                duration: Duration::from_secs(5)
            }
            .category(),
            ErrorCategory::Generation
        );
    }

    #[test]
    fn test_repair_error_mentions_diagnostic() {
        let err = RepairError::StillInvalid(Diagnostic::at(
            ArtifactKind::Style,
            "unterminated block",
            2,
            1,
        ));
        assert!(err.to_string().contains("unterminated block"));
    }

    #[test]
    fn test_display_for_user_lists_suggestions() {
        let err = ReqforgeError::Config(ConfigError::MissingRequired("llm.model".into()));
        let rendered = err.display_for_user();
        assert!(rendered.starts_with("✗ Required configuration 'llm.model' is missing"));
        assert!(rendered.contains("Suggestions:"));
    }

    #[test]
    fn test_oracle_error_from_llm_error() {
        let err: OracleError = LlmError::Transport("connection reset".into()).into();
        assert!(matches!(err, OracleError::Backend(LlmError::Transport(_))));
    }
}
