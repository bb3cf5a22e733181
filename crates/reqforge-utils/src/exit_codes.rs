//! Exit code constants and error mapping for reqforge.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `INVALID_ARTIFACTS` | `check` found at least one invalid artifact |
//! | 70 | `ORACLE_FAILURE` | Generation backend could not be used |

use crate::error::ReqforgeError;

/// Process exit code.
///
/// The numeric values are part of the CLI contract.
///
/// ```rust
/// use reqforge_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(3), ExitCode::INVALID_ARTIFACTS);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments or configuration error
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// A validation-only sweep found invalid artifacts
    pub const INVALID_ARTIFACTS: ExitCode = ExitCode(3);

    /// The generation backend could not be constructed or used
    pub const ORACLE_FAILURE: ExitCode = ExitCode(70);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

/// Map a library error to the exit code reported by the CLI.
pub fn error_to_exit_code(error: &ReqforgeError) -> ExitCode {
    match error {
        ReqforgeError::Config(_) => ExitCode::CLI_ARGS,
        ReqforgeError::Llm(_) | ReqforgeError::Oracle(_) => ExitCode::ORACLE_FAILURE,
        _ => ExitCode::INTERNAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, LlmError, OracleError, StoreError};

    #[test]
    fn test_config_error_maps_to_cli_args() {
        let err = ReqforgeError::Config(ConfigError::InvalidFile("bad".into()));
        assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);
    }

    #[test]
    fn test_backend_construction_failure_maps_to_oracle_failure() {
        let err = ReqforgeError::Llm(LlmError::Misconfiguration("no key".into()));
        assert_eq!(err.to_exit_code(), ExitCode::ORACLE_FAILURE);
    }

    #[test]
    fn test_llm_transport_maps_to_oracle_failure() {
        let err = ReqforgeError::Oracle(OracleError::Backend(LlmError::Transport(
            "reset".into(),
        )));
        assert_eq!(err.to_exit_code(), ExitCode::ORACLE_FAILURE);
    }

    #[test]
    fn test_store_error_maps_to_internal() {
        let err = ReqforgeError::Store(StoreError::Write {
            path: "index.html".into(),
            reason: "read-only".into(),
        });
        assert_eq!(err.to_exit_code(), ExitCode::INTERNAL);
    }
}
