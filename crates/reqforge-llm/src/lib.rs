//! LLM backend abstraction for reqforge
//!
//! HTTP providers (Anthropic, OpenRouter) behind one [`LlmBackend`] trait.
//! Every backend built by the factory is wrapped in a [`BudgetedBackend`].

mod anthropic;
mod budgeted;
mod http_client;
mod openrouter;
mod types;

pub use budgeted::{BUDGET_ENV_VAR, BudgetedBackend, DEFAULT_BUDGET_LIMIT};
pub use http_client::{HttpParams, redact_error_message};
pub use reqforge_utils::error::LlmError;
pub use types::{LlmBackend, LlmFallbackInfo, LlmInvocation, LlmResult, Message, Role};

use reqforge_config::Config;
use tracing::{info, warn};

use anthropic::AnthropicBackend;
use openrouter::OpenRouterBackend;

/// Build the budgeted backend for a named provider.
fn construct_backend_for_provider(
    provider: &str,
    config: &Config,
) -> Result<Box<dyn LlmBackend>, LlmError> {
    let inner: Box<dyn LlmBackend> = match provider {
        "anthropic" => Box::new(AnthropicBackend::new_from_config(config)?),
        "openrouter" => Box::new(OpenRouterBackend::new_from_config(config)?),
        other => {
            return Err(LlmError::Unsupported(format!(
                "LLM provider '{other}' is not supported. Supported providers: {}",
                reqforge_config::SUPPORTED_PROVIDERS.join(", ")
            )));
        }
    };
    Ok(Box::new(BudgetedBackend::with_limit_from_config(
        inner,
        config.llm.budget,
    )))
}

/// Construct the configured backend, falling back if the primary cannot be built.
///
/// Fallback only covers construction failures (missing API key, missing
/// model). Runtime failures such as timeouts or outages never switch provider.
///
/// # Errors
///
/// Returns the primary provider's error when it fails and no fallback is
/// configured, or when the fallback fails too.
pub fn from_config_with_fallback(
    config: &Config,
) -> Result<(Box<dyn LlmBackend>, Option<LlmFallbackInfo>), LlmError> {
    let provider = config.provider();

    let primary_error = match construct_backend_for_provider(provider, config) {
        Ok(backend) => return Ok((backend, None)),
        Err(e) => e,
    };

    let Some(fallback_provider) = config.llm.fallback_provider.as_deref() else {
        return Err(primary_error);
    };

    let reason = redact_error_message(&primary_error.to_string());
    warn!(
        primary = provider,
        fallback = fallback_provider,
        reason = %reason,
        "Primary provider failed during construction, trying fallback"
    );

    match construct_backend_for_provider(fallback_provider, config) {
        Ok(backend) => {
            info!(provider = fallback_provider, "Using fallback provider");
            Ok((
                backend,
                Some(LlmFallbackInfo {
                    primary_provider: provider.to_string(),
                    fallback_provider: fallback_provider.to_string(),
                    reason,
                }),
            ))
        }
        Err(fallback_error) => {
            warn!(
                provider = fallback_provider,
                error = %redact_error_message(&fallback_error.to_string()),
                "Fallback provider also failed"
            );
            Err(primary_error)
        }
    }
}

/// Construct the configured backend, discarding fallback information.
///
/// # Errors
///
/// See [`from_config_with_fallback`].
pub fn from_config(config: &Config) -> Result<Box<dyn LlmBackend>, LlmError> {
    from_config_with_fallback(config).map(|(backend, _)| backend)
}
