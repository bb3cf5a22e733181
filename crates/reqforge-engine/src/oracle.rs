//! Seam to the external generation capability

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::debug;

use reqforge_config::Config;
use reqforge_llm::{LlmBackend, LlmError, LlmFallbackInfo, LlmInvocation, Message};
use reqforge_utils::error::OracleError;

/// Text-in, text-out generation.
///
/// A successful call always returns non-blank text.
#[async_trait]
pub trait GenerationOracle: Send + Sync {
    /// # Errors
    ///
    /// `OracleError::Backend` when the provider call fails,
    /// `OracleError::EmptyResponse` when it returns only whitespace.
    async fn generate(&self, prompt: &str) -> Result<String, OracleError>;

    /// Calls made so far, failed ones included.
    fn call_count(&self) -> u32;
}

/// [`GenerationOracle`] backed by an LLM provider.
pub struct LlmOracle {
    backend: Box<dyn LlmBackend>,
    timeout: Duration,
    system_prompt: Option<String>,
    calls: AtomicU32,
}

impl LlmOracle {
    #[must_use]
    pub fn new(backend: Box<dyn LlmBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            system_prompt: None,
            calls: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configured backend (with fallback) and wrap it.
    ///
    /// # Errors
    ///
    /// Returns the `LlmError` from backend construction.
    pub fn from_config(config: &Config) -> Result<(Self, Option<LlmFallbackInfo>), LlmError> {
        let (backend, fallback) = reqforge_llm::from_config_with_fallback(config)?;
        let mut oracle = Self::new(backend, config.llm_timeout());
        if let Some(prompt) = config.llm.system_prompt.as_deref() {
            oracle = oracle.with_system_prompt(prompt);
        }
        Ok((oracle, fallback))
    }
}

#[async_trait]
impl GenerationOracle for LlmOracle {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(prompt));

        // Empty model: the backend's configured default.
        let invocation = LlmInvocation::new("generate", "", self.timeout, messages);
        let result = self.backend.invoke(invocation).await?;

        debug!(
            call,
            provider = %result.provider,
            model = %result.model_used,
            response_len = result.raw_response.len(),
            "Oracle call completed"
        );

        if result.raw_response.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(result.raw_response)
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Oracle for runs that must not reach a provider (dry runs, `check`).
///
/// Every call fails with `LlmError::Unsupported`.
#[derive(Debug, Default)]
pub struct OfflineOracle {
    calls: AtomicU32,
}

#[async_trait]
impl GenerationOracle for OfflineOracle {
    async fn generate(&self, _prompt: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::Unsupported("oracle calls are disabled for this run".to_string()).into())
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqforge_llm::{LlmResult, Role};
    use std::sync::{Arc, Mutex};

    struct RecordingBackend {
        reply: String,
        seen: Arc<Mutex<Vec<LlmInvocation>>>,
    }

    #[async_trait]
    impl LlmBackend for RecordingBackend {
        async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            self.seen.lock().unwrap().push(inv);
            Ok(LlmResult::new(self.reply.clone(), "mock", "mock-model"))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl LlmBackend for FailingBackend {
        async fn invoke(&self, _inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            Err(LlmError::ProviderOutage("503".to_string()))
        }
    }

    fn recording(reply: &str) -> (LlmOracle, Arc<Mutex<Vec<LlmInvocation>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let backend = RecordingBackend {
            reply: reply.to_string(),
            seen: Arc::clone(&seen),
        };
        (LlmOracle::new(Box::new(backend), Duration::from_secs(30)), seen)
    }

    #[tokio::test]
    async fn test_generate_sends_system_and_user_messages() {
        let (oracle, seen) = recording("YES");
        let oracle = oracle.with_system_prompt("Be terse.");

        assert_eq!(oracle.generate("Is it done?").await.unwrap(), "YES");

        let seen = seen.lock().unwrap();
        let messages = &seen[0].messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "Is it done?");
        assert_eq!(seen[0].timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_blank_reply_is_empty_response() {
        let (oracle, _) = recording("  \n ");
        assert!(matches!(
            oracle.generate("prompt").await,
            Err(OracleError::EmptyResponse)
        ));
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_counted() {
        let oracle = LlmOracle::new(Box::new(FailingBackend), Duration::from_secs(1));
        assert!(matches!(
            oracle.generate("prompt").await,
            Err(OracleError::Backend(LlmError::ProviderOutage(_)))
        ));
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_offline_oracle_always_fails() {
        let oracle = OfflineOracle::default();
        assert!(matches!(
            oracle.generate("anything").await,
            Err(OracleError::Backend(LlmError::Unsupported(_)))
        ));
        assert_eq!(oracle.call_count(), 1);
    }
}
