//! Call-limiting wrapper for LLM backends
//!
//! Every provider is wrapped so that a single reqforge process can never
//! issue more than a bounded number of oracle calls.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

use reqforge_utils::error::LlmError;

use crate::types::{LlmBackend, LlmInvocation, LlmResult};

/// Calls allowed per process when neither env nor config sets a limit
pub const DEFAULT_BUDGET_LIMIT: u32 = 200;

/// Environment variable overriding the budget limit
pub const BUDGET_ENV_VAR: &str = "REQFORGE_LLM_BUDGET";

/// A wrapper around an `LlmBackend` that enforces a limit on invocations.
///
/// The budget tracks attempted calls, not successful requests. A failed call
/// still consumes its slot, so retry loops cannot bypass the limit.
pub struct BudgetedBackend {
    inner: Box<dyn LlmBackend>,
    calls: AtomicU32,
    limit: u32,
}

impl BudgetedBackend {
    #[must_use]
    pub fn new(inner: Box<dyn LlmBackend>, limit: u32) -> Self {
        debug!(limit, "Creating BudgetedBackend");
        Self {
            inner,
            calls: AtomicU32::new(0),
            limit,
        }
    }

    /// Resolve the limit and wrap `inner`.
    ///
    /// Precedence (highest to lowest):
    /// 1. `REQFORGE_LLM_BUDGET`
    /// 2. `[llm] budget`
    /// 3. [`DEFAULT_BUDGET_LIMIT`]
    ///
    /// An env value that does not parse as `u32` is ignored with a warning.
    #[must_use]
    pub fn with_limit_from_config(inner: Box<dyn LlmBackend>, config_budget: Option<u32>) -> Self {
        let env_limit = match std::env::var(BUDGET_ENV_VAR) {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(limit) => Some(limit),
                Err(_) => {
                    warn!(value = %raw, "Ignoring unparseable {BUDGET_ENV_VAR}");
                    None
                }
            },
            Err(_) => None,
        };

        let limit = if let Some(limit) = env_limit {
            debug!(limit, "Using budget limit from {BUDGET_ENV_VAR}");
            limit
        } else if let Some(limit) = config_budget {
            debug!(limit, "Using budget limit from config file");
            limit
        } else {
            DEFAULT_BUDGET_LIMIT
        };

        Self::new(inner, limit)
    }

    /// Calls attempted so far, including rejected ones.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[async_trait]
impl LlmBackend for BudgetedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        // Counted before the inner call so failures still consume a slot.
        let current = self.calls.fetch_add(1, Ordering::SeqCst);

        if current >= self.limit {
            let attempted = current + 1;
            warn!(limit = self.limit, attempted, "Budget limit exceeded");
            return Err(LlmError::BudgetExceeded {
                limit: self.limit,
                attempted,
            });
        }

        debug!(
            call_count = current + 1,
            limit = self.limit,
            purpose = %inv.purpose,
            "Budget check passed"
        );

        let result = self.inner.invoke(inv).await;
        if let Err(e) = &result {
            debug!(
                call_count = current + 1,
                error = %e,
                "Inner backend failed (budget slot still consumed)"
            );
        }
        result
    }
}
