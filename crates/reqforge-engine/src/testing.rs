//! In-memory oracle for tests
//!
//! Available in this crate's unit tests and, through the `test-utils`
//! feature, to integration tests of dependent crates.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use reqforge_llm::LlmError;
use reqforge_utils::error::OracleError;

use crate::oracle::GenerationOracle;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Whitespace-only reply, surfaced as `OracleError::EmptyResponse`
    Empty,
    /// Provider failure with the given message
    Fail(String),
}

impl Reply {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

type Responder = Box<dyn Fn(&str) -> Result<String, OracleError> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<Reply>>),
    Responder(Responder),
}

/// [`GenerationOracle`] that answers from a script and records every prompt.
pub struct ScriptedOracle {
    script: Script,
    prompts: Mutex<Vec<String>>,
    calls: AtomicU32,
}

impl ScriptedOracle {
    /// An oracle that fails every call.
    #[must_use]
    pub fn new() -> Self {
        Self::from_replies(Vec::new())
    }

    /// Replies are consumed in order; once exhausted every call fails.
    #[must_use]
    pub fn from_replies(replies: Vec<Reply>) -> Self {
        Self {
            script: Script::Queue(Mutex::new(replies.into())),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Answer each prompt with `responder`.
    ///
    /// Whitespace-only text is still reported as `EmptyResponse`.
    #[must_use]
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, OracleError> + Send + Sync + 'static,
    {
        Self {
            script: Script::Responder(Box::new(responder)),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Every prompt received, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_reply(&self, prompt: &str) -> Result<String, OracleError> {
        match &self.script {
            Script::Responder(responder) => responder(prompt),
            Script::Queue(queue) => {
                let reply = queue.lock().ok().and_then(|mut q| q.pop_front());
                match reply {
                    Some(Reply::Text(text)) => Ok(text),
                    Some(Reply::Empty) => Ok(String::new()),
                    Some(Reply::Fail(message)) => {
                        Err(OracleError::Backend(LlmError::Transport(message)))
                    }
                    None => Err(OracleError::Backend(LlmError::Transport(
                        "script exhausted".to_string(),
                    ))),
                }
            }
        }
    }
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationOracle for ScriptedOracle {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let text = self.next_reply(prompt)?;
        if text.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(text)
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_consumed_in_order() {
        let oracle = ScriptedOracle::from_replies(vec![
            Reply::text("first"),
            Reply::Empty,
            Reply::Fail("boom".to_string()),
        ]);

        assert_eq!(oracle.generate("a").await.unwrap(), "first");
        assert!(matches!(oracle.generate("b").await, Err(OracleError::EmptyResponse)));
        assert!(matches!(oracle.generate("c").await, Err(OracleError::Backend(_))));
        assert!(oracle.generate("d").await.is_err());

        assert_eq!(oracle.call_count(), 4);
        assert_eq!(oracle.prompts(), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_responder_sees_prompt() {
        let oracle = ScriptedOracle::with_responder(|prompt| Ok(prompt.to_uppercase()));
        assert_eq!(oracle.generate("yes").await.unwrap(), "YES");
    }
}
