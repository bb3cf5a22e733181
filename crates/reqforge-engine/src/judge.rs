//! Satisfaction judgment

use std::sync::Arc;
use tracing::{debug, warn};

use crate::oracle::GenerationOracle;
use crate::prompts::judge_prompt;
use crate::requirements::Requirement;

/// Asks the oracle whether a requirement is already present in the code.
///
/// The judgment is heuristic: only the oracle's yes/no answer is used, with
/// no attempt to verify it against the corpus.
pub struct ImplementationOracle {
    oracle: Arc<dyn GenerationOracle>,
}

impl ImplementationOracle {
    #[must_use]
    pub fn new(oracle: Arc<dyn GenerationOracle>) -> Self {
        Self { oracle }
    }

    /// `true` only when the oracle answers YES.
    ///
    /// A blank corpus is never satisfied and costs no oracle call. Oracle
    /// failures are logged and read as `false`.
    pub async fn is_satisfied(&self, requirement: &Requirement, corpus: &str) -> bool {
        if corpus.trim().is_empty() {
            debug!("Corpus is empty; requirement cannot be satisfied yet");
            return false;
        }

        match self.oracle.generate(&judge_prompt(requirement, corpus)).await {
            Ok(answer) => {
                let verdict = parse_verdict(&answer);
                debug!(answer = %answer.trim(), verdict, "Satisfaction verdict");
                verdict
            }
            Err(e) => {
                warn!(error = %e, "Satisfaction check failed; treating requirement as unsatisfied");
                false
            }
        }
    }
}

/// Exact, case-insensitive `YES`, ignoring surrounding whitespace.
#[must_use]
pub fn parse_verdict(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}
