//! Implementation synthesis and proposal decoding

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};

use reqforge_utils::error::SynthesisError;
use reqforge_utils::types::ArtifactKind;

use crate::fence::{outer_braces, strip_code_fences};
use crate::oracle::GenerationOracle;
use crate::prompts::synthesis_prompt;
use crate::requirements::Requirement;

/// Code fragments proposed for one requirement.
///
/// `html`, `css` and `js` are accepted as field aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImplementationProposal {
    #[serde(default, alias = "html")]
    pub markup: Option<String>,
    #[serde(default, alias = "css")]
    pub style: Option<String>,
    #[serde(default, alias = "js")]
    pub behavior: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl ImplementationProposal {
    /// Non-blank fragment for `kind`.
    #[must_use]
    pub fn fragment(&self, kind: ArtifactKind) -> Option<&str> {
        let fragment = match kind {
            ArtifactKind::Markup => self.markup.as_deref(),
            ArtifactKind::Style => self.style.as_deref(),
            ArtifactKind::Behavior => self.behavior.as_deref(),
        };
        fragment.filter(|f| !f.trim().is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        ArtifactKind::ALL.iter().all(|kind| self.fragment(*kind).is_none())
    }
}

/// Decode the oracle's structured reply.
///
/// A surrounding fenced block is stripped first. When the remainder is not
/// a JSON object, the outermost `{ ... }` slice is tried before giving up.
///
/// # Errors
///
/// `SynthesisError::Malformed` carrying the raw reply.
pub fn decode_proposal(raw: &str) -> Result<ImplementationProposal, SynthesisError> {
    let body = strip_code_fences(raw);

    let first = match serde_json::from_str::<ImplementationProposal>(body) {
        Ok(proposal) => return Ok(proposal),
        Err(e) => e,
    };

    if let Some(object) = outer_braces(body)
        && object != body
        && let Ok(proposal) = serde_json::from_str::<ImplementationProposal>(object)
    {
        return Ok(proposal);
    }

    Err(SynthesisError::Malformed {
        reason: first.to_string(),
        raw: raw.to_string(),
    })
}

/// Turns an unsatisfied requirement into an [`ImplementationProposal`].
pub struct Synthesizer {
    oracle: Arc<dyn GenerationOracle>,
}

impl Synthesizer {
    #[must_use]
    pub fn new(oracle: Arc<dyn GenerationOracle>) -> Self {
        Self { oracle }
    }

    /// One generation call followed by [`decode_proposal`].
    ///
    /// # Errors
    ///
    /// `SynthesisError::Oracle` when the call fails or returns nothing,
    /// `SynthesisError::Malformed` when the reply cannot be decoded.
    pub async fn synthesize(
        &self,
        requirement: &Requirement,
    ) -> Result<ImplementationProposal, SynthesisError> {
        let raw = self.oracle.generate(&synthesis_prompt(requirement)).await?;

        match decode_proposal(&raw) {
            Ok(proposal) => {
                debug!(
                    markup = proposal.fragment(ArtifactKind::Markup).is_some(),
                    style = proposal.fragment(ArtifactKind::Style).is_some(),
                    behavior = proposal.fragment(ArtifactKind::Behavior).is_some(),
                    "Decoded implementation proposal"
                );
                Ok(proposal)
            }
            Err(e) => {
                error!(error = %e, raw = %raw, "Malformed implementation proposal");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedOracle};
    use reqforge_utils::error::OracleError;

    #[test]
    fn test_decode_fenced_proposal() {
        let raw = "```json\n{\"markup\": \"<button id=\\\"t\\\"></button>\", \"style\": \".dark{}\", \"behavior\": \"toggle();\", \"description\": \"Toggle\"}\n```";
        let proposal = decode_proposal(raw).unwrap();
        assert_eq!(proposal.fragment(ArtifactKind::Markup), Some("<button id=\"t\"></button>"));
        assert_eq!(proposal.fragment(ArtifactKind::Behavior), Some("toggle();"));
        assert_eq!(proposal.description, "Toggle");
    }

    #[test]
    fn test_absent_null_and_blank_fragments_are_none() {
        let proposal =
            decode_proposal(r#"{"markup": null, "style": "  ", "behavior": "x();"}"#).unwrap();
        assert_eq!(proposal.fragment(ArtifactKind::Markup), None);
        assert_eq!(proposal.fragment(ArtifactKind::Style), None);
        assert_eq!(proposal.fragment(ArtifactKind::Behavior), Some("x();"));
        assert_eq!(proposal.description, "");
    }

    #[test]
    fn test_short_field_names_accepted() {
        let proposal = decode_proposal(r#"{"html": "<p></p>", "css": "p{}", "js": "", "description": "d"}"#)
            .unwrap();
        assert_eq!(proposal.fragment(ArtifactKind::Markup), Some("<p></p>"));
        assert_eq!(proposal.fragment(ArtifactKind::Style), Some("p{}"));
        assert!(proposal.fragment(ArtifactKind::Behavior).is_none());
    }

    #[test]
    fn test_surrounding_prose_is_tolerated() {
        let proposal =
            decode_proposal("Here you go:\n{\"style\": \"a{}\", \"description\": \"d\"}\nEnjoy!").unwrap();
        assert_eq!(proposal.fragment(ArtifactKind::Style), Some("a{}"));
    }

    #[test]
    fn test_undecodable_reply_is_malformed_with_raw() {
        let err = decode_proposal("I cannot help with that.").unwrap_err();
        match err {
            SynthesisError::Malformed { raw, .. } => assert_eq!(raw, "I cannot help with that."),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_field_type_is_malformed() {
        assert!(matches!(
            decode_proposal(r#"{"markup": 42}"#),
            Err(SynthesisError::Malformed { .. })
        ));
        assert!(matches!(
            decode_proposal(r#"["markup"]"#),
            Err(SynthesisError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_synthesize_maps_empty_reply_to_oracle_error() {
        let oracle = Arc::new(ScriptedOracle::from_replies(vec![Reply::Empty]));
        let synth = Synthesizer::new(oracle);
        assert!(matches!(
            synth.synthesize(&Requirement::new("x")).await,
            Err(SynthesisError::Oracle(OracleError::EmptyResponse))
        ));
    }

    #[tokio::test]
    async fn test_synthesize_sends_one_prompt() {
        let oracle = Arc::new(ScriptedOracle::from_replies(vec![Reply::text(
            r#"{"markup": "<p>hi</p>", "description": "Greeting"}"#,
        )]));
        let synth = Synthesizer::new(oracle.clone());

        let proposal = synth.synthesize(&Requirement::new("Say hi")).await.unwrap();
        assert_eq!(proposal.description, "Greeting");
        assert_eq!(oracle.call_count(), 1);
        assert!(oracle.prompts()[0].contains("Say hi"));
    }
}
