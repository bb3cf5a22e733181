//! Prompt builders for the three oracle interactions

use reqforge_utils::types::{ArtifactKind, Diagnostic};

use crate::requirements::Requirement;

/// Satisfaction judgment over the current artifact corpus.
#[must_use]
pub fn judge_prompt(requirement: &Requirement, corpus: &str) -> String {
    format!(
        "Decide whether the following requirement is already implemented by the code below.\n\n\
         Requirement:\n{requirement}\n\n\
         Code:\n{corpus}\n\n\
         Answer with exactly YES or NO."
    )
}

/// Implementation request for an unsatisfied requirement.
#[must_use]
pub fn synthesis_prompt(requirement: &Requirement) -> String {
    format!(
        "Implement the following requirement for a small static web project \
         made of one HTML file, one CSS file and one JavaScript file.\n\n\
         Requirement:\n{requirement}\n\n\
         Respond with a single JSON object and nothing else, using these string fields:\n\
         {{\n  \
           \"markup\": \"HTML to add, or an empty string\",\n  \
           \"style\": \"CSS to add, or an empty string\",\n  \
           \"behavior\": \"JavaScript to add, or an empty string\",\n  \
           \"description\": \"one-paragraph description of the feature\"\n\
         }}\n\
         Each fragment is appended to the existing file, so return only new code."
    )
}

/// Single correction request for an artifact that failed validation.
#[must_use]
pub fn repair_prompt(kind: ArtifactKind, content: &str, diagnostic: &Diagnostic) -> String {
    let language = kind.language();
    format!(
        "The following {language} source fails a syntax check.\n\n\
         Error: {diagnostic}\n\n\
         Source:\n{content}\n\n\
         Return the complete corrected {language} source only, with no explanation."
    )
}
