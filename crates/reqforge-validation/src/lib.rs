//! Structural syntax validation for generated web artifacts
//!
//! Each artifact kind has its own checker. Markup goes through the HTML5
//! parser and fails on any parse error. Style and behavior checks are
//! structural: they catch unbalanced brackets and unterminated strings or
//! comments without attempting full language validation.
//!
//! Checking is pure: no I/O, and the same input always yields the same
//! result.

mod behavior;
mod cursor;
mod markup;
mod style;

use reqforge_utils::types::{ArtifactKind, Diagnostic};

/// Per-kind syntax checker
pub struct SyntaxValidator;

impl SyntaxValidator {
    /// Check `content` as an artifact of `kind`.
    ///
    /// Returns the first structural defect found, or `None` when the
    /// content is valid. Empty content is always valid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use reqforge_utils::types::ArtifactKind;
    /// use reqforge_validation::SyntaxValidator;
    ///
    /// assert!(SyntaxValidator::check(ArtifactKind::Style, ".a { color: red; }").is_none());
    ///
    /// let diag = SyntaxValidator::check(ArtifactKind::Behavior, "if (x) {").unwrap();
    /// assert_eq!(diag.line, Some(1));
    /// ```
    #[must_use]
    pub fn check(kind: ArtifactKind, content: &str) -> Option<Diagnostic> {
        match kind {
            ArtifactKind::Markup => markup::check(content),
            ArtifactKind::Style => style::check(content),
            ArtifactKind::Behavior => behavior::check(content),
        }
    }

    #[must_use]
    pub fn is_valid(kind: ArtifactKind, content: &str) -> bool {
        Self::check(kind, content).is_none()
    }
}
