//! HTML structure checker
//!
//! Content is run through the HTML5 parser (`scraper`, backed by html5ever)
//! and the first recorded parse error becomes the diagnostic. Files that open
//! with a doctype are parsed as documents; anything else is parsed as a body
//! fragment, which is what appended snippets are.
//!
//! The parser does not track source positions, so markup diagnostics carry
//! no line or column.

use reqforge_utils::types::{ArtifactKind, Diagnostic};
use scraper::Html;

pub(crate) fn check(content: &str) -> Option<Diagnostic> {
    if content.trim().is_empty() {
        return None;
    }

    let html = if is_document(content) {
        Html::parse_document(content)
    } else {
        Html::parse_fragment(content)
    };

    let first = html.errors.first()?;
    let message = match html.errors.len() {
        1 => first.to_string(),
        n => format!("{first} (and {} more parse errors)", n - 1),
    };
    Some(Diagnostic::new(ArtifactKind::Markup, message))
}

fn is_document(content: &str) -> bool {
    content
        .trim_start()
        .get(..9)
        .is_some_and(|head| head.eq_ignore_ascii_case("<!doctype"))
}
