//! Fenced-block unwrapping for oracle replies

/// Strip a surrounding fenced code block (```` ```json ````, ```` ```css ````,
/// bare ```` ``` ````) and trim the result. Unfenced text is only trimmed.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (`json`, `css`, ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// The outermost `{ ... }` slice of `text`, if any.
pub(crate) fn outer_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
