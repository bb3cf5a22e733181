//! Requirements document parsing
//!
//! A requirement is a header line plus the list-item or indented lines that
//! follow it. Blank lines only separate; they never end a requirement.

use camino::Utf8Path;
use std::fmt;
use std::fs;
use std::io::ErrorKind;

use reqforge_utils::atomic_write::normalize_line_endings;
use reqforge_utils::error::StoreError;

/// One requirement, identified by its exact trimmed text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requirement {
    text: String,
}

impl Requirement {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// First line of the requirement.
    #[must_use]
    pub fn header(&self) -> &str {
        self.text.lines().next().unwrap_or("")
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// `-`, `*`, `+`, `1.` or `1)` followed by whitespace or end of line.
fn is_list_item(trimmed: &str) -> bool {
    let marker_len = match trimmed.chars().next() {
        Some('-' | '*' | '+') => 1,
        Some(c) if c.is_ascii_digit() => {
            let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
            match trimmed[digits..].chars().next() {
                Some('.' | ')') => digits + 1,
                _ => return false,
            }
        }
        _ => return false,
    };
    trimmed[marker_len..]
        .chars()
        .next()
        .is_none_or(char::is_whitespace)
}

/// Split a requirements document into requirements, in source order.
#[must_use]
pub fn parse_requirements(source: &str) -> Vec<Requirement> {
    let mut requirements = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let indented = line.starts_with(char::is_whitespace);
        let continuation = indented || is_list_item(trimmed);
        if !continuation && !current.is_empty() {
            requirements.push(Requirement::new(current.join("\n")));
            current.clear();
        }
        current.push(trimmed);
    }

    if !current.is_empty() {
        requirements.push(Requirement::new(current.join("\n")));
    }
    requirements
}

/// Read and parse the requirements document.
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns `StoreError::Read` for any other read failure.
pub fn load_requirements(path: &Utf8Path) -> Result<Option<Vec<Requirement>>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(parse_requirements(&normalize_line_endings(&content)))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Read {
            path: path.to_string(),
            source,
        }),
    }
}
