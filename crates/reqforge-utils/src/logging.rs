//! Tracing setup and the structured spans used by the reconciliation run.
//!
//! The binary calls [`init_tracing`] once. Library code only emits events;
//! it never installs a subscriber.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::sync::Mutex;
use tracing::{Level, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::types::ArtifactKind;

/// Colors only when stderr is a terminal and NO_COLOR is unset.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Default filter directive when `RUST_LOG` is not set.
#[must_use]
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "reqforge=debug,info"
    } else {
        "reqforge=info,warn"
    }
}

/// Install the global tracing subscriber.
///
/// Events go to stderr in compact form. When `log_file` is given, the same
/// events are appended to it without ANSI colors; the parent directory is
/// created if needed. `RUST_LOG` overrides the default filter.
///
/// Fails if a global subscriber is already installed or the log file cannot
/// be opened.
pub fn init_tracing(verbose: bool, log_file: Option<&Utf8Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_color())
        .with_target(verbose)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_span_events(if verbose { FmtSpan::CLOSE } else { FmtSpan::NONE })
        .compact();

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory: {parent}"))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {path}"))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .compact(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Span wrapping all work done for one requirement.
///
/// `index` is 1-based in source order; `requirement` is the first line of
/// the requirement text, trimmed to keep log lines short.
pub fn requirement_span(index: usize, requirement: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "requirement",
        index = index,
        requirement = %headline(requirement),
    )
}

/// Span wrapping one validate-and-repair cycle.
pub fn artifact_span(kind: ArtifactKind, path: &Utf8Path) -> tracing::Span {
    span!(Level::INFO, "artifact", kind = %kind, path = %path)
}

/// First line of `text`, cut at 80 characters.
#[must_use]
pub fn headline(text: &str) -> String {
    const MAX: usize = 80;
    let first = text.lines().next().unwrap_or("").trim();
    if first.chars().count() <= MAX {
        first.to_string()
    } else {
        let cut: String = first.chars().take(MAX).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_depends_on_verbosity() {
        assert_eq!(default_filter(true), "reqforge=debug,info");
        assert_eq!(default_filter(false), "reqforge=info,warn");
    }

    #[test]
    fn test_headline_takes_first_line() {
        assert_eq!(headline("  Add a button\n- it is blue"), "Add a button");
        assert_eq!(headline(""), "");
    }

    #[test]
    fn test_headline_truncates_long_lines() {
        let long = "x".repeat(200);
        let h = headline(&long);
        assert_eq!(h.chars().count(), 81);
        assert!(h.ends_with('…'));
    }

    #[test]
    fn test_spans_can_be_created_without_subscriber() {
        let span = requirement_span(1, "Add a dark mode toggle");
        let _guard = span.enter();
        let span = artifact_span(ArtifactKind::Markup, Utf8Path::new("index.html"));
        let _guard = span.enter();
    }
}
