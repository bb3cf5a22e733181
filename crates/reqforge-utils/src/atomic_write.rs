//! Atomic file writes for artifacts, backups, the changelog and fix records.
//!
//! Every write lands in a temporary file in the target's directory, is
//! fsynced, then renamed over the target. A reader never observes a
//! half-written artifact. When the rename crosses filesystems the content is
//! re-staged next to the target and renamed again.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

#[cfg(target_os = "windows")]
use std::{thread, time::Duration};

/// Result of an atomic write operation
#[derive(Debug, Clone, Default)]
pub struct AtomicWriteResult {
    /// Number of rename retries that occurred (Windows only)
    pub rename_retry_count: u32,
    /// Whether the cross-filesystem fallback was used
    pub used_cross_filesystem_fallback: bool,
    /// Bytes written after line-ending normalization
    pub bytes_written: usize,
    pub warnings: Vec<String>,
}

/// How the final rename treats an existing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Replace,
    CreateNew,
}

/// Atomically write `content` to `path`, replacing any existing file.
///
/// Line endings are normalized to LF and missing parent directories are
/// created.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<AtomicWriteResult> {
    write_with_placement(path, content, Placement::Replace)
}

/// Atomically create `path` with `content`, failing if it already exists.
///
/// The returned error wraps an [`std::io::Error`] of kind
/// [`std::io::ErrorKind::AlreadyExists`] when the target is taken, so callers
/// can pick another name and retry.
pub fn write_new_file_atomic(path: &Utf8Path, content: &str) -> Result<AtomicWriteResult> {
    write_with_placement(path, content, Placement::CreateNew)
}

/// Whether an error from [`write_new_file_atomic`] means the name was taken.
#[must_use]
pub fn is_already_exists(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::AlreadyExists)
    })
}

fn write_with_placement(
    path: &Utf8Path,
    content: &str,
    placement: Placement,
) -> Result<AtomicWriteResult> {
    let mut result = AtomicWriteResult::default();
    let normalized = normalize_line_endings(content);

    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("Failed to create parent directory: {dir}"))?;

    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in: {dir}"))?;
    staged
        .write_all(normalized.as_bytes())
        .context("Failed to write content to temporary file")?;
    staged
        .as_file()
        .sync_all()
        .context("Failed to fsync temporary file")?;
    result.bytes_written = normalized.len();

    let staged_path = staged.path().to_path_buf();

    match atomic_rename(staged, path.as_std_path(), placement) {
        Ok(retry_count) => {
            result.rename_retry_count = retry_count;
            if retry_count > 0 {
                result.warnings.push(format!(
                    "Rename required {retry_count} retries due to transient filesystem locks"
                ));
            }
        }
        Err(e) if is_cross_filesystem_error(&e) => {
            result.used_cross_filesystem_fallback = true;
            result
                .warnings
                .push("Used cross-filesystem fallback (copy, fsync, rename)".to_string());
            restage_and_rename(&staged_path, path, placement)?;
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to atomically write file: {path}"));
        }
    }

    Ok(result)
}

/// Normalize CRLF and lone CR line endings to LF.
#[must_use]
pub fn normalize_line_endings(content: &str) -> String {
    if !content.contains('\r') {
        return content.to_string();
    }
    content.replace("\r\n", "\n").replace('\r', "\n")
}

fn persist(staged: NamedTempFile, target: &Path, placement: Placement) -> Result<(), tempfile::PersistError> {
    match placement {
        Placement::Replace => staged.persist(target).map(|_| ()),
        Placement::CreateNew => staged.persist_noclobber(target).map(|_| ()),
    }
}

/// Rename with bounded exponential backoff; Windows virus scanners and
/// indexers briefly hold freshly written files.
#[cfg(target_os = "windows")]
fn atomic_rename(mut staged: NamedTempFile, target: &Path, placement: Placement) -> Result<u32> {
    use std::io::ErrorKind;

    const MAX_RETRIES: u32 = 5;
    const INITIAL_DELAY_MS: u64 = 10;
    const MAX_TOTAL_DELAY_MS: u64 = 250;

    let mut retry_count = 0;
    let mut total_delay_ms = 0;

    loop {
        match persist(staged, target, placement) {
            Ok(()) => return Ok(retry_count),
            Err(err) => {
                let retryable = matches!(err.error.kind(), ErrorKind::PermissionDenied);
                let delay_ms = INITIAL_DELAY_MS * 2_u64.pow(retry_count);
                if !retryable
                    || retry_count >= MAX_RETRIES
                    || total_delay_ms + delay_ms > MAX_TOTAL_DELAY_MS
                {
                    return Err(anyhow::Error::new(err.error));
                }
                thread::sleep(Duration::from_millis(delay_ms));
                total_delay_ms += delay_ms;
                retry_count += 1;
                staged = err.file;
            }
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn atomic_rename(staged: NamedTempFile, target: &Path, placement: Placement) -> Result<u32> {
    persist(staged, target, placement)
        .map(|()| 0)
        .map_err(|e| anyhow::Error::new(e.error))
}

#[cfg(unix)]
fn is_cross_filesystem_error(err: &anyhow::Error) -> bool {
    // EXDEV on Linux and macOS
    err.downcast_ref::<std::io::Error>()
        .and_then(std::io::Error::raw_os_error)
        == Some(18)
}

#[cfg(not(unix))]
fn is_cross_filesystem_error(_err: &anyhow::Error) -> bool {
    false
}

fn restage_and_rename(staged_path: &Path, target: &Utf8Path, placement: Placement) -> Result<()> {
    let bytes = fs::read(staged_path).context("Failed to read staged file for cross-filesystem copy")?;

    let target_dir = match target.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let mut restaged = NamedTempFile::new_in(target_dir)
        .with_context(|| format!("Failed to create temp file in target directory: {target_dir}"))?;
    restaged
        .write_all(&bytes)
        .context("Failed to write content during cross-filesystem copy")?;
    restaged
        .as_file()
        .sync_all()
        .context("Failed to fsync during cross-filesystem copy")?;
    persist(restaged, target.as_std_path(), placement)
        .map_err(|e| anyhow::Error::new(e.error))
        .context("Failed to persist during cross-filesystem copy")?;

    let _ = fs::remove_file(staged_path);
    Ok(())
}
