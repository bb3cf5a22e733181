use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing::debug;

use reqforge_utils::atomic_write::{is_already_exists, write_new_file_atomic};
use reqforge_utils::error::ReqforgeError;

use crate::model::FixRecord;

/// Name collisions tolerated before giving up on a record
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Append-only directory of fix records.
///
/// Each record is its own JSON file named
/// `<kind>-<YYYYMMDD_HHMMSS_ffffff>-<n>.json`. Existing files are never
/// overwritten; a taken name bumps `n`.
pub struct FixLog {
    dir: Utf8PathBuf,
}

impl FixLog {
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Emit record JSON using JCS canonicalization (RFC 8785).
    fn emit_jcs(record: &FixRecord) -> Result<String> {
        let value =
            serde_json::to_value(record).context("Failed to serialize fix record to JSON value")?;
        let bytes = serde_json_canonicalizer::to_vec(&value)
            .context("Failed to canonicalize fix record JSON")?;
        String::from_utf8(bytes).context("Failed to convert canonical JSON to UTF-8 string")
    }

    /// Write `record` to a fresh file and return its path.
    ///
    /// # Errors
    ///
    /// Returns `ReqforgeError::AuditWriteFailed` (wrapped in `anyhow`) when
    /// the record cannot be serialized or written.
    pub fn append(&self, record: &FixRecord) -> Result<Utf8PathBuf> {
        let json = Self::emit_jcs(record)?;
        let stamp = record.recorded_at.format("%Y%m%d_%H%M%S_%6f");

        for n in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(format!("{}-{stamp}-{n}.json", record.kind));
            match write_new_file_atomic(&path, &json) {
                Ok(_) => {
                    debug!(path = %path, outcome = ?record.outcome, "Fix record written");
                    return Ok(path);
                }
                Err(e) if is_already_exists(&e) => continue,
                Err(e) => {
                    return Err(ReqforgeError::AuditWriteFailed {
                        path: path.to_string(),
                        reason: format!("{e:#}"),
                    }
                    .into());
                }
            }
        }

        Err(ReqforgeError::AuditWriteFailed {
            path: self.dir.join(format!("{}-{stamp}-*.json", record.kind)).to_string(),
            reason: format!("no free file name after {MAX_NAME_ATTEMPTS} attempts"),
        }
        .into())
    }

    /// All records in the directory, oldest first.
    ///
    /// A missing directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Fails if the directory or a record cannot be read or parsed.
    pub fn list(&self) -> Result<Vec<FixRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read fix record directory: {}", self.dir))?
        {
            let entry = entry?;
            if let Some(filename) = entry.file_name().to_str()
                && filename.ends_with(".json")
            {
                let content = fs::read_to_string(entry.path())
                    .with_context(|| format!("Failed to read fix record: {filename}"))?;
                let record: FixRecord = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse fix record: {filename}"))?;
                records.push(record);
            }
        }

        records.sort_by(|a, b| {
            a.recorded_at
                .cmp(&b.recorded_at)
                .then_with(|| a.artifact_path.cmp(&b.artifact_path))
        });
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FixOutcome;
    use chrono::{TimeZone, Utc};
    use reqforge_utils::types::{ArtifactKind, Diagnostic};
    use tempfile::TempDir;

    fn log_in(temp: &TempDir) -> FixLog {
        FixLog::new(Utf8PathBuf::from_path_buf(temp.path().join("fixes")).unwrap())
    }

    fn record() -> FixRecord {
        FixRecord::fixed(
            "styles.css",
            Diagnostic::at(ArtifactKind::Style, "unexpected '}'", 3, 1),
            ".a { }}",
            ".a { }",
        )
    }

    #[test]
    fn test_append_creates_directory_and_names_by_kind() {
        let temp = TempDir::new().unwrap();
        let log = log_in(&temp);

        let path = log.append(&record()).unwrap();

        let name = path.file_name().unwrap();
        assert!(name.starts_with("style-"));
        assert!(name.ends_with("-0.json"));
        assert!(path.exists());
    }

    #[test]
    fn test_same_timestamp_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let log = log_in(&temp);
        let first = record();
        let mut second = record();
        second.recorded_at = first.recorded_at;
        second.outcome = FixOutcome::Failed;

        let a = log.append(&first).unwrap();
        let b = log.append(&second).unwrap();

        assert_ne!(a, b);
        assert!(b.as_str().ends_with("-1.json"));
        assert_eq!(log.list().unwrap().len(), 2);
    }

    #[test]
    fn test_records_are_canonical_json() {
        let temp = TempDir::new().unwrap();
        let log = log_in(&temp);

        let path = log.append(&record()).unwrap();
        let content = fs::read_to_string(&path).unwrap();

        // JCS: sorted keys, no insignificant whitespace.
        assert!(content.starts_with(r#"{"artifact_path":"styles.css","corrected":"#));
        assert!(!content.contains(": "));
    }

    #[test]
    fn test_list_is_sorted_by_time() {
        let temp = TempDir::new().unwrap();
        let log = log_in(&temp);
        let mut late = record();
        late.recorded_at = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let mut early = record();
        early.recorded_at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        log.append(&late).unwrap();
        log.append(&early).unwrap();

        let listed = log.list().unwrap();
        assert_eq!(listed[0].recorded_at, early.recorded_at);
        assert_eq!(listed[1], late);
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(log_in(&temp).list().unwrap().is_empty());
    }
}
