//! Persistent artifacts and the feature changelog
//!
//! Artifact content only ever grows by appended fragments. Merging a
//! fragment whose trimmed text already occurs in the artifact is a no-op,
//! so re-running a requirement never duplicates code.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::ErrorKind;
use tracing::{debug, info};

use reqforge_utils::atomic_write::{normalize_line_endings, write_file_atomic};
use reqforge_utils::error::StoreError;
use reqforge_utils::types::ArtifactKind;

use crate::context::{ArtifactLayout, RunContext};

/// Header written at the top of a new changelog
pub const CHANGELOG_HEADER: &str = "# Implemented Features\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The artifact did not exist and was created with the fragment
    Created,
    /// The fragment was appended to existing content
    Appended,
    /// The fragment (trimmed) was already present; nothing was written
    AlreadyPresent,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: Utf8PathBuf,
    layout: ArtifactLayout,
    changelog: Utf8PathBuf,
}

/// Whether merging `fragment` into `current` would change nothing.
fn already_contains(current: &str, fragment: &str) -> bool {
    current.contains(fragment.trim())
}

/// Changelog block for one implemented requirement.
#[must_use]
pub fn changelog_entry(requirement: &str, description: &str) -> String {
    format!("### {requirement}\n{description}\n\n")
}

impl ArtifactStore {
    #[must_use]
    pub fn new(ctx: &RunContext) -> Self {
        Self {
            root: ctx.project_root.clone(),
            layout: ctx.layout.clone(),
            changelog: ctx.changelog_path.clone(),
        }
    }

    #[must_use]
    pub fn path(&self, kind: ArtifactKind) -> Utf8PathBuf {
        self.root.join(self.layout.file_name(kind))
    }

    #[must_use]
    pub fn changelog_path(&self) -> &Utf8Path {
        &self.changelog
    }

    /// Current content of the tracked artifact, `""` when absent.
    ///
    /// # Errors
    ///
    /// `StoreError::Read` for failures other than a missing file.
    pub fn read(&self, kind: ArtifactKind) -> Result<String, StoreError> {
        self.read_path(&self.path(kind))
    }

    /// Content of any file, `""` when absent, with line endings normalized.
    ///
    /// # Errors
    ///
    /// `StoreError::Read` for failures other than a missing file.
    pub fn read_path(&self, path: &Utf8Path) -> Result<String, StoreError> {
        Ok(read_existing(path)?.unwrap_or_default())
    }

    /// Merge a fragment into the tracked artifact for `kind`.
    ///
    /// A missing artifact is created as `"\n" + fragment`, the same result
    /// as appending to empty content. The containment guard is applied
    /// before either write.
    ///
    /// # Errors
    ///
    /// `StoreError` when the artifact cannot be read or written.
    pub fn merge(&self, kind: ArtifactKind, fragment: &str) -> Result<MergeOutcome, StoreError> {
        let path = self.path(kind);

        let outcome = match read_existing(&path)? {
            None => {
                if already_contains("", fragment) {
                    MergeOutcome::AlreadyPresent
                } else {
                    write(&path, &format!("\n{fragment}"))?;
                    MergeOutcome::Created
                }
            }
            Some(current) => {
                if already_contains(&current, fragment) {
                    MergeOutcome::AlreadyPresent
                } else {
                    write(&path, &format!("{current}\n{fragment}"))?;
                    MergeOutcome::Appended
                }
            }
        };

        info!(kind = %kind, path = %path, outcome = ?outcome, "Merged fragment");
        Ok(outcome)
    }

    /// Concatenation of all tracked artifacts, each prefixed by `\n`.
    ///
    /// # Errors
    ///
    /// `StoreError::Read` when an existing artifact cannot be read.
    pub fn corpus(&self) -> Result<String, StoreError> {
        let mut corpus = String::new();
        for kind in ArtifactKind::ALL {
            corpus.push('\n');
            corpus.push_str(&self.read(kind)?);
        }
        Ok(corpus)
    }

    /// Record an implemented requirement in the changelog.
    ///
    /// Returns `false` when the exact entry is already present.
    ///
    /// # Errors
    ///
    /// `StoreError` when the changelog cannot be read or written.
    pub fn append_changelog(&self, requirement: &str, description: &str) -> Result<bool, StoreError> {
        let entry = changelog_entry(requirement, description);

        let content = match read_existing(&self.changelog)? {
            None => format!("{CHANGELOG_HEADER}{entry}"),
            Some(current) if current.contains(&entry) => {
                debug!(path = %self.changelog, "Changelog entry already present");
                return Ok(false);
            }
            Some(current) => format!("{current}{entry}"),
        };

        write(&self.changelog, &content)?;
        Ok(true)
    }

    /// Save `original` to `<path>.bak`, then overwrite `path` with `corrected`.
    ///
    /// The live file is not touched if the backup cannot be written.
    ///
    /// # Errors
    ///
    /// `StoreError::Write` for either write.
    pub fn backup_and_replace(
        &self,
        path: &Utf8Path,
        original: &str,
        corrected: &str,
    ) -> Result<Utf8PathBuf, StoreError> {
        let backup = backup_path(path);
        write(&backup, original)?;
        write(path, corrected)?;
        info!(path = %path, backup = %backup, "Replaced artifact with repaired content");
        Ok(backup)
    }
}

/// Sibling backup path: `<file>.bak`.
#[must_use]
pub fn backup_path(path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{path}.bak"))
}

fn read_existing(path: &Utf8Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(normalize_line_endings(&content))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Read {
            path: path.to_string(),
            source,
        }),
    }
}

fn write(path: &Utf8Path, content: &str) -> Result<(), StoreError> {
    write_file_atomic(path, content)
        .map(|_| ())
        .map_err(|e| StoreError::Write {
            path: path.to_string(),
            reason: format!("{e:#}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedOracle;
    use proptest::prelude::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> ArtifactStore {
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        ArtifactStore::new(&RunContext::for_root(&root, Arc::new(ScriptedOracle::new())))
    }

    #[test]
    fn test_merge_creates_then_appends() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        assert_eq!(
            store.merge(ArtifactKind::Style, ".a { color: red; }").unwrap(),
            MergeOutcome::Created
        );
        assert_eq!(store.read(ArtifactKind::Style).unwrap(), "\n.a { color: red; }");

        assert_eq!(
            store.merge(ArtifactKind::Style, ".b { margin: 0; }").unwrap(),
            MergeOutcome::Appended
        );
        assert_eq!(
            store.read(ArtifactKind::Style).unwrap(),
            "\n.a { color: red; }\n.b { margin: 0; }"
        );
    }

    #[test]
    fn test_merge_skips_present_fragment() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store.merge(ArtifactKind::Behavior, "init();").unwrap();
        assert_eq!(
            store.merge(ArtifactKind::Behavior, "  init();\n").unwrap(),
            MergeOutcome::AlreadyPresent
        );
        assert_eq!(store.read(ArtifactKind::Behavior).unwrap(), "\ninit();");
    }

    #[test]
    fn test_blank_fragment_never_creates_file() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        assert_eq!(
            store.merge(ArtifactKind::Markup, "  \n").unwrap(),
            MergeOutcome::AlreadyPresent
        );
        assert!(!store.path(ArtifactKind::Markup).exists());
    }

    #[test]
    fn test_corpus_prefixes_each_artifact() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert_eq!(store.corpus().unwrap(), "\n\n\n");

        store.merge(ArtifactKind::Style, "b{}").unwrap();
        assert_eq!(store.corpus().unwrap(), "\n\n\nb{}\n");
    }

    #[test]
    fn test_changelog_created_with_header_and_deduplicated() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        assert!(store.append_changelog("Add a clock", "Shows the time").unwrap());
        assert!(!store.append_changelog("Add a clock", "Shows the time").unwrap());
        assert!(store.append_changelog("Add a timer", "Counts down").unwrap());

        let content = fs::read_to_string(store.changelog_path()).unwrap();
        assert_eq!(
            content,
            "# Implemented Features\n\n### Add a clock\nShows the time\n\n### Add a timer\nCounts down\n\n"
        );
    }

    #[test]
    fn test_backup_written_before_replace() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let path = store.path(ArtifactKind::Behavior);
        fs::write(&path, "f( {").unwrap();

        let backup = store.backup_and_replace(&path, "f( {", "f() {}").unwrap();

        assert_eq!(backup.file_name(), Some("script.js.bak"));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "f( {");
        assert_eq!(fs::read_to_string(&path).unwrap(), "f() {}");
    }

    #[test]
    fn test_read_normalizes_crlf() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::write(store.path(ArtifactKind::Markup), "<p>a</p>\r\n<p>b</p>").unwrap();

        assert_eq!(store.read(ArtifactKind::Markup).unwrap(), "<p>a</p>\n<p>b</p>");
        assert_eq!(
            store.merge(ArtifactKind::Markup, "<p>a</p>\n<p>b</p>").unwrap(),
            MergeOutcome::AlreadyPresent
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_merge_is_idempotent(fragments in prop::collection::vec("[a-z{}();. \n]{0,24}", 1..6)) {
            let temp = TempDir::new().unwrap();
            let store = store_in(&temp);

            for fragment in &fragments {
                store.merge(ArtifactKind::Behavior, fragment).unwrap();
            }
            let once = store.read(ArtifactKind::Behavior).unwrap();

            for fragment in &fragments {
                prop_assert_eq!(
                    store.merge(ArtifactKind::Behavior, fragment).unwrap(),
                    MergeOutcome::AlreadyPresent
                );
            }
            prop_assert_eq!(store.read(ArtifactKind::Behavior).unwrap(), once.clone());

            for fragment in &fragments {
                prop_assert!(once.contains(fragment.trim()));
            }
        }

        #[test]
        fn prop_any_slice_of_merged_content_is_already_present(
            fragments in prop::collection::vec("[a-z{}();. \n]{1,24}", 1..6),
            start in any::<prop::sample::Index>(),
            len in any::<prop::sample::Index>(),
        ) {
            let temp = TempDir::new().unwrap();
            let store = store_in(&temp);

            for fragment in &fragments {
                store.merge(ArtifactKind::Style, fragment).unwrap();
            }
            let merged = store.read(ArtifactKind::Style).unwrap();

            // ASCII only, so any byte range is a valid slice; it may span
            // several appended blocks and their separators.
            let i = start.index(merged.len() + 1);
            let j = i + len.index(merged.len() - i + 1);
            let slice = &merged[i..j];

            prop_assert_eq!(
                store.merge(ArtifactKind::Style, slice).unwrap(),
                MergeOutcome::AlreadyPresent
            );
            prop_assert_eq!(store.read(ArtifactKind::Style).unwrap(), merged);
        }
    }
}
