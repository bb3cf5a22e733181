use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use tracing::warn;

use reqforge_utils::types::ArtifactKind;

/// A file picked up by the sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedArtifact {
    pub path: Utf8PathBuf,
    pub kind: ArtifactKind,
}

/// Finds every markup, style and behavior file under a project root
#[derive(Debug, Clone)]
pub struct ArtifactSelector {
    root: Utf8PathBuf,
    exclude: GlobSet,
    /// Prefixes of `<dir>/**` patterns; matching directories are not entered.
    exclude_dirs: GlobSet,
}

impl ArtifactSelector {
    /// Exclusion patterns are matched against paths relative to `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob pattern is invalid.
    pub fn new(root: &Utf8Path, exclude: &[String]) -> Result<Self> {
        let mut files = GlobSetBuilder::new();
        let mut dirs = GlobSetBuilder::new();
        for pattern in exclude {
            files.add(Glob::new(pattern).with_context(|| format!("Invalid exclude glob: {pattern}"))?);
            if let Some(prefix) = pattern.strip_suffix("/**")
                && !prefix.is_empty()
            {
                dirs.add(Glob::new(prefix).with_context(|| format!("Invalid exclude glob: {pattern}"))?);
            }
        }
        Ok(Self {
            root: root.to_path_buf(),
            exclude: files.build()?,
            exclude_dirs: dirs.build()?,
        })
    }

    #[must_use]
    pub fn is_excluded(&self, path: &Utf8Path) -> bool {
        self.exclude.is_match(self.relative(path).as_str())
    }

    fn is_excluded_dir(&self, dir: &Utf8Path) -> bool {
        self.exclude_dirs.is_match(self.relative(dir).as_str())
    }

    fn relative<'a>(&self, path: &'a Utf8Path) -> &'a Utf8Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    /// All matching files, sorted by path.
    ///
    /// Unreadable directories and entries, and non-UTF-8 names, are logged
    /// and skipped; the rest of the tree is still selected.
    #[must_use]
    pub fn select(&self) -> Vec<SelectedArtifact> {
        let mut selected = Vec::new();
        if self.root.is_dir() {
            self.walk_directory(&self.root, &mut selected);
        }
        selected.sort_by(|a, b| a.path.cmp(&b.path));
        selected
    }

    fn walk_directory(&self, dir: &Utf8Path, selected: &mut Vec<SelectedArtifact>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir, error = %e, "Skipping unreadable directory");
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %dir, error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let path = match Utf8PathBuf::try_from(entry.path()) {
                Ok(path) => path,
                Err(e) => {
                    warn!(path = %e.as_path().display(), "Skipping non-UTF-8 path");
                    continue;
                }
            };
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!(path = %path, error = %e, "Skipping entry with unknown file type");
                    continue;
                }
            };

            // Symlinked directories are not followed.
            if file_type.is_dir() {
                if !self.is_excluded_dir(&path) {
                    self.walk_directory(&path, selected);
                }
            } else if file_type.is_file()
                && !self.is_excluded(&path)
                && let Some(kind) = path.extension().and_then(ArtifactKind::from_extension)
            {
                selected.push(SelectedArtifact { path, kind });
            }
        }
    }
}
