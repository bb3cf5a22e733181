//! Shared helpers for integration tests

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// A throwaway project directory.
pub(crate) struct Project {
    _temp: TempDir,
    pub(crate) root: Utf8PathBuf,
}

impl Project {
    pub(crate) fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        Self { _temp: temp, root }
    }

    pub(crate) fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        self
    }

    pub(crate) fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root.join(rel)).unwrap()
    }

    pub(crate) fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).exists()
    }

    pub(crate) fn path(&self, rel: &str) -> Utf8PathBuf {
        self.root.join(rel)
    }

    pub(crate) fn root(&self) -> &Utf8Path {
        &self.root
    }
}

/// Prompt classifiers matching the instructions each pipeline stage sends.
pub(crate) fn is_judge_prompt(prompt: &str) -> bool {
    prompt.contains("Answer with exactly YES or NO.")
}

pub(crate) fn is_synthesis_prompt(prompt: &str) -> bool {
    prompt.contains("Respond with a single JSON object")
}

pub(crate) fn is_repair_prompt(prompt: &str) -> bool {
    prompt.contains("Return the complete corrected")
}
