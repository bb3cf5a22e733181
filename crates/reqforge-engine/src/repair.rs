//! Single-attempt syntax repair
//!
//! One artifact check cycle:
//!
//! ```text
//! CHECKING ── valid ──────────────────────────────────────────► DONE(valid)
//!    │
//!    └─ invalid ─► REPAIRING ── clean ──► BACKUP_AND_WRITE ───► DONE(repaired)
//!                      │
//!                      └─ failed / still invalid ─► LOGGED ───► DONE(failed)
//! ```
//!
//! Each repair attempt leaves exactly one [`FixRecord`]. A failed attempt
//! never touches the live file and never writes a backup.

use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use tracing::{Instrument, error, info, warn};

use reqforge_audit::{FixLog, FixRecord};
use reqforge_utils::error::{OracleError, RepairError};
use reqforge_utils::logging::artifact_span;
use reqforge_utils::types::{ArtifactKind, Diagnostic};
use reqforge_validation::SyntaxValidator;

use crate::context::RunContext;
use crate::fence::strip_code_fences;
use crate::oracle::GenerationOracle;
use crate::prompts::repair_prompt;
use crate::store::ArtifactStore;

/// Terminal state of one check cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairCycle {
    Valid,
    Repaired {
        diagnostic: Diagnostic,
        backup: Utf8PathBuf,
    },
    Failed {
        diagnostic: Diagnostic,
        reason: String,
    },
    /// The artifact could not be read or the repaired content not written
    Error { reason: String },
}

/// Outcome of one proposal: the error (if any) plus the candidate text the
/// oracle produced, kept for the audit record.
struct Attempt {
    candidate: Option<String>,
    result: Result<String, RepairError>,
}

pub struct RepairEngine {
    oracle: Arc<dyn GenerationOracle>,
    store: ArtifactStore,
    fix_log: FixLog,
    root: Utf8PathBuf,
}

impl RepairEngine {
    #[must_use]
    pub fn new(ctx: &RunContext) -> Self {
        Self {
            oracle: Arc::clone(&ctx.oracle),
            store: ArtifactStore::new(ctx),
            fix_log: FixLog::new(ctx.fixes_dir.clone()),
            root: ctx.project_root.clone(),
        }
    }

    #[must_use]
    pub fn fix_log(&self) -> &FixLog {
        &self.fix_log
    }

    /// Ask for one correction of `content` and re-validate it.
    ///
    /// Exactly one oracle call, no retries.
    ///
    /// # Errors
    ///
    /// `RepairError::Oracle` when the call fails or yields nothing usable,
    /// `RepairError::StillInvalid` when the correction fails validation.
    pub async fn repair(
        &self,
        kind: ArtifactKind,
        content: &str,
        diagnostic: &Diagnostic,
    ) -> Result<String, RepairError> {
        self.attempt(kind, content, diagnostic).await.result
    }

    async fn attempt(&self, kind: ArtifactKind, content: &str, diagnostic: &Diagnostic) -> Attempt {
        let reply = match self.oracle.generate(&repair_prompt(kind, content, diagnostic)).await {
            Ok(reply) => reply,
            Err(e) => {
                return Attempt {
                    candidate: None,
                    result: Err(e.into()),
                };
            }
        };

        let candidate = strip_code_fences(&reply).to_string();
        if candidate.is_empty() {
            return Attempt {
                candidate: None,
                result: Err(OracleError::EmptyResponse.into()),
            };
        }

        let result = match SyntaxValidator::check(kind, &candidate) {
            Some(still) => Err(RepairError::StillInvalid(still)),
            None => Ok(candidate.clone()),
        };
        Attempt {
            candidate: Some(candidate),
            result,
        }
    }

    /// Run one full check cycle over the file at `path`.
    pub async fn check_and_repair(&self, path: &Utf8Path, kind: ArtifactKind) -> RepairCycle {
        self.cycle(path, kind)
            .instrument(artifact_span(kind, path))
            .await
    }

    async fn cycle(&self, path: &Utf8Path, kind: ArtifactKind) -> RepairCycle {
        let original = match self.store.read_path(path) {
            Ok(content) => content,
            Err(e) => {
                error!(error = %e, "Failed to read artifact");
                return RepairCycle::Error {
                    reason: e.to_string(),
                };
            }
        };

        let Some(diagnostic) = SyntaxValidator::check(kind, &original) else {
            info!(outcome = "valid", "Artifact is valid");
            return RepairCycle::Valid;
        };
        warn!(diagnostic = %diagnostic, "Artifact failed validation; attempting repair");

        let attempt = self.attempt(kind, &original, &diagnostic).await;
        let record_path = self.display_path(path);

        let corrected = match attempt.result {
            Ok(corrected) => corrected,
            Err(e) => {
                let reason = e.to_string();
                warn!(outcome = "failed", reason = %reason, "Repair failed; artifact left unchanged");
                self.record(FixRecord::failed(
                    record_path,
                    diagnostic.clone(),
                    original,
                    attempt.candidate,
                    reason.clone(),
                ));
                return RepairCycle::Failed { diagnostic, reason };
            }
        };

        match self.store.backup_and_replace(path, &original, &corrected) {
            Ok(backup) => {
                info!(outcome = "repaired", backup = %backup, "Artifact repaired");
                self.record(FixRecord::fixed(record_path, diagnostic.clone(), original, corrected));
                RepairCycle::Repaired { diagnostic, backup }
            }
            Err(e) => {
                let reason = e.to_string();
                error!(error = %reason, "Failed to write repaired artifact");
                self.record(FixRecord::failed(
                    record_path,
                    diagnostic,
                    original,
                    Some(corrected),
                    reason.clone(),
                ));
                RepairCycle::Error { reason }
            }
        }
    }

    fn record(&self, record: FixRecord) {
        if let Err(e) = self.fix_log.append(&record) {
            error!(error = %format!("{e:#}"), "Failed to append fix record");
        }
    }

    fn display_path(&self, path: &Utf8Path) -> String {
        path.strip_prefix(&self.root).unwrap_or(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedOracle};
    use reqforge_audit::FixOutcome;
    use std::fs;
    use tempfile::TempDir;

    const BROKEN_CSS: &str = ".card { color: red;\n";

    struct Fixture {
        _temp: TempDir,
        ctx: RunContext,
        oracle: Arc<ScriptedOracle>,
    }

    fn fixture(replies: Vec<Reply>) -> Fixture {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let oracle = Arc::new(ScriptedOracle::from_replies(replies));
        let ctx = RunContext::for_root(&root, oracle.clone());
        Fixture {
            _temp: temp,
            ctx,
            oracle,
        }
    }

    #[tokio::test]
    async fn test_valid_artifact_needs_no_oracle() {
        let f = fixture(vec![]);
        let path = f.ctx.artifact_path(ArtifactKind::Style);
        fs::write(&path, ".a { color: red; }").unwrap();

        let engine = RepairEngine::new(&f.ctx);
        assert_eq!(engine.check_and_repair(&path, ArtifactKind::Style).await, RepairCycle::Valid);
        assert_eq!(f.oracle.call_count(), 0);
        assert!(engine.fix_log().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_repair_backs_up_original() {
        let f = fixture(vec![Reply::text("```css\n.card { color: red; }\n```")]);
        let path = f.ctx.artifact_path(ArtifactKind::Style);
        fs::write(&path, BROKEN_CSS).unwrap();

        let engine = RepairEngine::new(&f.ctx);
        let cycle = engine.check_and_repair(&path, ArtifactKind::Style).await;

        let RepairCycle::Repaired { backup, diagnostic } = cycle else {
            panic!("expected Repaired, got {cycle:?}");
        };
        assert_eq!(diagnostic.kind, ArtifactKind::Style);
        assert_eq!(fs::read_to_string(&backup).unwrap(), BROKEN_CSS);
        assert_eq!(fs::read_to_string(&path).unwrap(), ".card { color: red; }");
        assert_eq!(f.oracle.call_count(), 1);

        let records = engine.fix_log().list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, FixOutcome::Fixed);
        assert_eq!(records[0].artifact_path, "styles.css");
        assert_eq!(records[0].corrected.as_deref(), Some(".card { color: red; }"));
    }

    #[tokio::test]
    async fn test_still_invalid_leaves_file_untouched() {
        let f = fixture(vec![Reply::text(".card { color: blue;")]);
        let path = f.ctx.artifact_path(ArtifactKind::Style);
        fs::write(&path, BROKEN_CSS).unwrap();

        let engine = RepairEngine::new(&f.ctx);
        let cycle = engine.check_and_repair(&path, ArtifactKind::Style).await;

        assert!(matches!(cycle, RepairCycle::Failed { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), BROKEN_CSS);
        assert!(!crate::store::backup_path(&path).exists());
        assert_eq!(f.oracle.call_count(), 1);

        let records = engine.fix_log().list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, FixOutcome::Failed);
        assert_eq!(records[0].corrected.as_deref(), Some(".card { color: blue;"));
    }

    #[tokio::test]
    async fn test_oracle_failure_is_logged_failure() {
        let f = fixture(vec![Reply::Fail("timeout".into())]);
        let path = f.ctx.artifact_path(ArtifactKind::Behavior);
        fs::write(&path, "function f( {").unwrap();

        let engine = RepairEngine::new(&f.ctx);
        let cycle = engine.check_and_repair(&path, ArtifactKind::Behavior).await;

        let RepairCycle::Failed { reason, .. } = cycle else {
            panic!("expected Failed, got {cycle:?}");
        };
        assert!(reason.contains("timeout"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "function f( {");

        let records = engine.fix_log().list().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].corrected.is_none());
    }

    #[tokio::test]
    async fn test_repair_makes_exactly_one_call() {
        let f = fixture(vec![Reply::text("still { broken"), Reply::text("a {}")]);
        let engine = RepairEngine::new(&f.ctx);
        let diag = SyntaxValidator::check(ArtifactKind::Style, BROKEN_CSS).unwrap();

        let result = engine.repair(ArtifactKind::Style, BROKEN_CSS, &diag).await;

        assert!(matches!(result, Err(RepairError::StillInvalid(_))));
        assert_eq!(f.oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_fence_is_empty_response() {
        let f = fixture(vec![Reply::text("```\n```")]);
        let engine = RepairEngine::new(&f.ctx);
        let diag = SyntaxValidator::check(ArtifactKind::Style, BROKEN_CSS).unwrap();

        assert!(matches!(
            engine.repair(ArtifactKind::Style, BROKEN_CSS, &diag).await,
            Err(RepairError::Oracle(OracleError::EmptyResponse))
        ));
    }
}
