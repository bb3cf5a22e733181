//! The reconciliation loop
//!
//! Requirements are processed one at a time, in source order. Every step
//! returns a `Result`; a failure ends work on the current requirement (or
//! artifact) only, and the loop moves on.

use anyhow::Result;
use camino::Utf8PathBuf;
use serde::Serialize;
use std::fmt;
use tracing::{Instrument, error, info, warn};

use reqforge_utils::error::ReqforgeError;
use reqforge_utils::logging::requirement_span;
use reqforge_utils::types::{ArtifactKind, Diagnostic};
use reqforge_validation::SyntaxValidator;

use crate::context::RunContext;
use crate::judge::ImplementationOracle;
use crate::repair::{RepairCycle, RepairEngine};
use crate::requirements::{Requirement, load_requirements};
use crate::selector::ArtifactSelector;
use crate::store::ArtifactStore;
use crate::synth::Synthesizer;

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub source_found: bool,
    pub requirements_seen: usize,
    pub requirements_satisfied: usize,
    pub requirements_implemented: usize,
    pub requirements_failed: usize,
    pub artifacts_checked: usize,
    pub artifacts_valid: usize,
    pub artifacts_invalid: usize,
    pub artifacts_repaired: usize,
    pub repairs_failed: usize,
    pub artifact_errors: usize,
    pub oracle_calls: u32,
}

impl RunSummary {
    fn tally(&mut self, cycle: &RepairCycle) {
        self.artifacts_checked += 1;
        match cycle {
            RepairCycle::Valid => self.artifacts_valid += 1,
            RepairCycle::Repaired { .. } => {
                self.artifacts_invalid += 1;
                self.artifacts_repaired += 1;
            }
            RepairCycle::Failed { .. } => {
                self.artifacts_invalid += 1;
                self.repairs_failed += 1;
            }
            RepairCycle::Error { .. } => self.artifact_errors += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.source_found {
            return writeln!(f, "No requirements source found; nothing to do.");
        }
        writeln!(
            f,
            "Requirements: {} seen, {} already satisfied, {} implemented, {} failed",
            self.requirements_seen,
            self.requirements_satisfied,
            self.requirements_implemented,
            self.requirements_failed
        )?;
        writeln!(
            f,
            "Artifacts:    {} checked, {} valid, {} invalid ({} repaired, {} repair failures), {} errors",
            self.artifacts_checked,
            self.artifacts_valid,
            self.artifacts_invalid,
            self.artifacts_repaired,
            self.repairs_failed,
            self.artifact_errors
        )?;
        writeln!(f, "Oracle calls: {}", self.oracle_calls)
    }
}

/// Validation result for one file, without repair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactCheck {
    pub path: Utf8PathBuf,
    pub kind: ArtifactKind,
    #[serde(flatten)]
    pub status: CheckStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CheckStatus {
    Valid,
    Invalid { diagnostic: Diagnostic },
    Unreadable { reason: String },
}

enum RequirementOutcome {
    Satisfied,
    Implemented,
    /// The proposal carried no code for any kind
    Empty,
}

pub struct ReconciliationLoop {
    ctx: RunContext,
    store: ArtifactStore,
    judge: ImplementationOracle,
    synth: Synthesizer,
    repair: RepairEngine,
    selector: ArtifactSelector,
}

impl ReconciliationLoop {
    /// # Errors
    ///
    /// Fails if an exclusion glob in the context is invalid.
    pub fn new(ctx: RunContext) -> Result<Self> {
        let selector = ArtifactSelector::new(&ctx.project_root, &ctx.exclude)?;
        Ok(Self {
            store: ArtifactStore::new(&ctx),
            judge: ImplementationOracle::new(ctx.oracle.clone()),
            synth: Synthesizer::new(ctx.oracle.clone()),
            repair: RepairEngine::new(&ctx),
            selector,
            ctx,
        })
    }

    #[must_use]
    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Reconcile every requirement, then sweep the project tree.
    ///
    /// Never fails: all errors are logged and counted in the summary.
    pub async fn run(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        let Some(requirements) = self.load() else {
            return summary;
        };
        summary.source_found = true;
        summary.requirements_seen = requirements.len();
        info!(count = requirements.len(), "Loaded requirements");

        for (index, requirement) in requirements.iter().enumerate() {
            let span = requirement_span(index + 1, requirement.text());
            let outcome = self
                .process(requirement, &mut summary)
                .instrument(span.clone())
                .await;

            let _entered = span.enter();
            match outcome {
                Ok(RequirementOutcome::Satisfied) => summary.requirements_satisfied += 1,
                Ok(RequirementOutcome::Implemented) => summary.requirements_implemented += 1,
                Ok(RequirementOutcome::Empty) => summary.requirements_failed += 1,
                Err(e) => {
                    error!(error = %e, "Requirement failed; continuing with the next one");
                    summary.requirements_failed += 1;
                }
            }
        }

        self.sweep(&mut summary).await;
        summary.oracle_calls = self.ctx.oracle.call_count();
        info!(
            implemented = summary.requirements_implemented,
            failed = summary.requirements_failed,
            repaired = summary.artifacts_repaired,
            "Run complete"
        );
        summary
    }

    /// Report what `run` would do without calling the oracle or writing.
    pub async fn dry_run(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        let Some(requirements) = self.load() else {
            return summary;
        };
        summary.source_found = true;
        summary.requirements_seen = requirements.len();

        for (index, requirement) in requirements.iter().enumerate() {
            info!(
                index = index + 1,
                requirement = %requirement.header(),
                "Would reconcile requirement"
            );
        }

        for check in self.check_tree() {
            summary.artifacts_checked += 1;
            match check.status {
                CheckStatus::Valid => summary.artifacts_valid += 1,
                CheckStatus::Invalid { .. } => summary.artifacts_invalid += 1,
                CheckStatus::Unreadable { .. } => summary.artifact_errors += 1,
            }
        }
        summary
    }

    /// Validate every artifact in the project tree, without repair.
    ///
    /// Unreadable files are reported per file.
    #[must_use]
    pub fn check_tree(&self) -> Vec<ArtifactCheck> {
        self.selector
            .select()
            .into_iter()
            .map(|artifact| {
                let status = match self.store.read_path(&artifact.path) {
                    Ok(content) => match SyntaxValidator::check(artifact.kind, &content) {
                        None => CheckStatus::Valid,
                        Some(diagnostic) => CheckStatus::Invalid { diagnostic },
                    },
                    Err(e) => CheckStatus::Unreadable {
                        reason: e.to_string(),
                    },
                };
                ArtifactCheck {
                    path: artifact.path,
                    kind: artifact.kind,
                    status,
                }
            })
            .collect()
    }

    fn load(&self) -> Option<Vec<Requirement>> {
        let path = &self.ctx.requirements_path;
        match load_requirements(path) {
            Ok(Some(requirements)) => Some(requirements),
            Ok(None) => {
                warn!(path = %path, "Requirements source not found; nothing to do");
                None
            }
            Err(e) => {
                error!(error = %e, "Failed to read requirements source");
                None
            }
        }
    }

    async fn process(
        &self,
        requirement: &Requirement,
        summary: &mut RunSummary,
    ) -> Result<RequirementOutcome, ReqforgeError> {
        let corpus = self.store.corpus()?;
        if self.judge.is_satisfied(requirement, &corpus).await {
            info!(outcome = "satisfied", "Requirement already satisfied");
            return Ok(RequirementOutcome::Satisfied);
        }

        let proposal = self.synth.synthesize(requirement).await?;
        if proposal.is_empty() {
            warn!(outcome = "empty", "Proposal contained no code; requirement left for the next run");
            return Ok(RequirementOutcome::Empty);
        }

        for kind in ArtifactKind::ALL {
            if let Some(fragment) = proposal.fragment(kind) {
                self.store.merge(kind, fragment)?;
            }
        }

        for kind in ArtifactKind::ALL {
            let path = self.ctx.artifact_path(kind);
            if path.is_file() {
                let cycle = self.repair.check_and_repair(&path, kind).await;
                summary.tally(&cycle);
            }
        }

        if self.store.append_changelog(requirement.text(), &proposal.description)? {
            info!(path = %self.store.changelog_path(), "Changelog updated");
        }
        info!(outcome = "implemented", "Requirement implemented");

        Ok(RequirementOutcome::Implemented)
    }

    async fn sweep(&self, summary: &mut RunSummary) {
        let selected = self.selector.select();

        info!(count = selected.len(), "Final sweep");
        for artifact in selected {
            let cycle = self.repair.check_and_repair(&artifact.path, artifact.kind).await;
            summary.tally(&cycle);
        }
    }
}
