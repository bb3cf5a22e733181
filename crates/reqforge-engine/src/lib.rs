//! Requirement reconciliation and self-repair pipeline
//!
//! [`ReconciliationLoop`] drives a run: each requirement is judged against
//! the current artifacts, synthesized when missing, merged without
//! duplication, and followed by a validate-and-repair pass. A final sweep
//! checks every markup, style and behavior file in the project tree.
//!
//! All components take a [`RunContext`] at construction; there is no
//! global state.

mod context;
mod fence;
mod judge;
mod oracle;
mod prompts;
mod reconcile;
mod repair;
mod requirements;
mod selector;
mod store;
mod synth;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use context::{ArtifactLayout, RunContext};
pub use judge::{ImplementationOracle, parse_verdict};
pub use oracle::{GenerationOracle, LlmOracle, OfflineOracle};
pub use reconcile::{ArtifactCheck, CheckStatus, ReconciliationLoop, RunSummary};
pub use repair::{RepairCycle, RepairEngine};
pub use requirements::{Requirement, load_requirements, parse_requirements};
pub use selector::{ArtifactSelector, SelectedArtifact};
pub use store::{ArtifactStore, CHANGELOG_HEADER, MergeOutcome, backup_path, changelog_entry};
pub use synth::{ImplementationProposal, Synthesizer, decode_proposal};
