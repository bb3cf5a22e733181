use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reqforge_utils::types::{ArtifactKind, Diagnostic};

/// Current fix record schema version
pub const FIX_RECORD_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixOutcome {
    Fixed,
    Failed,
}

/// One repair attempt on one artifact.
///
/// Both content snapshots are kept in full together with their BLAKE3
/// hashes so a record can be checked against the backup or the live file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixRecord {
    pub schema_version: String,
    pub artifact_path: String,
    pub kind: ArtifactKind,
    pub recorded_at: DateTime<Utc>,
    pub diagnostic: Diagnostic,
    pub outcome: FixOutcome,
    pub original: String,
    pub original_blake3: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_blake3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl FixRecord {
    /// A repair whose corrected source passed validation.
    #[must_use]
    pub fn fixed(
        artifact_path: impl Into<String>,
        diagnostic: Diagnostic,
        original: impl Into<String>,
        corrected: impl Into<String>,
    ) -> Self {
        let corrected = corrected.into();
        let mut record = Self::base(artifact_path.into(), diagnostic, original.into(), FixOutcome::Fixed);
        record.corrected_blake3 = Some(content_hash(&corrected));
        record.corrected = Some(corrected);
        record
    }

    /// A repair that failed.
    ///
    /// `corrected` is the rejected candidate when the oracle produced one.
    #[must_use]
    pub fn failed(
        artifact_path: impl Into<String>,
        diagnostic: Diagnostic,
        original: impl Into<String>,
        corrected: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        let mut record = Self::base(artifact_path.into(), diagnostic, original.into(), FixOutcome::Failed);
        record.corrected_blake3 = corrected.as_deref().map(content_hash);
        record.corrected = corrected;
        record.failure_reason = Some(reason.into());
        record
    }

    fn base(artifact_path: String, diagnostic: Diagnostic, original: String, outcome: FixOutcome) -> Self {
        Self {
            schema_version: FIX_RECORD_SCHEMA_VERSION.to_string(),
            artifact_path,
            kind: diagnostic.kind,
            recorded_at: Utc::now(),
            diagnostic,
            outcome,
            original_blake3: content_hash(&original),
            original,
            corrected: None,
            corrected_blake3: None,
            failure_reason: None,
        }
    }
}

/// BLAKE3 hex digest of `content`.
#[must_use]
pub fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}
