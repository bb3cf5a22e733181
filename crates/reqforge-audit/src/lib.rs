//! Fix audit log for reqforge
//!
//! Every repair attempt, successful or not, leaves one canonical JSON
//! record under the configured fixes directory.

mod model;
mod writer;

pub use model::{FIX_RECORD_SCHEMA_VERSION, FixOutcome, FixRecord, content_hash};
pub use writer::FixLog;
