//! Database schemas for kiosk
//!
//! Defines the MongoDB document structure for catalog entries.

mod metadata;
mod script;

pub use metadata::Metadata;
pub use script::{PendingCandidate, ReviewStatus, ScriptDoc, VersionStatus, SCRIPT_COLLECTION};
