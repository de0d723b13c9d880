//! Database layer for kiosk
//!
//! Provides MongoDB storage for the community script catalog.

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{Metadata, PendingCandidate, ReviewStatus, ScriptDoc, VersionStatus};
