//! Catalog entry ("script") document schema
//!
//! Each entry carries a permanent version -> commit-hash history, a
//! per-version review status map, and at most one pending candidate
//! awaiting moderation.
//!
//! Rows written by earlier iterations of the platform come in three
//! historical shapes and are normalized on read:
//!   - `history` as a bare hash string keyed by the row's nominal version;
//!   - `history` as a map holding the reserved `"__pending"` key with a
//!     `{version, hash}` object, now the explicit `pending` slot;
//!   - `statuses` values as a bare status string or a `[status, hash]`
//!     pair, plus a flat top-level `status` applying to the nominal version.
//! Serialization always writes the normalized shape.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for catalog entries
pub const SCRIPT_COLLECTION: &str = "scripts";

/// Reserved key legacy rows used for the pending candidate slot
const LEGACY_PENDING_KEY: &str = "__pending";

/// Per-version review state
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewStatus {
    #[serde(rename = "PENDING_REVIEW")]
    PendingReview,
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "CHANGES_REQUESTED")]
    ChangesRequested,
    #[serde(rename = "DENIED")]
    Denied,
}

/// An edit awaiting moderation. Single slot, overwritten on each new
/// submission; moved into permanent history on accept, discarded on deny.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PendingCandidate {
    pub version: String,
    pub hash: String,
}

/// Status entry for one submitted version
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VersionStatus {
    pub status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl VersionStatus {
    pub fn new(status: ReviewStatus, hash: Option<String>) -> Self {
        Self { status, hash }
    }
}

/// Catalog entry document stored in MongoDB
#[derive(Serialize, Clone, Debug, Default)]
pub struct ScriptDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Display name
    pub name: String,

    /// One-paragraph description shown in the catalog
    pub description: String,

    /// Link to the script's repository or homepage
    pub url: String,

    /// Optional logo URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,

    /// Free-form tags for catalog filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Submitter display handle
    pub author: String,

    /// Stable submitter id from the auth provider
    pub author_id: String,

    /// Nominal latest version. Compared by exact string equality only;
    /// no semver ordering anywhere.
    pub version: String,

    /// Permanent version -> commit hash history. Keys are exactly the
    /// versions ever written to permanent history: accepted versions plus
    /// the first submission, which is direct-keyed.
    pub history: BTreeMap<String, String>,

    /// Edit awaiting moderation, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingCandidate>,

    /// Review status for every version ever submitted
    pub statuses: BTreeMap<String, VersionStatus>,

    /// Mirror flag for review-queue filtering
    pub pending_review: bool,

    /// Moderator note, meaningful while the active version's status is
    /// CHANGES_REQUESTED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_feedback: Option<String>,
}

/// Legacy wire shapes for the `history` field
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryShape {
    Flat(String),
    Map(BTreeMap<String, HistoryValue>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryValue {
    Hash(String),
    Candidate(PendingCandidate),
}

/// Legacy wire shapes for `statuses` values
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusShape {
    Flat(ReviewStatus),
    Pair(ReviewStatus, String),
    Full(VersionStatus),
}

#[derive(Deserialize)]
struct RawScriptDoc {
    #[serde(default)]
    _id: Option<ObjectId>,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    logo: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    author: String,
    #[serde(default)]
    author_id: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    history: Option<HistoryShape>,
    #[serde(default)]
    pending: Option<PendingCandidate>,
    #[serde(default)]
    statuses: BTreeMap<String, StatusShape>,
    /// Legacy flat status field, applies to the nominal version
    #[serde(default)]
    status: Option<ReviewStatus>,
    #[serde(default)]
    pending_review: bool,
    #[serde(default)]
    review_feedback: Option<String>,
}

impl From<RawScriptDoc> for ScriptDoc {
    fn from(raw: RawScriptDoc) -> Self {
        let mut pending = raw.pending;

        let mut history = BTreeMap::new();
        match raw.history {
            Some(HistoryShape::Flat(hash)) => {
                if !raw.version.is_empty() {
                    history.insert(raw.version.clone(), hash);
                }
            }
            Some(HistoryShape::Map(map)) => {
                for (key, value) in map {
                    match value {
                        HistoryValue::Candidate(candidate) if key == LEGACY_PENDING_KEY => {
                            // Explicit slot wins over the legacy sentinel key
                            if pending.is_none() {
                                pending = Some(candidate);
                            }
                        }
                        HistoryValue::Hash(hash) => {
                            history.insert(key, hash);
                        }
                        HistoryValue::Candidate(_) => {
                            // Candidate object under a real version key is
                            // malformed legacy data; drop it
                        }
                    }
                }
            }
            None => {}
        }

        let mut statuses: BTreeMap<String, VersionStatus> = raw
            .statuses
            .into_iter()
            .map(|(version, shape)| {
                let normalized = match shape {
                    StatusShape::Flat(status) => {
                        VersionStatus::new(status, history.get(&version).cloned())
                    }
                    StatusShape::Pair(status, hash) => VersionStatus::new(status, Some(hash)),
                    StatusShape::Full(full) => full,
                };
                (version, normalized)
            })
            .collect();

        // Oldest rows carry a single flat status with no version key
        if statuses.is_empty() {
            if let Some(status) = raw.status {
                if !raw.version.is_empty() {
                    let hash = history.get(&raw.version).cloned();
                    statuses.insert(raw.version.clone(), VersionStatus::new(status, hash));
                }
            }
        }

        ScriptDoc {
            _id: raw._id,
            metadata: raw.metadata,
            name: raw.name,
            description: raw.description,
            url: raw.url,
            logo: raw.logo,
            tags: raw.tags,
            author: raw.author,
            author_id: raw.author_id,
            version: raw.version,
            history,
            pending,
            statuses,
            pending_review: raw.pending_review,
            review_feedback: raw.review_feedback,
        }
    }
}

impl<'de> Deserialize<'de> for ScriptDoc {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawScriptDoc::deserialize(deserializer).map(ScriptDoc::from)
    }
}

impl ScriptDoc {
    /// Whether any version of this entry has been accepted.
    /// Entries without an accepted version are hidden from public browse.
    pub fn has_accepted_version(&self) -> bool {
        self.statuses
            .values()
            .any(|s| s.status == ReviewStatus::Accepted)
    }
}

impl IntoIndexes for ScriptDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Single-in-flight-submission-per-author lookup
            (
                doc! { "author_id": 1, "pending_review": 1 },
                Some(
                    IndexOptions::builder()
                        .name("author_pending_index".to_string())
                        .build(),
                ),
            ),
            // Review queue filtering
            (
                doc! { "pending_review": 1 },
                Some(
                    IndexOptions::builder()
                        .name("pending_review_index".to_string())
                        .build(),
                ),
            ),
            // Newest-first catalog listing
            (
                doc! { "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("created_at_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ScriptDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_shape_round_trips() {
        let mut doc = ScriptDoc {
            name: "grabber".to_string(),
            description: "Fetches things".to_string(),
            url: "https://example.com/grabber".to_string(),
            author: "ada".to_string(),
            author_id: "user-1".to_string(),
            version: "1.1.0".to_string(),
            pending_review: true,
            ..Default::default()
        };
        doc.history.insert("1.0.0".to_string(), "aaaaaaa".to_string());
        doc.pending = Some(PendingCandidate {
            version: "1.1.0".to_string(),
            hash: "bbbbbbb".to_string(),
        });
        doc.statuses.insert(
            "1.1.0".to_string(),
            VersionStatus::new(ReviewStatus::PendingReview, Some("bbbbbbb".to_string())),
        );

        let bson_doc = bson::to_document(&doc).unwrap();
        let back: ScriptDoc = bson::from_document(bson_doc).unwrap();

        assert_eq!(back.history.get("1.0.0").unwrap(), "aaaaaaa");
        assert_eq!(back.pending, doc.pending);
        assert_eq!(
            back.statuses.get("1.1.0").unwrap().status,
            ReviewStatus::PendingReview
        );
    }

    #[test]
    fn legacy_flat_history_string_is_keyed_by_version() {
        let raw = serde_json::json!({
            "name": "grabber",
            "description": "d",
            "url": "https://example.com",
            "author": "ada",
            "author_id": "user-1",
            "version": "1.0.0",
            "history": "aaaaaaa",
            "status": "ACCEPTED",
            "pending_review": false
        });

        let doc: ScriptDoc = serde_json::from_value(raw).unwrap();
        assert_eq!(doc.history.get("1.0.0").unwrap(), "aaaaaaa");
        assert!(doc.pending.is_none());

        // Flat status applies to the nominal version and picks up its hash
        let status = doc.statuses.get("1.0.0").unwrap();
        assert_eq!(status.status, ReviewStatus::Accepted);
        assert_eq!(status.hash.as_deref(), Some("aaaaaaa"));
    }

    #[test]
    fn legacy_pending_key_moves_into_explicit_slot() {
        let raw = serde_json::json!({
            "version": "1.1.0",
            "history": {
                "1.0.0": "aaaaaaa",
                "__pending": { "version": "1.1.0", "hash": "bbbbbbb" }
            },
            "statuses": {
                "1.0.0": "ACCEPTED",
                "1.1.0": ["PENDING_REVIEW", "bbbbbbb"]
            },
            "pending_review": true
        });

        let doc: ScriptDoc = serde_json::from_value(raw).unwrap();

        // Sentinel key is gone from history, candidate lives in the slot
        assert!(!doc.history.contains_key("__pending"));
        assert_eq!(doc.history.get("1.0.0").unwrap(), "aaaaaaa");
        let pending = doc.pending.unwrap();
        assert_eq!(pending.version, "1.1.0");
        assert_eq!(pending.hash, "bbbbbbb");

        // Pair-shaped status values normalize to {status, hash}
        let status = doc.statuses.get("1.1.0").unwrap();
        assert_eq!(status.status, ReviewStatus::PendingReview);
        assert_eq!(status.hash.as_deref(), Some("bbbbbbb"));
    }

    #[test]
    fn explicit_pending_slot_wins_over_legacy_key() {
        let raw = serde_json::json!({
            "version": "2.0.0",
            "history": {
                "__pending": { "version": "1.9.0", "hash": "ddddddd" }
            },
            "pending": { "version": "2.0.0", "hash": "ccccccc" },
            "statuses": {},
            "pending_review": true
        });

        let doc: ScriptDoc = serde_json::from_value(raw).unwrap();
        assert_eq!(doc.pending.unwrap().version, "2.0.0");
    }

    #[test]
    fn serialization_never_emits_the_sentinel_key() {
        let raw = serde_json::json!({
            "version": "1.1.0",
            "history": {
                "1.0.0": "aaaaaaa",
                "__pending": { "version": "1.1.0", "hash": "bbbbbbb" }
            },
            "statuses": {},
            "pending_review": true
        });

        let doc: ScriptDoc = serde_json::from_value(raw).unwrap();
        let out = serde_json::to_value(&doc).unwrap();

        assert!(out["history"].get("__pending").is_none());
        assert_eq!(out["pending"]["version"], "1.1.0");
    }

    #[test]
    fn has_accepted_version_gates_public_visibility() {
        let mut doc = ScriptDoc::default();
        assert!(!doc.has_accepted_version());

        doc.statuses.insert(
            "1.0.0".to_string(),
            VersionStatus::new(ReviewStatus::PendingReview, None),
        );
        assert!(!doc.has_accepted_version());

        doc.statuses.insert(
            "1.0.0".to_string(),
            VersionStatus::new(ReviewStatus::Accepted, Some("aaaaaaa".to_string())),
        );
        assert!(doc.has_accepted_version());
    }
}
