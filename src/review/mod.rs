//! Per-version catalog review workflow
//!
//! Pure state transitions over [`ScriptDoc`]: resolving the active version,
//! applying moderator decisions, and applying submitter edits. No I/O
//! happens here; the service layer persists results and fires
//! notifications.
//!
//! The active version is the pending candidate when one exists, else the
//! entry's nominal version. A decision always applies to the active
//! version. Versions are compared by exact string equality.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::db::schemas::{PendingCandidate, ReviewStatus, ScriptDoc, VersionStatus};
use crate::db::Metadata;
use crate::types::{KioskError, Result};

/// Commit hashes are validated by shape only, never against a repository.
static COMMIT_HASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{7,40}$").expect("commit hash regex"));

/// Moderator decision applied to the active version
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Denied,
    ChangesRequested,
}

impl Decision {
    pub fn status(self) -> ReviewStatus {
        match self {
            Self::Accepted => ReviewStatus::Accepted,
            Self::Denied => ReviewStatus::Denied,
            Self::ChangesRequested => ReviewStatus::ChangesRequested,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Denied => "denied",
            Self::ChangesRequested => "changes requested",
        }
    }
}

/// The version a decision or edit check applies to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveVersion {
    pub version: String,
    pub status: Option<ReviewStatus>,
    pub hash: Option<String>,
}

/// What a decision changed, for the notification sink
#[derive(Clone, Debug)]
pub struct DecisionOutcome {
    pub version: String,
    pub hash: Option<String>,
    pub decision: Decision,
    pub feedback: Option<String>,
}

/// Submitter-editable fields shared by new submissions and edits
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct ScriptFields {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An edit to an existing entry: a new version + hash plus display fields
#[derive(Clone, Debug, serde::Deserialize)]
pub struct EditRequest {
    pub version: String,
    pub hash: String,
    #[serde(flatten)]
    pub fields: ScriptFields,
}

/// A brand new catalog submission
#[derive(Clone, Debug, serde::Deserialize)]
pub struct NewScriptRequest {
    pub version: String,
    pub hash: String,
    #[serde(flatten)]
    pub fields: ScriptFields,
}

/// Shape check for commit hashes: 7 to 40 hex characters
pub fn is_commit_hash(hash: &str) -> bool {
    COMMIT_HASH_RE.is_match(hash)
}

fn validate_submission(fields: &ScriptFields, version: &str, hash: &str) -> Result<()> {
    let required = [
        ("name", fields.name.as_str()),
        ("description", fields.description.as_str()),
        ("url", fields.url.as_str()),
        ("version", version),
        ("hash", hash),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(KioskError::Validation(format!("Missing field: {}", field)));
        }
    }

    if !is_commit_hash(hash) {
        return Err(KioskError::Validation(format!(
            "Invalid commit hash '{}': expected 7-40 hex characters",
            hash
        )));
    }

    Ok(())
}

/// Resolve the version a moderation decision applies to.
///
/// The pending candidate always wins over the status map: a fresh edit is
/// under review no matter what the map says about earlier versions.
pub fn resolve_active(entry: &ScriptDoc) -> ActiveVersion {
    if let Some(ref candidate) = entry.pending {
        return ActiveVersion {
            version: candidate.version.clone(),
            status: Some(ReviewStatus::PendingReview),
            hash: Some(candidate.hash.clone()),
        };
    }

    let status_entry = entry.statuses.get(&entry.version);
    ActiveVersion {
        version: entry.version.clone(),
        status: status_entry.map(|s| s.status),
        hash: status_entry.and_then(|s| s.hash.clone()),
    }
}

/// Apply a moderator decision to the active version.
///
/// Accept moves a pending candidate into permanent history; deny discards
/// it; changes-requested leaves it in place so the submitter can revise
/// without losing the candidate hash reference.
pub fn apply_decision(
    entry: &mut ScriptDoc,
    decision: Decision,
    feedback: Option<String>,
) -> DecisionOutcome {
    let active = resolve_active(entry);

    entry.statuses.insert(
        active.version.clone(),
        VersionStatus::new(decision.status(), active.hash.clone()),
    );
    entry.pending_review = decision == Decision::ChangesRequested;
    entry.review_feedback = feedback.clone();

    match decision {
        Decision::Accepted => {
            if let Some(candidate) = entry.pending.take() {
                // Nominal version was already set at submit time
                entry.history.insert(candidate.version, candidate.hash);
            }
        }
        Decision::Denied => {
            // Candidate discarded; prior accepted history untouched
            entry.pending = None;
        }
        Decision::ChangesRequested => {}
    }

    DecisionOutcome {
        version: active.version,
        hash: active.hash,
        decision,
        feedback,
    }
}

/// Apply a submitter edit, writing a new pending candidate.
///
/// Rejected while the active status is DENIED; a denied entry stays
/// blocked until a fresh submission path is used.
pub fn apply_edit(entry: &mut ScriptDoc, req: EditRequest) -> Result<()> {
    let active = resolve_active(entry);

    if active.status == Some(ReviewStatus::Denied) {
        return Err(KioskError::Permission(
            "Entry is denied and cannot be edited".to_string(),
        ));
    }

    validate_submission(&req.fields, &req.version, &req.hash)?;

    // Resubmitting the contested version is allowed while changes are
    // requested; any other reuse of a permanent version is rejected.
    let is_resubmission =
        active.status == Some(ReviewStatus::ChangesRequested) && req.version == active.version;
    if entry.history.contains_key(&req.version) && !is_resubmission {
        return Err(KioskError::Validation(format!(
            "Version {} already exists",
            req.version
        )));
    }

    if entry
        .history
        .iter()
        .any(|(version, hash)| *hash == req.hash && *version != req.version)
    {
        return Err(KioskError::Validation(format!(
            "Commit hash {} is already used by another version",
            req.hash
        )));
    }

    entry.statuses.insert(
        req.version.clone(),
        VersionStatus::new(ReviewStatus::PendingReview, Some(req.hash.clone())),
    );
    entry.pending = Some(PendingCandidate {
        version: req.version.clone(),
        hash: req.hash,
    });
    entry.pending_review = true;
    entry.version = req.version;

    entry.name = req.fields.name;
    entry.description = req.fields.description;
    entry.url = req.fields.url;
    entry.logo = req.fields.logo;
    entry.tags = req.fields.tags;

    Ok(())
}

/// Build a brand new catalog entry.
///
/// The first submission is direct-keyed into permanent history with no
/// pending indirection. The single-in-flight-per-author policy spans
/// entries and is enforced by the service with a store query.
pub fn new_entry(author: &str, author_id: &str, req: NewScriptRequest) -> Result<ScriptDoc> {
    validate_submission(&req.fields, &req.version, &req.hash)?;

    let mut entry = ScriptDoc {
        _id: None,
        metadata: Metadata::new(),
        name: req.fields.name,
        description: req.fields.description,
        url: req.fields.url,
        logo: req.fields.logo,
        tags: req.fields.tags,
        author: author.to_string(),
        author_id: author_id.to_string(),
        version: req.version.clone(),
        history: Default::default(),
        pending: None,
        statuses: Default::default(),
        pending_review: true,
        review_feedback: None,
    };
    entry.history.insert(req.version.clone(), req.hash.clone());
    entry.statuses.insert(
        req.version,
        VersionStatus::new(ReviewStatus::PendingReview, Some(req.hash)),
    );

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str) -> ScriptFields {
        ScriptFields {
            name: name.to_string(),
            description: "Fetches things".to_string(),
            url: "https://example.com/grabber".to_string(),
            logo: None,
            tags: vec!["utility".to_string()],
        }
    }

    fn new_request(version: &str, hash: &str) -> NewScriptRequest {
        NewScriptRequest {
            version: version.to_string(),
            hash: hash.to_string(),
            fields: fields("grabber"),
        }
    }

    fn edit_request(version: &str, hash: &str) -> EditRequest {
        EditRequest {
            version: version.to_string(),
            hash: hash.to_string(),
            fields: fields("grabber"),
        }
    }

    fn entry_with_pending() -> ScriptDoc {
        let mut entry = new_entry("ada", "user-1", new_request("1.0.0", "aaaaaaa")).unwrap();
        apply_decision(&mut entry, Decision::Accepted, None);
        apply_edit(&mut entry, edit_request("1.2.0", "abc1234")).unwrap();
        entry
    }

    #[test]
    fn pending_candidate_always_wins() {
        let mut entry = entry_with_pending();

        // Poison the status map; the candidate must still win
        entry.statuses.insert(
            "1.2.0".to_string(),
            VersionStatus::new(ReviewStatus::Denied, Some("ffffff0".to_string())),
        );

        let active = resolve_active(&entry);
        assert_eq!(active.version, "1.2.0");
        assert_eq!(active.status, Some(ReviewStatus::PendingReview));
        assert_eq!(active.hash.as_deref(), Some("abc1234"));
    }

    #[test]
    fn resolve_falls_back_to_nominal_version() {
        let mut entry = new_entry("ada", "user-1", new_request("1.0.0", "aaaaaaa")).unwrap();
        let active = resolve_active(&entry);
        assert_eq!(active.version, "1.0.0");
        assert_eq!(active.status, Some(ReviewStatus::PendingReview));
        assert_eq!(active.hash.as_deref(), Some("aaaaaaa"));

        // Absent fields propagate as None
        entry.statuses.clear();
        let active = resolve_active(&entry);
        assert_eq!(active.status, None);
        assert_eq!(active.hash, None);
    }

    #[test]
    fn accept_commits_pending_candidate() {
        let mut entry = entry_with_pending();

        let outcome = apply_decision(&mut entry, Decision::Accepted, None);

        assert_eq!(entry.history.get("1.2.0").map(String::as_str), Some("abc1234"));
        assert!(entry.pending.is_none());
        assert_eq!(
            entry.statuses.get("1.2.0").unwrap(),
            &VersionStatus::new(ReviewStatus::Accepted, Some("abc1234".to_string()))
        );
        assert!(!entry.pending_review);
        assert_eq!(outcome.version, "1.2.0");
        assert_eq!(outcome.decision, Decision::Accepted);
    }

    #[test]
    fn deny_discards_candidate_keeps_history() {
        let mut entry = entry_with_pending();

        apply_decision(&mut entry, Decision::Denied, Some("not suitable".to_string()));

        assert!(entry.pending.is_none());
        assert_eq!(entry.history.get("1.0.0").map(String::as_str), Some("aaaaaaa"));
        assert!(!entry.history.contains_key("1.2.0"));
        assert_eq!(
            entry.statuses.get("1.2.0").unwrap().status,
            ReviewStatus::Denied
        );
        assert!(!entry.pending_review);
    }

    #[test]
    fn changes_requested_keeps_candidate_and_feedback() {
        let mut entry = entry_with_pending();

        apply_decision(
            &mut entry,
            Decision::ChangesRequested,
            Some("fix X".to_string()),
        );

        assert!(entry.pending.is_some());
        assert!(entry.pending_review);
        assert_eq!(entry.review_feedback.as_deref(), Some("fix X"));
        assert_eq!(
            entry.statuses.get("1.2.0").unwrap().status,
            ReviewStatus::ChangesRequested
        );
    }

    #[test]
    fn edit_rejects_version_already_in_history() {
        let mut entry = new_entry("ada", "user-1", new_request("1.0.0", "aaaaaaa")).unwrap();
        apply_decision(&mut entry, Decision::Accepted, None);

        let err = apply_edit(&mut entry, edit_request("1.0.0", "bbbbbbb")).unwrap_err();
        assert!(matches!(err, KioskError::Validation(_)));
    }

    #[test]
    fn edit_allows_resubmitting_contested_version() {
        let mut entry = entry_with_pending();
        apply_decision(
            &mut entry,
            Decision::ChangesRequested,
            Some("fix X".to_string()),
        );

        // Same contested version, new hash
        apply_edit(&mut entry, edit_request("1.2.0", "ccccccc")).unwrap();

        let pending = entry.pending.as_ref().unwrap();
        assert_eq!(pending.version, "1.2.0");
        assert_eq!(pending.hash, "ccccccc");
    }

    #[test]
    fn edit_rejects_denied_entry() {
        let mut entry = new_entry("ada", "user-1", new_request("1.0.0", "aaaaaaa")).unwrap();
        apply_decision(&mut entry, Decision::Denied, None);

        let err = apply_edit(&mut entry, edit_request("1.1.0", "bbbbbbb")).unwrap_err();
        assert!(matches!(err, KioskError::Permission(_)));
    }

    #[test]
    fn edit_rejects_hash_reused_by_other_version() {
        let mut entry = new_entry("ada", "user-1", new_request("1.0.0", "aaaaaaa")).unwrap();
        apply_decision(&mut entry, Decision::Accepted, None);

        let err = apply_edit(&mut entry, edit_request("1.1.0", "aaaaaaa")).unwrap_err();
        assert!(matches!(err, KioskError::Validation(_)));
    }

    #[test]
    fn edit_rejects_blank_required_fields() {
        let mut entry = new_entry("ada", "user-1", new_request("1.0.0", "aaaaaaa")).unwrap();
        apply_decision(&mut entry, Decision::Accepted, None);

        let mut req = edit_request("1.1.0", "bbbbbbb");
        req.fields.name = "  ".to_string();
        let err = apply_edit(&mut entry, req).unwrap_err();
        assert!(matches!(err, KioskError::Validation(_)));
    }

    #[test]
    fn hash_shape_check() {
        assert!(is_commit_hash("abcd123"));
        assert!(is_commit_hash("ABCD123"));
        assert!(is_commit_hash(&"a".repeat(40)));
        assert!(!is_commit_hash("xyz"));
        assert!(!is_commit_hash("a1"));
        assert!(!is_commit_hash(&"a".repeat(41)));
        assert!(!is_commit_hash(""));
    }

    #[test]
    fn new_entry_is_direct_keyed() {
        let entry = new_entry("ada", "user-1", new_request("1.0.0", "aaaaaaa")).unwrap();

        assert_eq!(entry.history.get("1.0.0").map(String::as_str), Some("aaaaaaa"));
        assert!(entry.pending.is_none());
        assert_eq!(
            entry.statuses.get("1.0.0").unwrap(),
            &VersionStatus::new(ReviewStatus::PendingReview, Some("aaaaaaa".to_string()))
        );
        assert!(entry.pending_review);
    }

    #[test]
    fn new_entry_rejects_bad_hash() {
        let err = new_entry("ada", "user-1", new_request("1.0.0", "xyz")).unwrap_err();
        assert!(matches!(err, KioskError::Validation(_)));
    }

    /// Full lifecycle: submit, accept, edit, request changes, resubmit
    #[test]
    fn full_review_lifecycle() {
        let mut entry = new_entry("ada", "user-1", new_request("1.0.0", "aaaaaaa")).unwrap();
        assert_eq!(
            entry.statuses.get("1.0.0").unwrap(),
            &VersionStatus::new(ReviewStatus::PendingReview, Some("aaaaaaa".to_string()))
        );

        // Moderator accepts the first submission
        apply_decision(&mut entry, Decision::Accepted, None);
        assert_eq!(entry.history.get("1.0.0").map(String::as_str), Some("aaaaaaa"));
        assert_eq!(
            entry.statuses.get("1.0.0").unwrap(),
            &VersionStatus::new(ReviewStatus::Accepted, Some("aaaaaaa".to_string()))
        );
        assert!(!entry.pending_review);

        // Author edits to 1.1.0
        apply_edit(&mut entry, edit_request("1.1.0", "bbbbbbb")).unwrap();
        assert_eq!(entry.history.get("1.0.0").map(String::as_str), Some("aaaaaaa"));
        assert_eq!(
            entry.pending.as_ref().unwrap(),
            &PendingCandidate {
                version: "1.1.0".to_string(),
                hash: "bbbbbbb".to_string()
            }
        );
        assert_eq!(
            entry.statuses.get("1.1.0").unwrap(),
            &VersionStatus::new(ReviewStatus::PendingReview, Some("bbbbbbb".to_string()))
        );

        // Moderator requests changes
        apply_decision(
            &mut entry,
            Decision::ChangesRequested,
            Some("fix X".to_string()),
        );
        assert_eq!(
            entry.statuses.get("1.1.0").unwrap(),
            &VersionStatus::new(ReviewStatus::ChangesRequested, Some("bbbbbbb".to_string()))
        );
        assert_eq!(entry.review_feedback.as_deref(), Some("fix X"));
        assert!(entry.pending.is_some());

        // Author resubmits the same version with a new hash
        apply_edit(&mut entry, edit_request("1.1.0", "ccccccc")).unwrap();
        assert_eq!(
            entry.pending.as_ref().unwrap(),
            &PendingCandidate {
                version: "1.1.0".to_string(),
                hash: "ccccccc".to_string()
            }
        );
    }
}
