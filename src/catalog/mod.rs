//! Catalog service
//!
//! Glue between the MongoDB script store, the pure review core, and the
//! notification sink. Every mutation follows the read-modify-write model:
//! load the full document, transition it in memory, replace it as one
//! write keyed by id. Last write wins; there is no concurrency token.

use bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::{ScriptDoc, SCRIPT_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::notify::{decision_embed, submission_embed, Embed, NotificationSink, SinkKind};
use crate::review::{self, Decision, EditRequest, NewScriptRequest};
use crate::types::{KioskError, Result};

/// Filters and pagination for catalog listings
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub author_id: Option<String>,
    pub tag: Option<String>,
    pub limit: i64,
    pub skip: u64,
    /// Authors browsing their own entries see unpublished ones too
    pub include_unpublished: bool,
}

pub struct CatalogService {
    scripts: MongoCollection<ScriptDoc>,
    notifier: Arc<dyn NotificationSink>,
}

impl CatalogService {
    pub async fn new(
        mongo: &MongoClient,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let scripts = mongo.collection::<ScriptDoc>(SCRIPT_COLLECTION).await?;
        Ok(Self { scripts, notifier })
    }

    /// Create a new catalog entry.
    ///
    /// One in-flight submission per author: rejected while the author
    /// already has any entry awaiting review.
    pub async fn submit_new(
        &self,
        author: &str,
        author_id: &str,
        req: NewScriptRequest,
    ) -> Result<ScriptDoc> {
        let in_flight = self
            .scripts
            .find_one(doc! { "author_id": author_id, "pending_review": true })
            .await?;
        if in_flight.is_some() {
            return Err(KioskError::Validation(
                "You already have a submission awaiting review".to_string(),
            ));
        }

        let mut entry = review::new_entry(author, author_id, req)?;
        let id = self.scripts.insert_one(entry.clone()).await?;
        entry._id = Some(id);

        info!(entry = %id, author = %author_id, version = %entry.version, "New catalog submission");
        self.notify(submission_embed(&entry, false)).await;

        Ok(entry)
    }

    /// Apply a submitter edit, writing a new pending candidate
    pub async fn submit_edit(
        &self,
        author_id: &str,
        id: &str,
        req: EditRequest,
    ) -> Result<ScriptDoc> {
        let oid = parse_id(id)?;
        let mut entry = self.load(oid).await?;

        if entry.author_id != author_id {
            return Err(KioskError::Permission(
                "Only the submitter can edit this entry".to_string(),
            ));
        }

        review::apply_edit(&mut entry, req)?;
        self.scripts
            .replace_one(doc! { "_id": oid }, entry.clone())
            .await?;

        info!(entry = %oid, version = %entry.version, "Catalog entry resubmitted");
        self.notify(submission_embed(&entry, true)).await;

        Ok(entry)
    }

    /// Apply a moderator decision to the entry's active version
    pub async fn decide(
        &self,
        id: &str,
        decision: Decision,
        feedback: Option<String>,
    ) -> Result<ScriptDoc> {
        let oid = parse_id(id)?;
        let mut entry = self.load(oid).await?;

        let outcome = review::apply_decision(&mut entry, decision, feedback);
        self.scripts
            .replace_one(doc! { "_id": oid }, entry.clone())
            .await?;

        info!(
            entry = %oid,
            version = %outcome.version,
            decision = decision.as_str(),
            "Moderator decision applied"
        );
        self.notify(decision_embed(&entry, &outcome)).await;

        Ok(entry)
    }

    /// Fetch one entry by id
    pub async fn get(&self, id: &str) -> Result<ScriptDoc> {
        let oid = parse_id(id)?;
        self.load(oid).await
    }

    /// List catalog entries, newest first.
    ///
    /// Public visibility requires at least one accepted version. That check
    /// reads the status map, so it is applied after the query; pages can
    /// come back short while entries sit in review.
    pub async fn list(&self, query: ListQuery) -> Result<Vec<ScriptDoc>> {
        let mut filter = doc! {};
        if let Some(ref author_id) = query.author_id {
            filter.insert("author_id", author_id);
        }
        if let Some(ref tag) = query.tag {
            filter.insert("tags", tag);
        }

        let options = FindOptions::builder()
            .sort(doc! { "metadata.created_at": -1 })
            .skip(query.skip)
            .limit(query.limit)
            .build();

        let mut entries = self.scripts.find_with(filter, options).await?;
        if !query.include_unpublished {
            entries.retain(|e| e.has_accepted_version());
        }

        Ok(entries)
    }

    /// Entries awaiting moderation, oldest first
    pub async fn review_queue(&self) -> Result<Vec<ScriptDoc>> {
        let options = FindOptions::builder()
            .sort(doc! { "metadata.updated_at": 1 })
            .build();
        self.scripts
            .find_with(doc! { "pending_review": true }, options)
            .await
    }

    /// Plain row delete, outside the review workflow
    pub async fn delete(&self, id: &str) -> Result<()> {
        let oid = parse_id(id)?;
        let result = self.scripts.delete_one(doc! { "_id": oid }).await?;
        if result.deleted_count == 0 {
            return Err(KioskError::NotFound(format!("Entry {} not found", id)));
        }
        info!(entry = %oid, "Catalog entry deleted");
        Ok(())
    }

    async fn load(&self, oid: ObjectId) -> Result<ScriptDoc> {
        self.scripts
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| KioskError::NotFound(format!("Entry {} not found", oid)))
    }

    async fn notify(&self, embed: Embed) {
        notify_review(self.notifier.as_ref(), embed).await;
    }
}

/// Best-effort review notification. The state change is authoritative;
/// a failed notification is logged and swallowed.
async fn notify_review(notifier: &dyn NotificationSink, embed: Embed) {
    if let Err(e) = notifier.send(SinkKind::ScriptsReview, embed).await {
        warn!(error = %e, "Review notification failed, state change already persisted");
    }
}

fn parse_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| KioskError::NotFound(format!("Entry {} not found", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingSink;
    use crate::review::{new_entry, NewScriptRequest, ScriptFields};

    fn sample_entry() -> ScriptDoc {
        new_entry(
            "ada",
            "user-1",
            NewScriptRequest {
                version: "1.0.0".to_string(),
                hash: "aaaaaaa".to_string(),
                fields: ScriptFields {
                    name: "grabber".to_string(),
                    description: "Fetches things".to_string(),
                    url: "https://example.com/grabber".to_string(),
                    logo: None,
                    tags: vec![],
                },
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn failed_notification_is_swallowed() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let entry = sample_entry();

        // Completes without surfacing the sink error; the persisted state
        // change is authoritative
        notify_review(&sink, submission_embed(&entry, false)).await;
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn bad_object_id_maps_to_not_found() {
        assert!(matches!(
            parse_id("not-an-oid"),
            Err(KioskError::NotFound(_))
        ));
        let oid = ObjectId::new();
        assert_eq!(parse_id(&oid.to_hex()).unwrap(), oid);
    }

    // Service paths against MongoDB are covered by integration testing
    // with a running instance; the transitions themselves are exercised
    // in the review module's unit tests.
}
