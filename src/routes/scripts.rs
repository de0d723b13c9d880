//! Script catalog routes
//!
//! Public browse and fetch, authenticated submission and edit, and the
//! moderator-only row delete. Submitted entries stay hidden from public
//! browse until a version is accepted.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::HeaderMap;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::auth::{identity_from_headers, require_identity, require_moderator};
use crate::catalog::ListQuery;
use crate::db::schemas::{PendingCandidate, ScriptDoc, VersionStatus};
use crate::review::{EditRequest, NewScriptRequest};
use crate::routes::{catalog, read_json};
use crate::server::{error_response, json_response, AppState};
use crate::types::Result;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

/// API view of a catalog entry, with the ObjectId rendered as hex
#[derive(Serialize)]
pub struct ScriptView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub tags: Vec<String>,
    pub author: String,
    pub author_id: String,
    pub version: String,
    pub history: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingCandidate>,
    pub statuses: BTreeMap<String, VersionStatus>,
    pub pending_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<ScriptDoc> for ScriptView {
    fn from(doc: ScriptDoc) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()).unwrap_or_default(),
            name: doc.name,
            description: doc.description,
            url: doc.url,
            logo: doc.logo,
            tags: doc.tags,
            author: doc.author,
            author_id: doc.author_id,
            version: doc.version,
            history: doc.history,
            pending: doc.pending,
            statuses: doc.statuses,
            pending_review: doc.pending_review,
            review_feedback: doc.review_feedback,
            created_at: doc
                .metadata
                .created_at
                .and_then(|d| d.try_to_rfc3339_string().ok()),
            updated_at: doc
                .metadata
                .updated_at
                .and_then(|d| d.try_to_rfc3339_string().ok()),
        }
    }
}

/// Percent-decode one query value; undecodable input is used as-is
fn decode_value(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

fn parse_list_query(query: Option<&str>, headers: &HeaderMap) -> ListQuery {
    let mut list = ListQuery {
        limit: DEFAULT_PAGE_SIZE,
        ..Default::default()
    };

    for pair in query.unwrap_or("").split('&') {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next().unwrap_or("");
        let value = parts.next().unwrap_or("");
        if value.is_empty() {
            continue;
        }
        let value = decode_value(value);
        let value = value.as_str();
        match key {
            "author" => list.author_id = Some(value.to_string()),
            "tag" => list.tag = Some(value.to_string()),
            "limit" => {
                if let Ok(limit) = value.parse::<i64>() {
                    list.limit = limit.clamp(1, MAX_PAGE_SIZE);
                }
            }
            "skip" => {
                if let Ok(skip) = value.parse::<u64>() {
                    list.skip = skip;
                }
            }
            _ => {}
        }
    }

    // Authors browsing their own entries see unpublished ones too
    if let (Some(identity), Some(author)) = (identity_from_headers(headers), &list.author_id) {
        if identity.author_id == *author {
            list.include_unpublished = true;
        }
    }

    list
}

/// GET /api/v1/scripts
pub async fn handle_list_scripts(
    state: Arc<AppState>,
    query: Option<&str>,
    headers: &HeaderMap,
) -> Response<Full<Bytes>> {
    let result: Result<Vec<ScriptView>> = async {
        let service = catalog(&state)?;
        let entries = service.list(parse_list_query(query, headers)).await?;
        Ok(entries.into_iter().map(ScriptView::from).collect())
    }
    .await;

    match result {
        Ok(views) => json_response(StatusCode::OK, &views),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/scripts/{id}
pub async fn handle_get_script(state: Arc<AppState>, id: &str) -> Response<Full<Bytes>> {
    let result: Result<ScriptView> = async {
        let service = catalog(&state)?;
        Ok(ScriptView::from(service.get(id).await?))
    }
    .await;

    match result {
        Ok(view) => json_response(StatusCode::OK, &view),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/scripts
pub async fn handle_submit_script(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let result: Result<ScriptView> = async {
        let identity = require_identity(req.headers())?;
        let body: NewScriptRequest = read_json(req).await?;
        let service = catalog(&state)?;
        let entry = service
            .submit_new(&identity.author, &identity.author_id, body)
            .await?;
        Ok(ScriptView::from(entry))
    }
    .await;

    match result {
        Ok(view) => json_response(StatusCode::CREATED, &view),
        Err(e) => error_response(e),
    }
}

/// PUT /api/v1/scripts/{id}
pub async fn handle_edit_script(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<Full<Bytes>> {
    let result: Result<ScriptView> = async {
        let identity = require_identity(req.headers())?;
        let body: EditRequest = read_json(req).await?;
        let service = catalog(&state)?;
        let entry = service.submit_edit(&identity.author_id, id, body).await?;
        Ok(ScriptView::from(entry))
    }
    .await;

    match result {
        Ok(view) => json_response(StatusCode::OK, &view),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/scripts/{id}
pub async fn handle_delete_script(
    state: Arc<AppState>,
    headers: &HeaderMap,
    id: &str,
) -> Response<Full<Bytes>> {
    let result: Result<()> = async {
        require_moderator(&state.args, headers)?;
        let service = catalog(&state)?;
        service.delete(id).await
    }
    .await;

    match result {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "deleted": id })),
        Err(e) => error_response(e),
    }
}
