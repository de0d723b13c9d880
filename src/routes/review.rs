//! Moderation routes
//!
//! The review queue and the three decision entry points, all behind the
//! moderator key. Each decision loads the entry, applies the transition to
//! its active version, and persists the result as one write.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::HeaderMap;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::require_moderator;
use crate::review::Decision;
use crate::routes::scripts::ScriptView;
use crate::routes::{catalog, read_json_or_default};
use crate::server::{error_response, json_response, AppState};
use crate::types::{KioskError, Result};

#[derive(Deserialize, Default)]
struct DecisionBody {
    #[serde(default)]
    feedback: Option<String>,
}

/// GET /api/v1/review/queue
pub async fn handle_review_queue(
    state: Arc<AppState>,
    headers: &HeaderMap,
) -> Response<Full<Bytes>> {
    let result: Result<Vec<ScriptView>> = async {
        require_moderator(&state.args, headers)?;
        let service = catalog(&state)?;
        let entries = service.review_queue().await?;
        Ok(entries.into_iter().map(ScriptView::from).collect())
    }
    .await;

    match result {
        Ok(views) => json_response(StatusCode::OK, &views),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/review/{id}/accept|deny|request-changes
///
/// `remainder` is the path after the /api/v1/review/ prefix.
pub async fn handle_review_decision(
    req: Request<Incoming>,
    state: Arc<AppState>,
    remainder: &str,
) -> Response<Full<Bytes>> {
    let result: Result<ScriptView> = async {
        require_moderator(&state.args, req.headers())?;

        let mut parts = remainder.splitn(2, '/');
        let id = parts.next().unwrap_or("").to_string();
        let action = parts.next().unwrap_or("").to_string();

        let decision = match action.as_str() {
            "accept" => Decision::Accepted,
            "deny" => Decision::Denied,
            "request-changes" => Decision::ChangesRequested,
            other => {
                return Err(KioskError::Validation(format!(
                    "Unknown review action '{}'",
                    other
                )))
            }
        };

        // Empty body is fine for accept/deny; a malformed one is not
        let body: DecisionBody = read_json_or_default(req).await?;
        let feedback = body.feedback.filter(|f| !f.trim().is_empty());

        if decision == Decision::ChangesRequested && feedback.is_none() {
            return Err(KioskError::Validation(
                "Requesting changes requires feedback for the submitter".to_string(),
            ));
        }

        let service = catalog(&state)?;
        let entry = service.decide(&id, decision, feedback).await?;
        Ok(ScriptView::from(entry))
    }
    .await;

    match result {
        Ok(view) => json_response(StatusCode::OK, &view),
        Err(e) => error_response(e),
    }
}
