//! Marketing form forwarding
//!
//! POST /api/v1/forms/{kind} forwards a form submission to the matching
//! webhook sink and answers 202 regardless of the sink outcome. The
//! notification is advisory; nothing is persisted and nothing is retried.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::warn;

use crate::notify::{form_embed, SinkKind};
use crate::routes::read_json;
use crate::server::{error_response, json_response, AppState};
use crate::types::KioskError;

/// POST /api/v1/forms/{kind}
pub async fn handle_form(
    req: Request<Incoming>,
    state: Arc<AppState>,
    kind: &str,
) -> Response<Full<Bytes>> {
    let sink = match SinkKind::from_form_kind(kind) {
        Some(s) => s,
        None => {
            return error_response(KioskError::Validation(format!(
                "Unknown form kind '{}': expected beta-signup or featured-tool",
                kind
            )))
        }
    };

    let values: serde_json::Map<String, serde_json::Value> = match read_json(req).await {
        Ok(serde_json::Value::Object(map)) if !map.is_empty() => map,
        Ok(_) => {
            return error_response(KioskError::Validation(
                "Form body must be a non-empty JSON object".to_string(),
            ))
        }
        Err(e) => return error_response(e),
    };

    // Fire-and-forget: the caller gets 202 whatever the sink does
    let embed = form_embed(sink, &values);
    let notifier = Arc::clone(&state.notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.send(sink, embed).await {
            warn!(sink = sink.as_str(), error = %e, "Form forwarding failed");
        }
    });

    json_response(
        StatusCode::ACCEPTED,
        &serde_json::json!({ "status": "accepted" }),
    )
}
