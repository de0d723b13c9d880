//! HTTP routes for kiosk

pub mod forms;
pub mod health;
pub mod releases;
pub mod review;
pub mod scripts;

pub use forms::handle_form;
pub use health::{health_check, readiness_check, version_info};
pub use releases::{handle_changelog, handle_download, handle_latest_release};
pub use review::{handle_review_decision, handle_review_queue};
pub use scripts::{
    handle_delete_script, handle_edit_script, handle_get_script, handle_list_scripts,
    handle_submit_script,
};

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::Request;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::catalog::CatalogService;
use crate::server::AppState;
use crate::types::{KioskError, Result};

/// Catalog service accessor; absent only in dev mode without MongoDB
pub(crate) fn catalog(state: &AppState) -> Result<Arc<CatalogService>> {
    state
        .catalog
        .clone()
        .ok_or_else(|| KioskError::Database("Catalog store unavailable".to_string()))
}

/// Collect and parse a JSON request body
pub(crate) async fn read_json<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| KioskError::Http(format!("Failed to read request body: {}", e)))?
        .to_bytes();

    serde_json::from_slice(&body)
        .map_err(|e| KioskError::Validation(format!("Invalid JSON body: {}", e)))
}

/// Collect a JSON request body, treating an absent body as the default.
/// A present but malformed body is still a validation error.
pub(crate) async fn read_json_or_default<T: DeserializeOwned + Default>(
    req: Request<Incoming>,
) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| KioskError::Http(format!("Failed to read request body: {}", e)))?
        .to_bytes();

    parse_json_or_default(&body)
}

fn parse_json_or_default<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| KioskError::Validation(format!("Invalid JSON body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default)]
    struct Feedback {
        #[serde(default)]
        feedback: Option<String>,
    }

    #[test]
    fn empty_body_parses_as_default() {
        let parsed: Feedback = parse_json_or_default(b"").unwrap();
        assert!(parsed.feedback.is_none());

        let parsed: Feedback = parse_json_or_default(b"  \n").unwrap();
        assert!(parsed.feedback.is_none());
    }

    #[test]
    fn malformed_body_is_rejected() {
        let err = parse_json_or_default::<Feedback>(b"{not json").unwrap_err();
        assert!(matches!(err, KioskError::Validation(_)));
    }

    #[test]
    fn present_body_parses() {
        let parsed: Feedback = parse_json_or_default(br#"{"feedback":"fix X"}"#).unwrap();
        assert_eq!(parsed.feedback.as_deref(), Some("fix X"));
    }
}
