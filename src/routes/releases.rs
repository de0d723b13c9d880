//! Release proxy routes
//!
//! Changelog data, latest-release metadata, and the per-OS installer
//! download. The download proxies the matched asset's bytes frame by frame
//! with Content-Disposition set to the asset filename.

use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::{Response, StatusCode};
use std::sync::Arc;

use crate::releases::{match_asset, ChangelogEntry, TargetOs};
use crate::server::{error_response, json_response, to_boxed, AppState, BoxBody};
use crate::types::{KioskError, Result};

/// GET /api/v1/releases
pub async fn handle_changelog(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let result: Result<Vec<ChangelogEntry>> = async {
        let releases = state.releases.list_releases().await?;
        Ok(releases.into_iter().map(ChangelogEntry::from).collect())
    }
    .await;

    match result {
        Ok(entries) => json_response(StatusCode::OK, &entries),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/releases/latest
pub async fn handle_latest_release(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let result: Result<ChangelogEntry> = async {
        let release = state.releases.latest().await?;
        Ok(ChangelogEntry::from(release))
    }
    .await;

    match result {
        Ok(entry) => json_response(StatusCode::OK, &entry),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/download/{os}
///
/// Streams the matched installer back to the caller. Upstream failures
/// surface as proxy errors; there are no retries.
pub async fn handle_download(state: Arc<AppState>, os: &str) -> Response<BoxBody> {
    let result: Result<Response<BoxBody>> = async {
        let os: TargetOs = os.parse()?;
        let release = state.releases.latest().await?;

        let asset = match_asset(&release.assets, os).cloned().ok_or_else(|| {
            KioskError::NotFound(format!(
                "No {} installer in release {}",
                os.as_str(),
                release.tag_name
            ))
        })?;

        let upstream = state.releases.download(&asset).await?;
        let content_length = upstream.content_length().or(asset.size);

        let stream = upstream
            .bytes_stream()
            .map_ok(hyper::body::Frame::data)
            .map_err(std::io::Error::other);
        let body = BodyExt::boxed_unsync(StreamBody::new(stream));

        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/octet-stream")
            .header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", asset.name),
            )
            .header("Access-Control-Allow-Origin", "*");
        if let Some(length) = content_length {
            builder = builder.header("Content-Length", length);
        }

        builder
            .body(body)
            .map_err(|e| KioskError::Internal(e.to_string()))
    }
    .await;

    match result {
        Ok(response) => response,
        Err(e) => to_boxed(error_response(e)),
    }
}
