//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling and a hand-routed
//! `(Method, path)` match over the API surface.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::catalog::CatalogService;
use crate::config::Args;
use crate::db::MongoClient;
use crate::notify::{NotificationSink, WebhookSink};
use crate::releases::ReleaseClient;
use crate::routes;
use crate::types::KioskError;

pub type BoxBody = http_body_util::combinators::UnsyncBoxBody<Bytes, std::io::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: Option<MongoClient>,
    /// Catalog service; absent in dev mode without a reachable store
    pub catalog: Option<Arc<CatalogService>>,
    /// GitHub release proxy client
    pub releases: Arc<ReleaseClient>,
    /// Webhook notification sink (forms + review notifications)
    pub notifier: Arc<dyn NotificationSink>,
    /// Process start, for the uptime reported by the health probes
    pub started_at: Instant,
}

impl AppState {
    /// Create AppState without a catalog store (dev mode only)
    pub fn new(args: Args) -> Self {
        let releases = Arc::new(ReleaseClient::from_args(&args));
        let notifier: Arc<dyn NotificationSink> = Arc::new(WebhookSink::from_args(&args));

        Self {
            args,
            mongo: None,
            catalog: None,
            releases,
            notifier,
            started_at: Instant::now(),
        }
    }

    /// Create AppState backed by MongoDB
    pub async fn with_store(args: Args, mongo: MongoClient) -> Result<Self, KioskError> {
        let releases = Arc::new(ReleaseClient::from_args(&args));
        let notifier: Arc<dyn NotificationSink> = Arc::new(WebhookSink::from_args(&args));
        let catalog = CatalogService::new(&mongo, Arc::clone(&notifier)).await?;

        Ok(Self {
            args,
            mongo: Some(mongo),
            catalog: Some(Arc::new(catalog)),
            releases,
            notifier,
            started_at: Instant::now(),
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), KioskError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "kiosk listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - moderator authentication relaxed");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe - returns 200 if kiosk is running
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)))
        }

        // Readiness probe - returns 200 only once the catalog store is reachable
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            to_boxed(routes::readiness_check(Arc::clone(&state)))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => to_boxed(routes::version_info()),

        // CORS preflight
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        // ====================================================================
        // Release proxy
        // ====================================================================

        // Trimmed release list for the changelog page
        (Method::GET, "/api/v1/releases") => {
            to_boxed(routes::handle_changelog(Arc::clone(&state)).await)
        }

        // Latest release metadata
        (Method::GET, "/api/v1/releases/latest") => {
            to_boxed(routes::handle_latest_release(Arc::clone(&state)).await)
        }

        // Streamed installer download, matched per OS
        (Method::GET, p) if p.starts_with("/api/v1/download/") => {
            let os = p.strip_prefix("/api/v1/download/").unwrap_or("");
            return Ok(routes::handle_download(Arc::clone(&state), os).await);
        }

        // ====================================================================
        // Script catalog
        // ====================================================================

        // Public browse (?author=&tag=&limit=&skip=)
        (Method::GET, "/api/v1/scripts") => {
            let query = req.uri().query().map(|q| q.to_string());
            to_boxed(
                routes::handle_list_scripts(Arc::clone(&state), query.as_deref(), req.headers())
                    .await,
            )
        }

        // New submission (authenticated)
        (Method::POST, "/api/v1/scripts") => {
            return Ok(to_boxed(
                routes::handle_submit_script(req, Arc::clone(&state)).await,
            ));
        }

        // Fetch one entry
        (Method::GET, p) if p.starts_with("/api/v1/scripts/") => {
            let id = p.strip_prefix("/api/v1/scripts/").unwrap_or("");
            to_boxed(routes::handle_get_script(Arc::clone(&state), id).await)
        }

        // Submitter edit (authenticated, owner only)
        (Method::PUT, p) if p.starts_with("/api/v1/scripts/") => {
            let id = p.strip_prefix("/api/v1/scripts/").unwrap_or("").to_string();
            return Ok(to_boxed(
                routes::handle_edit_script(req, Arc::clone(&state), &id).await,
            ));
        }

        // Row delete (moderator)
        (Method::DELETE, p) if p.starts_with("/api/v1/scripts/") => {
            let id = p.strip_prefix("/api/v1/scripts/").unwrap_or("");
            to_boxed(routes::handle_delete_script(Arc::clone(&state), req.headers(), id).await)
        }

        // ====================================================================
        // Moderation
        // ====================================================================

        // Entries awaiting review (moderator)
        (Method::GET, "/api/v1/review/queue") => {
            to_boxed(routes::handle_review_queue(Arc::clone(&state), req.headers()).await)
        }

        // Review decisions: /api/v1/review/{id}/accept|deny|request-changes
        (Method::POST, p) if p.starts_with("/api/v1/review/") => {
            let remainder = p.strip_prefix("/api/v1/review/").unwrap_or("").to_string();
            return Ok(to_boxed(
                routes::handle_review_decision(req, Arc::clone(&state), &remainder).await,
            ));
        }

        // ====================================================================
        // Form forwarding
        // ====================================================================

        // 202 regardless of sink outcome (fire-and-forget)
        (Method::POST, p) if p.starts_with("/api/v1/forms/") => {
            let kind = p.strip_prefix("/api/v1/forms/").unwrap_or("").to_string();
            return Ok(to_boxed(
                routes::handle_form(req, Arc::clone(&state), &kind).await,
            ));
        }

        // Not found
        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

/// Convert a Full<Bytes> body to BoxBody
pub fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed_unsync())
}

/// JSON response with CORS header
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(value)
        .unwrap_or_else(|_| r#"{"error":"INTERNAL","message":"Serialization failed"}"#.to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// JSON error envelope from the error taxonomy
pub fn error_response(err: KioskError) -> Response<Full<Bytes>> {
    let status = err.status_code();
    let body = serde_json::json!({
        "error": err.error_code(),
        "message": err.to_string(),
    });

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "NOT_FOUND",
        "message": format!("No route for {}", path),
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
