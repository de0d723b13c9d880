//! kiosk - edge API gateway for the Skiff desktop-app distribution platform
//!
//! kiosk backs the Skiff website with a small HTTP API:
//!
//! - **Releases**: proxies GitHub release metadata and streams per-OS
//!   installer downloads
//! - **Catalog**: a community catalog of user-submitted scripts with a
//!   per-version moderation workflow (pending, accepted, denied,
//!   changes-requested)
//! - **Forms**: forwards marketing-form submissions to chat webhooks
//!
//! Storage is MongoDB; webhook and release calls are best-effort
//! request/response with no retries.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod notify;
pub mod releases;
pub mod review;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{KioskError, Result};
