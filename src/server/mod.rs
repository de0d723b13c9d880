//! HTTP server for kiosk

pub mod http;

pub use http::{error_response, json_response, run, to_boxed, AppState, BoxBody};
