//! Shared types for kiosk

mod error;

pub use error::{KioskError, Result};
