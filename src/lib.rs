// SPDX-License-Identifier: MPL-2.0

//! Photobooth - guided two-chance photo capture for kiosk sessions
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Capture controller, shot sequencer, session actor and view state
//! - [`backends`]: Camera stream management and device backends
//! - [`pipelines`]: Still capture and encoding
//! - [`storage`]: Shared session record persistence
//! - [`config`]: User configuration handling
//! - [`flash`]: Optional hardware flash LEDs
//! - [`terminal`]: Terminal kiosk front end

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod flash;
pub mod pipelines;
pub mod storage;
pub mod terminal;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use app::{AttemptKind, CaptureController, CaptureEvent, KioskView};
pub use config::{CameraSource, Config};
pub use errors::{AppError, AppResult, CaptureError};
pub use storage::{JsonFileGateway, PersistenceGateway, SessionRecord};
