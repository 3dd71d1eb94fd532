// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera capture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  App Layer                   │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌──────────────────┐  ┌──────────────────┐ │
//! │  │  Camera          │  │ Virtual Camera   │ │
//! │  │  (GStreamer)     │  │ (pattern/still)  │ │
//! │  └──────────────────┘  └──────────────────┘ │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Stream manager, device backends and frame types

pub mod camera;
