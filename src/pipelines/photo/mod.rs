// SPDX-License-Identifier: MPL-2.0

//! Photo pipeline
//!
//! ```text
//! PreviewSink → FrameCapturer → off-screen raster → JPEG → data URL
//!      ↓
//! Preview continues uninterrupted
//! ```

pub mod capture;
pub mod encoding;

pub use capture::{CapturedImage, FrameCapturer};
pub use encoding::{PhotoEncoder, decode_data_url, jpeg_data_url};
