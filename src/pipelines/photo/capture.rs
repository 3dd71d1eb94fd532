// SPDX-License-Identifier: MPL-2.0

//! Still capture from the live preview
//!
//! Grabs whatever frame the preview is showing right now, renders it into an
//! off-screen raster at the visible size and encodes it. Nothing here touches
//! controller state.

use super::encoding::{PhotoEncoder, jpeg_data_url};
use crate::backends::camera::types::{CameraFrame, PreviewSink};
use crate::constants::camera::{IDEAL_HEIGHT, IDEAL_WIDTH};
use crate::errors::PhotoError;
use image::{Rgb, RgbImage};
use std::sync::Arc;
use tracing::{debug, info};

/// One encoded shot of an attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// Position within the attempt, 1-based
    pub shot: u8,
    pub width: u32,
    pub height: u32,
    /// JPEG bytes
    pub jpeg: Arc<[u8]>,
}

impl CapturedImage {
    /// Image reference as stored in the session record
    pub fn to_data_url(&self) -> String {
        jpeg_data_url(&self.jpeg)
    }
}

/// Frame capturer
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCapturer {
    encoder: PhotoEncoder,
}

impl FrameCapturer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current preview frame as shot `shot`
    ///
    /// # Returns
    /// * `Ok(CapturedImage)` - Encoded still
    /// * `Err(PhotoError::NoFrameAvailable)` - Preview has nothing to show
    pub async fn capture(
        &self,
        preview: &PreviewSink,
        shot: u8,
    ) -> Result<CapturedImage, PhotoError> {
        let frame = preview.current().ok_or(PhotoError::NoFrameAvailable)?;
        let (width, height) = visible_dimensions(&frame);

        info!(shot, width, height, "Capturing still from preview");

        let encoder = self.encoder;
        let jpeg = tokio::task::spawn_blocking(move || {
            let raster = render_raster(&frame, width, height);
            encoder.encode_jpeg(&raster)
        })
        .await
        .map_err(|e| PhotoError::EncodingFailed(format!("Encoding task error: {}", e)))??;

        debug!(shot, size = jpeg.len(), "Still encoded");

        Ok(CapturedImage {
            shot,
            width,
            height,
            jpeg: Arc::from(jpeg),
        })
    }
}

/// Size the frame is shown at, or the ideal size when it reports none
fn visible_dimensions(frame: &CameraFrame) -> (u32, u32) {
    if frame.width == 0 || frame.height == 0 {
        (IDEAL_WIDTH, IDEAL_HEIGHT)
    } else {
        (frame.width, frame.height)
    }
}

/// Draw the frame into a `width`×`height` RGB raster (nearest neighbour)
///
/// Areas the frame cannot cover stay black, like drawing an unready video
/// onto a canvas.
fn render_raster(frame: &CameraFrame, width: u32, height: u32) -> RgbImage {
    if frame.width == 0 || frame.height == 0 {
        return RgbImage::new(width, height);
    }

    RgbImage::from_fn(width, height, |x, y| {
        let src_x = (x as u64 * frame.width as u64 / width as u64) as u32;
        let src_y = (y as u64 * frame.height as u64 / height as u64) as u32;
        let (r, g, b) = frame.rgb_at(src_x, src_y);
        Rgb([r, g, b])
    })
}
