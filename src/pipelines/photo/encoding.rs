// SPDX-License-Identifier: GPL-3.0-only

//! Still encoding
//!
//! Shots are stored as lossy JPEG and referenced from the session record as
//! `data:` URLs, the same shape a browser canvas produces.

use crate::constants::encoding::{JPEG_MIME, JPEG_QUALITY};
use crate::errors::{PhotoError, StorageError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbImage;
use tracing::debug;

/// JPEG encoder with a fixed quality
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    quality: u8,
}

impl PhotoEncoder {
    /// Encoder at the kiosk's standard quality
    pub fn new() -> Self {
        Self {
            quality: JPEG_QUALITY,
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode an RGB raster as JPEG
    pub fn encode_jpeg(&self, image: &RgbImage) -> Result<Vec<u8>, PhotoError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, self.quality);
        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| PhotoError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

        debug!(
            size = buffer.len(),
            width = image.width(),
            height = image.height(),
            "JPEG encoded"
        );
        Ok(buffer)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap JPEG bytes in a `data:image/jpeg;base64,` URL
pub fn jpeg_data_url(jpeg: &[u8]) -> String {
    format!("data:{};base64,{}", JPEG_MIME, STANDARD.encode(jpeg))
}

/// Decode the payload of a base64 image data URL
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, StorageError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| StorageError::InvalidImage("not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| StorageError::InvalidImage("data URL has no payload".to_string()))?;

    if !header.starts_with("image/") || !header.ends_with(";base64") {
        return Err(StorageError::InvalidImage(format!(
            "unsupported data URL header '{}'",
            header
        )));
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| StorageError::InvalidImage(e.to_string()))
}
