// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use crate::constants::camera::{IDEAL_HEIGHT, IDEAL_WIDTH};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Real device through a GStreamer pipeline
    #[default]
    GStreamer,
    /// Generated test pattern or still image
    Virtual,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::GStreamer => write!(f, "GStreamer"),
            CameraBackendType::Virtual => write!(f, "virtual"),
        }
    }
}

/// Which way the camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Towards the guest (selfie camera)
    #[default]
    User,
    /// Away from the guest
    Environment,
}

/// What the manager asks the platform for when opening a stream
///
/// Width and height are hints; backends may deliver a different size and
/// the frame capturer always reads the dimensions off the frame itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
    /// Photobooth streams never carry audio
    pub audio: bool,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            ideal_width: IDEAL_WIDTH,
            ideal_height: IDEAL_HEIGHT,
            facing: FacingMode::User,
            audio: false,
        }
    }
}

/// A single RGBA preview frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Tightly or loosely packed RGBA rows, see `stride`
    pub data: Arc<[u8]>,
    /// Bytes per row, may include padding
    pub stride: u32,
    /// Timestamp when the frame arrived (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA pixels
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data),
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// True when the buffer actually holds `height` rows of `stride` bytes
    pub fn is_complete(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.stride >= self.width * 4
            && self.data.len() >= (self.stride as usize) * (self.height as usize)
    }

    /// RGB value of a pixel, clamped to the frame bounds
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let idx = (y * self.stride + x * 4) as usize;
        if idx + 2 < self.data.len() {
            (self.data[idx], self.data[idx + 1], self.data[idx + 2])
        } else {
            (0, 0, 0)
        }
    }
}

/// Live preview sink a running stream is bound to
///
/// Backends publish every decoded frame here; the terminal preview and the
/// frame capturer read the latest one. Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct PreviewSink {
    latest: Arc<Mutex<Option<Arc<CameraFrame>>>>,
}

impl PreviewSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<CameraFrame>>> {
        // A panicking publisher must not take the preview down with it
        self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the visible frame
    pub fn publish(&self, frame: CameraFrame) {
        *self.slot() = Some(Arc::new(frame));
    }

    /// Latest visible frame, if the stream produced one
    pub fn current(&self) -> Option<Arc<CameraFrame>> {
        self.slot().clone()
    }

    /// Detach whatever was shown (stream stopped)
    pub fn clear(&self) {
        *self.slot() = None;
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Backend errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// User or platform refused camera access
    PermissionDenied(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Pipeline could not be built or started
    InitializationFailed(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<BackendError> for crate::errors::CameraError {
    fn from(err: BackendError) -> Self {
        crate::errors::CameraError::Unavailable(err.to_string())
    }
}
