// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! ```text
//! ┌──────────────────────┐
//! │  CaptureController   │
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ CameraStreamManager  │  ← one stream per screen, guaranteed release
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │  CameraBackend trait │  ← platform capability
//! └──────────┬───────────┘
//!            │
//!      ┌─────┴──────┐
//!      ▼            ▼
//! ┌─────────┐  ┌─────────┐
//! │GStreamer│  │ Virtual │
//! └─────────┘  └─────────┘
//! ```

pub mod manager;
pub mod types;
pub mod virtual_camera;
pub mod webcam;

pub use manager::CameraStreamManager;
pub use types::*;

use crate::config::CameraSource;

/// Platform camera capability
///
/// Backends only know how to open and close a device stream; idempotence,
/// the single-stream rule and release-on-drop live in [`CameraStreamManager`].
pub trait CameraBackend: Send {
    /// Request the device and start playback into `sink`
    ///
    /// # Returns
    /// * `Ok(())` - Stream is playing and frames are being published
    /// * `Err(BackendError::PermissionDenied)` - Access refused
    /// * `Err(BackendError)` - Any other device or pipeline failure
    fn start(&mut self, request: &StreamRequest, sink: PreviewSink) -> BackendResult<()>;

    /// Stop the device stream and release it
    fn stop(&mut self) -> BackendResult<()>;

    /// Whether a stream is currently playing
    fn is_streaming(&self) -> bool;

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Human-readable label for logs
    fn describe(&self) -> String;
}

/// Build the backend for a configured camera source
pub fn backend_for_source(source: &CameraSource) -> Box<dyn CameraBackend> {
    match source {
        CameraSource::Auto => Box::new(webcam::GStreamerBackend::new(None)),
        CameraSource::Device(path) => Box::new(webcam::GStreamerBackend::new(Some(path.clone()))),
        CameraSource::TestPattern => {
            Box::new(virtual_camera::VirtualCamera::new(virtual_camera::VirtualSource::TestPattern))
        }
        CameraSource::StillImage(path) => Box::new(virtual_camera::VirtualCamera::new(
            virtual_camera::VirtualSource::StillImage(path.clone()),
        )),
    }
}
