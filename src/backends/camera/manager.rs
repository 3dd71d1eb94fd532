// SPDX-License-Identifier: GPL-3.0-only

//! Camera stream lifecycle manager
//!
//! The manager provides:
//! - Idempotent acquisition (a held stream is never requested twice)
//! - Idempotent release, safe with nothing held
//! - Release on drop, so every exit path of the owning screen gives the
//!   device back
//!
//! Opening a device can block for seconds (permission prompts, pipeline
//! negotiation), so the backend is moved onto the blocking pool while it
//! starts. If the acquiring future is dropped halfway, the backend is dropped
//! on that thread and its own `Drop` stops whatever it opened.

use super::CameraBackend;
use super::types::*;
use crate::errors::CameraError;
use tracing::{debug, info, warn};

/// Owns the one device stream a capture screen may hold
pub struct CameraStreamManager {
    /// `None` only while a start is in flight on the blocking pool
    backend: Option<Box<dyn CameraBackend>>,
    backend_type: CameraBackendType,
    device: String,
    request: StreamRequest,
    preview: PreviewSink,
    held: bool,
}

impl CameraStreamManager {
    /// Create a manager around a backend; nothing is opened yet
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        Self::with_request(backend, StreamRequest::default())
    }

    pub fn with_request(backend: Box<dyn CameraBackend>, request: StreamRequest) -> Self {
        info!(
            backend = %backend.backend_type(),
            device = %backend.describe(),
            "Creating camera stream manager"
        );

        Self {
            backend_type: backend.backend_type(),
            device: backend.describe(),
            backend: Some(backend),
            request,
            preview: PreviewSink::new(),
            held: false,
        }
    }

    /// Acquire the camera stream
    ///
    /// Returns immediately if a stream is already held. On failure the
    /// manager stays unheld and the caller may retry later.
    pub async fn acquire(&mut self) -> Result<(), CameraError> {
        if self.held {
            debug!("Camera stream already held");
            return Ok(());
        }

        let Some(mut backend) = self.backend.take() else {
            return Err(CameraError::Unavailable(
                "camera backend was lost during an earlier start".to_string(),
            ));
        };

        info!(
            width = self.request.ideal_width,
            height = self.request.ideal_height,
            facing = ?self.request.facing,
            "Requesting camera stream"
        );

        let request = self.request;
        let sink = self.preview.clone();
        let (backend, result) = tokio::task::spawn_blocking(move || {
            let result = backend.start(&request, sink);
            (backend, result)
        })
        .await
        .map_err(|e| CameraError::Unavailable(format!("camera start task failed: {}", e)))?;
        self.backend = Some(backend);

        match result {
            Ok(()) => {
                self.held = true;
                info!(device = %self.device, "Camera stream playing");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Could not start camera");
                self.preview.clear();
                Err(e.into())
            }
        }
    }

    /// Stop and detach the held stream; no-op when nothing is held
    pub fn release(&mut self) {
        if !self.held {
            return;
        }

        info!(device = %self.device, "Releasing camera stream");
        if let Some(backend) = self.backend.as_mut()
            && let Err(e) = backend.stop()
        {
            warn!(error = %e, "Camera did not stop cleanly");
        }
        self.held = false;
        self.preview.clear();
    }

    /// Whether a stream is currently held
    pub fn is_ready(&self) -> bool {
        self.held
    }

    pub fn backend_type(&self) -> CameraBackendType {
        self.backend_type
    }

    /// The live preview the stream is bound to
    pub fn preview(&self) -> &PreviewSink {
        &self.preview
    }
}

impl Drop for CameraStreamManager {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CameraStreamManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraStreamManager")
            .field("backend_type", &self.backend_type)
            .field("device", &self.device)
            .field("held", &self.held)
            .finish()
    }
}
