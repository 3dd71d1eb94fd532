// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backend
//!
//! Publishes a generated test pattern or a still image into the preview
//! sink so the kiosk can run on machines without a webcam.

use super::CameraBackend;
use super::types::*;
use crate::constants::{camera::VIRTUAL_FPS, file_formats};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What the virtual camera shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualSource {
    /// Moving colour bars
    TestPattern,
    /// A still image file, shown unchanged
    StillImage(PathBuf),
}

struct Worker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Synthetic camera
pub struct VirtualCamera {
    source: VirtualSource,
    worker: Option<Worker>,
}

impl VirtualCamera {
    pub fn new(source: VirtualSource) -> Self {
        Self {
            source,
            worker: None,
        }
    }
}

/// Load an image file as an RGBA frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !file_formats::is_image_extension(&extension) {
        return Err(BackendError::Other(format!(
            "Unsupported file format: {}",
            extension
        )));
    }

    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => {
            BackendError::DeviceNotFound(format!("'{}': {}", path.display(), io))
        }
        other => BackendError::Other(format!(
            "Failed to load image '{}': {}",
            path.display(),
            other
        )),
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(CameraFrame::from_rgba(width, height, rgba.into_raw()))
}

/// Colour bars with a bright band sweeping across, one step per frame
pub fn test_pattern_frame(width: u32, height: u32, frame_index: u64) -> CameraFrame {
    const BARS: [(u8, u8, u8); 7] = [
        (192, 192, 192),
        (192, 192, 0),
        (0, 192, 192),
        (0, 192, 0),
        (192, 0, 192),
        (192, 0, 0),
        (0, 0, 192),
    ];

    let width = width.max(1);
    let height = height.max(1);
    let band_x = (frame_index * 8 % width as u64) as u32;
    let mut data = Vec::with_capacity((width * height * 4) as usize);

    for _y in 0..height {
        for x in 0..width {
            let bar = BARS[(x as usize * BARS.len()) / width as usize];
            let (r, g, b) = if x.abs_diff(band_x) < 6 {
                (255, 255, 255)
            } else {
                bar
            };
            data.extend_from_slice(&[r, g, b, 255]);
        }
    }

    CameraFrame::from_rgba(width, height, data)
}

impl CameraBackend for VirtualCamera {
    fn start(&mut self, request: &StreamRequest, sink: PreviewSink) -> BackendResult<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        let (width, height) = (request.ideal_width, request.ideal_height);
        let still = match &self.source {
            VirtualSource::TestPattern => None,
            VirtualSource::StillImage(path) => Some(load_image_as_frame(path)?),
        };

        // The first frame is visible before start returns
        match &still {
            Some(frame) => sink.publish(frame.clone()),
            None => sink.publish(test_pattern_frame(width, height, 0)),
        }

        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let interval = Duration::from_millis(1000 / VIRTUAL_FPS);

        let handle = std::thread::Builder::new()
            .name("virtual-camera".to_string())
            .spawn(move || {
                let mut frame_index = 1u64;
                while !worker_stop.load(Ordering::Relaxed) {
                    std::thread::sleep(interval);
                    let frame = match &still {
                        Some(frame) => CameraFrame {
                            captured_at: Instant::now(),
                            ..frame.clone()
                        },
                        None => test_pattern_frame(width, height, frame_index),
                    };
                    sink.publish(frame);
                    frame_index += 1;
                }
                debug!(frames = frame_index, "Virtual camera worker finished");
            })
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        info!(source = ?self.source, width, height, "Virtual camera started");
        self.worker = Some(Worker { stop, handle });
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        worker.stop.store(true, Ordering::Relaxed);
        if worker.handle.join().is_err() {
            warn!("Virtual camera worker panicked");
            return Err(BackendError::Other("virtual camera worker panicked".into()));
        }
        info!("Virtual camera stopped");
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.worker.is_some()
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }

    fn describe(&self) -> String {
        match &self.source {
            VirtualSource::TestPattern => "test pattern".to_string(),
            VirtualSource::StillImage(path) => path.display().to_string(),
        }
    }
}

impl Drop for VirtualCamera {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
