// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer camera backend
//!
//! Opens the webcam with a short launch pipeline that converts whatever the
//! device produces into RGBA at the requested size, and publishes every
//! sample from the appsink into the preview sink.

use super::CameraBackend;
use super::types::*;
use crate::constants::pipeline as tuning;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A pipeline that is currently playing
struct RunningPipeline {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
}

impl RunningPipeline {
    /// Detach callbacks and drop the pipeline to NULL so the device is freed
    fn shutdown(&self) -> BackendResult<()> {
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());

        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| BackendError::Other(format!("Failed to stop pipeline: {}", e)))?;

        let (result, state, _) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(tuning::STOP_TIMEOUT_SECS));
        match result {
            Ok(_) => debug!(state = ?state, "Pipeline stopped"),
            Err(e) => debug!(error = ?e, state = ?state, "Pipeline state change had issues"),
        }
        Ok(())
    }
}

/// Webcam backend built on a GStreamer launch pipeline
pub struct GStreamerBackend {
    /// V4L2 device path; `None` lets `autovideosrc` pick
    device_path: Option<String>,
    running: Option<RunningPipeline>,
}

impl GStreamerBackend {
    pub fn new(device_path: Option<String>) -> Self {
        Self {
            device_path,
            running: None,
        }
    }
}

/// Launch description for a request
///
/// The device is converted and scaled to the ideal size so the preview and
/// the captured stills always share the same dimensions.
pub fn pipeline_description(device_path: Option<&str>, request: &StreamRequest) -> String {
    let source = match device_path {
        Some(path) => format!("v4l2src device={}", path),
        None => "autovideosrc".to_string(),
    };

    format!(
        "{source} ! videoconvert ! videoscale ! \
         video/x-raw,format=RGBA,width={w},height={h},pixel-aspect-ratio=1/1 ! \
         appsink name=sink",
        w = request.ideal_width,
        h = request.ideal_height,
    )
}

/// Map the first error on the pipeline bus to a backend error
fn bus_error(pipeline: &gstreamer::Pipeline) -> Option<BackendError> {
    let bus = pipeline.bus()?;
    let msg = bus.pop_filtered(&[gstreamer::MessageType::Error])?;
    let gstreamer::MessageView::Error(err) = msg.view() else {
        return None;
    };

    let cause = err.error();
    let detail = format!("{} ({:?})", cause, err.debug());

    let mapped = if cause.matches(gstreamer::ResourceError::OpenRead)
        || cause.matches(gstreamer::ResourceError::OpenReadWrite)
    {
        BackendError::PermissionDenied(detail)
    } else if cause.matches(gstreamer::ResourceError::NotFound) {
        BackendError::DeviceNotFound(detail)
    } else {
        BackendError::InitializationFailed(detail)
    };
    Some(mapped)
}

impl CameraBackend for GStreamerBackend {
    fn start(&mut self, request: &StreamRequest, sink: PreviewSink) -> BackendResult<()> {
        if self.running.is_some() {
            return Ok(());
        }

        gstreamer::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        if request.facing != FacingMode::User {
            // Desktop webcams carry no facing metadata; the hint is advisory
            debug!(facing = ?request.facing, "Facing hint ignored by GStreamer backend");
        }

        let description = pipeline_description(self.device_path.as_deref(), request);
        info!(pipeline = %description, "Creating camera pipeline");

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| BackendError::InitializationFailed("Launch result is not a pipeline".into()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to get appsink".to_string()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| BackendError::InitializationFailed("Failed to cast appsink".to_string()))?;

        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", tuning::MAX_BUFFERS);
        appsink.set_property("drop", true);

        let frame_counter = Arc::new(AtomicU64::new(0));
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_num = frame_counter.fetch_add(1, Ordering::Relaxed);

                    let sample = appsink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    let caps = sample.caps().ok_or(gstreamer::FlowError::Error)?;
                    let video_info = VideoInfo::from_caps(caps).map_err(|e| {
                        error!(frame = frame_num, error = ?e, "Failed to get video info");
                        gstreamer::FlowError::Error
                    })?;
                    let map = buffer.map_readable().map_err(|e| {
                        error!(frame = frame_num, error = ?e, "Failed to map buffer");
                        gstreamer::FlowError::Error
                    })?;

                    if frame_num % tuning::FRAME_LOG_INTERVAL == 0 {
                        debug!(
                            frame = frame_num,
                            width = video_info.width(),
                            height = video_info.height(),
                            "Preview frame"
                        );
                    }

                    sink.publish(CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        data: Arc::from(map.as_slice()),
                        stride: video_info.stride()[0] as u32,
                        captured_at: Instant::now(),
                    });

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        let running = RunningPipeline { pipeline, appsink };

        if let Err(e) = running.pipeline.set_state(gstreamer::State::Playing) {
            let err = bus_error(&running.pipeline)
                .unwrap_or_else(|| BackendError::InitializationFailed(e.to_string()));
            let _ = running.shutdown();
            return Err(err);
        }

        let (result, state, _) = running
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(tuning::START_TIMEOUT_SECS));
        if let Err(e) = result {
            let err = bus_error(&running.pipeline)
                .unwrap_or_else(|| BackendError::InitializationFailed(e.to_string()));
            let _ = running.shutdown();
            return Err(err);
        }
        if state != gstreamer::State::Playing {
            warn!(state = ?state, "Pipeline is not in PLAYING state yet");
        }

        self.running = Some(running);
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        match self.running.take() {
            Some(running) => {
                info!("Stopping camera pipeline");
                running.shutdown()
            }
            None => Ok(()),
        }
    }

    fn is_streaming(&self) -> bool {
        self.running.is_some()
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::GStreamer
    }

    fn describe(&self) -> String {
        self.device_path
            .clone()
            .unwrap_or_else(|| "default camera".to_string())
    }
}

impl Drop for GStreamerBackend {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            info!("Dropping camera pipeline - explicitly stopping");
            let _ = running.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_description_defaults_to_autovideosrc() {
        let desc = pipeline_description(None, &StreamRequest::default());
        assert!(desc.starts_with("autovideosrc !"));
        assert!(desc.contains("format=RGBA,width=640,height=480"));
        assert!(desc.ends_with("appsink name=sink"));
    }

    #[test]
    fn test_pipeline_description_uses_configured_device() {
        let desc = pipeline_description(Some("/dev/video2"), &StreamRequest::default());
        assert!(desc.starts_with("v4l2src device=/dev/video2 !"));
    }

    #[test]
    fn test_unstarted_backend_stops_cleanly() {
        let mut backend = GStreamerBackend::new(None);
        assert!(!backend.is_streaming());
        assert!(backend.stop().is_ok());
        assert_eq!(backend.describe(), "default camera");
    }
}
