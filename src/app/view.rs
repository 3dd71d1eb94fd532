// SPDX-License-Identifier: GPL-3.0-only

//! Kiosk display state
//!
//! Folds [`CaptureEvent`]s into what the capture screen shows: readiness
//! badge, countdown, flash overlay, chances used and which buttons are live.

use super::state::{AttemptKind, CaptureEvent};
use crate::constants::{CHANCES_TOTAL, SHOTS_TOTAL, messages};
use crate::pipelines::photo::CapturedImage;

#[derive(Debug, Clone, Default)]
pub struct KioskView {
    /// Shot sequence shown under the preview
    pub shots: Vec<CapturedImage>,
    pub camera_ready: bool,
    pub opening_camera: bool,
    pub loading_existing: bool,
    pub capturing: bool,
    pub saving: bool,
    /// Shot currently counting down, 1-based
    pub active_shot: Option<u8>,
    pub countdown: Option<u8>,
    pub flash: bool,
    pub has_completed_first_try: bool,
    pub has_used_redo: bool,
    /// The last redo aborted; its partial shots no longer gate a retry
    pub redo_failed: bool,
    pub status: Option<String>,
    pub error: Option<String>,
    /// The flow has moved past this screen
    pub advanced: bool,
}

impl KioskView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &CaptureEvent) {
        match event {
            CaptureEvent::LoadingExisting => self.loading_existing = true,
            CaptureEvent::ExistingLoaded(shots) => {
                self.loading_existing = false;
                if !shots.is_empty() {
                    self.shots = shots.clone();
                }
            }
            CaptureEvent::CameraOpening => {
                self.opening_camera = true;
                self.error = None;
            }
            CaptureEvent::CameraReady => {
                self.opening_camera = false;
                self.camera_ready = true;
            }
            CaptureEvent::CameraFailed | CaptureEvent::CameraReleased => {
                self.opening_camera = false;
                self.camera_ready = false;
            }
            CaptureEvent::AttemptStarted(kind) => {
                if *kind == AttemptKind::Redo {
                    self.redo_failed = false;
                }
                self.error = None;
                self.status = None;
                self.capturing = true;
            }
            CaptureEvent::PreviewCleared => self.shots.clear(),
            CaptureEvent::Countdown { shot, remaining } => {
                self.active_shot = Some(*shot);
                self.countdown = Some(*remaining);
                self.status = Some(format!("Shot {} in {}...", shot, remaining));
            }
            CaptureEvent::FlashOn => {
                self.countdown = None;
                self.flash = true;
            }
            CaptureEvent::FlashOff => self.flash = false,
            CaptureEvent::ShotCaptured(image) => {
                if image.shot == 1 {
                    self.shots.clear();
                }
                self.shots.push(image.clone());
                self.status = Some(format!("Captured {} of {}...", image.shot, SHOTS_TOTAL));
            }
            CaptureEvent::Saving(_) => self.saving = true,
            CaptureEvent::AttemptCommitted(kind) => {
                match kind {
                    AttemptKind::First => self.has_completed_first_try = true,
                    AttemptKind::Redo => self.has_used_redo = true,
                }
                self.end_attempt();
            }
            CaptureEvent::AttemptFailed { kind, .. } => {
                if *kind == AttemptKind::Redo {
                    self.redo_failed = true;
                }
                self.end_attempt();
            }
            CaptureEvent::Status(message) => self.status = Some((*message).to_string()),
            CaptureEvent::Error(message) => self.error = Some((*message).to_string()),
            CaptureEvent::FlowAdvance => self.advanced = true,
        }
    }

    fn end_attempt(&mut self) {
        self.active_shot = None;
        self.countdown = None;
        self.flash = false;
        self.saving = false;
        self.capturing = false;
    }

    /// Badge text over the preview
    pub fn readiness(&self) -> String {
        if !self.camera_ready {
            messages::WAITING_FOR_CAMERA.to_string()
        } else if self.shots.len() >= SHOTS_TOTAL {
            messages::ALL_CAPTURED.to_string()
        } else if self.capturing {
            format!(
                "Capturing shot {} of {}",
                self.active_shot.unwrap_or(1),
                SHOTS_TOTAL
            )
        } else {
            messages::READY.to_string()
        }
    }

    pub fn chances_used(&self) -> String {
        let used = usize::from(self.has_completed_first_try) + usize::from(self.has_used_redo);
        format!("{} of {}", used, CHANCES_TOTAL)
    }

    pub fn can_start(&self) -> bool {
        !(self.capturing || self.saving || self.has_completed_first_try)
    }

    pub fn can_redo(&self) -> bool {
        self.has_completed_first_try
            && !self.has_used_redo
            && self.camera_ready
            && !self.capturing
            && !self.saving
            && (self.shots.len() >= SHOTS_TOTAL || self.redo_failed)
    }
}
