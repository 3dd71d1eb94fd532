// SPDX-License-Identifier: GPL-3.0-only

//! Capture session controller
//!
//! Runs the two-chance photo interaction for one screen:
//!
//! ```text
//! load_existing ──► ensure_camera ──► run_attempt(First) ──► run_attempt(Redo) ──► FlowAdvance
//!                                          │    ▲                  │    ▲
//!                                          └────┘ (failed: retry)  └────┘
//! ```
//!
//! Each attempt runs the shot sequence three times, captures on every
//! shot-ready signal and saves all three shots at once. Only a successful
//! save moves the attempt flags forward.

use super::sequencer::{ShotPhase, ShotTimings, shot_sequence};
use super::state::{
    AttemptKind, AttemptOutcome, CaptureAttempt, CaptureEvent, ControllerPhase,
    SessionCaptureState,
};
use crate::backends::camera::{CameraStreamManager, PreviewSink};
use crate::constants::{SHOTS_TOTAL, messages};
use crate::errors::{CaptureError, PhotoError, RejectReason};
use crate::pipelines::photo::{CapturedImage, FrameCapturer};
use crate::storage::{PersistenceGateway, PhotoboothPatch, SessionRecord};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Owns the camera, the store and the session state of one capture screen
pub struct CaptureController<G: PersistenceGateway> {
    camera: CameraStreamManager,
    gateway: G,
    capturer: FrameCapturer,
    timings: ShotTimings,
    state: SessionCaptureState,
    events: UnboundedSender<CaptureEvent>,
}

impl<G: PersistenceGateway> CaptureController<G> {
    pub fn new(
        camera: CameraStreamManager,
        gateway: G,
        events: UnboundedSender<CaptureEvent>,
    ) -> Self {
        Self {
            camera,
            gateway,
            capturer: FrameCapturer::new(),
            timings: ShotTimings::default(),
            state: SessionCaptureState::default(),
            events,
        }
    }

    pub fn with_timings(mut self, timings: ShotTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn state(&self) -> &SessionCaptureState {
        &self.state
    }

    /// Live preview the camera publishes into
    pub fn preview(&self) -> PreviewSink {
        self.camera.preview().clone()
    }

    /// Sender for the controller's event channel
    pub fn events(&self) -> UnboundedSender<CaptureEvent> {
        self.events.clone()
    }

    fn emit(&self, event: CaptureEvent) {
        // The screen may already be gone; events are display-only
        let _ = self.events.send(event);
    }

    fn reject(&self, reason: RejectReason) -> Result<(), CaptureError> {
        info!(?reason, "Capture trigger rejected");
        self.emit(CaptureEvent::Status(reason.user_message()));
        Err(reason.into())
    }

    /// Recover previously saved shots into the on-screen sequence
    ///
    /// Never fails: a broken store or an undecodable slot just means fewer
    /// (or no) shots are shown.
    pub async fn load_existing(&mut self) {
        self.emit(CaptureEvent::LoadingExisting);

        let shots = match self.gateway.load().await {
            Ok(Some(record)) => shots_from_record(&record),
            Ok(None) => Vec::new(),
            Err(e) => {
                let error = CaptureError::LoadFailure(e);
                warn!(%error, "Could not load previous photobooth data");
                self.emit(CaptureEvent::Status(error.user_message()));
                Vec::new()
            }
        };

        info!(count = shots.len(), "Loaded existing shots");
        if !shots.is_empty() {
            self.state.existing_shots = shots.clone();
        }
        self.emit(CaptureEvent::ExistingLoaded(shots));
    }

    /// Acquire the camera if it is not held yet
    pub async fn ensure_camera(&mut self) -> Result<(), CaptureError> {
        if self.camera.is_ready() {
            self.state.camera_ready = true;
            return Ok(());
        }

        self.state.awaiting_camera = true;
        self.emit(CaptureEvent::CameraOpening);
        let result = self.camera.acquire().await;
        self.state.awaiting_camera = false;

        match result {
            Ok(()) => {
                info!(backend = %self.camera.backend_type(), "Camera ready");
                self.state.camera_ready = true;
                self.emit(CaptureEvent::CameraReady);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Camera unavailable");
                self.state.camera_ready = false;
                self.emit(CaptureEvent::CameraFailed);
                self.emit(CaptureEvent::Error(messages::CAMERA_FAILED));
                Err(CaptureError::CameraUnavailable(e))
            }
        }
    }

    /// Run one full attempt of `kind`
    ///
    /// # Returns
    /// * `Ok(())` - All shots captured and saved; flags updated
    /// * `Err(CaptureError::Rejected(_))` - Trigger was a no-op
    /// * `Err(_)` - Attempt aborted; flags unchanged and the same kind may be retried
    pub async fn run_attempt(&mut self, kind: AttemptKind) -> Result<(), CaptureError> {
        if self.state.phase() != ControllerPhase::Idle {
            return self.reject(RejectReason::Busy);
        }
        if !self.camera.is_ready() {
            self.ensure_camera().await?;
        }
        if let Err(reason) = self.state.check_eligible(kind) {
            return self.reject(reason);
        }

        info!(%kind, "Starting capture attempt");
        self.state.active_attempt = Some(CaptureAttempt::new(kind));
        self.emit(CaptureEvent::AttemptStarted(kind));

        if kind == AttemptKind::Redo {
            self.state.existing_shots.clear();
            self.emit(CaptureEvent::PreviewCleared);
        }

        let result = self.capture_and_save(kind).await;

        if let Some(mut attempt) = self.state.active_attempt.take() {
            let outcome = if result.is_ok() {
                AttemptOutcome::Completed
            } else {
                AttemptOutcome::Failed
            };
            attempt.finish(outcome);
            debug!(%kind, ?outcome, shots = attempt.shots().len(), "Attempt finished");
        }

        match result {
            Ok(()) => {
                self.state.mark_committed(kind);
                self.emit(CaptureEvent::AttemptCommitted(kind));
                match kind {
                    AttemptKind::First => {
                        self.emit(CaptureEvent::Status(messages::FIRST_COMPLETE));
                    }
                    AttemptKind::Redo => {
                        self.emit(CaptureEvent::Status(messages::REDO_COMPLETE));
                        self.emit(CaptureEvent::FlowAdvance);
                    }
                }
                info!(%kind, "Capture attempt committed");
                Ok(())
            }
            Err(error) => {
                error!(%kind, %error, "Capture attempt failed");
                self.emit(CaptureEvent::Error(error.user_message()));
                self.emit(CaptureEvent::AttemptFailed {
                    kind,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    async fn capture_and_save(&mut self, kind: AttemptKind) -> Result<(), CaptureError> {
        for shot in 1..=SHOTS_TOTAL as u8 {
            let image = run_shot(
                self.timings,
                self.capturer,
                self.camera.preview().clone(),
                &self.events,
                shot,
            )
            .await?;

            // The screen shows this attempt's shots from its first capture on
            if let Some(attempt) = self.state.active_attempt.as_mut() {
                attempt.push(image.clone());
                self.state.existing_shots = attempt.shots().to_vec();
            }
            self.emit(CaptureEvent::ShotCaptured(image));
        }

        let shots = self
            .state
            .active_attempt
            .as_ref()
            .filter(|attempt| attempt.is_full())
            .map(|attempt| attempt.shots().to_vec())
            .unwrap_or_default();
        let Some(patch) = PhotoboothPatch::from_shots(&shots, kind.redo_count()) else {
            return Err(CaptureError::CaptureUnavailable(PhotoError::NoFrameAvailable));
        };

        self.emit(CaptureEvent::Saving(kind));
        self.gateway
            .save(patch)
            .await
            .map_err(CaptureError::PersistenceFailure)
    }

    /// Give up the screen: abandon any attempt and release the camera
    ///
    /// Safe at any point; unsaved shots are dropped.
    pub fn teardown(&mut self) {
        if let Some(mut attempt) = self.state.active_attempt.take() {
            attempt.finish(AttemptOutcome::Failed);
            info!(
                kind = %attempt.kind(),
                shots = attempt.shots().len(),
                "Abandoning in-flight attempt"
            );
        }
        self.state.awaiting_camera = false;

        let was_held = self.camera.is_ready();
        self.camera.release();
        self.state.camera_ready = false;
        if was_held {
            self.emit(CaptureEvent::CameraReleased);
        }
    }
}

/// Countdown, flash and capture for one shot
async fn run_shot(
    timings: ShotTimings,
    capturer: FrameCapturer,
    preview: PreviewSink,
    events: &UnboundedSender<CaptureEvent>,
    shot: u8,
) -> Result<CapturedImage, CaptureError> {
    let emit = |event| {
        let _ = events.send(event);
    };
    let mut phases = std::pin::pin!(shot_sequence(timings));
    let mut image = None;

    while let Some(phase) = phases.next().await {
        match phase {
            ShotPhase::Tick(remaining) => emit(CaptureEvent::Countdown { shot, remaining }),
            ShotPhase::Flash => emit(CaptureEvent::FlashOn),
            ShotPhase::ShotReady => {
                emit(CaptureEvent::FlashOff);
                image = Some(capturer.capture(&preview, shot).await?);
            }
            ShotPhase::InterShotDelay => {}
        }
    }

    image.ok_or(CaptureError::CaptureUnavailable(PhotoError::NoFrameAvailable))
}

/// Shots recoverable from a stored record, in slot order
fn shots_from_record(record: &SessionRecord) -> Vec<CapturedImage> {
    record
        .saved_slots()
        .into_iter()
        .filter_map(|slot| match crate::pipelines::photo::decode_data_url(slot) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable saved shot");
                None
            }
        })
        .enumerate()
        .map(|(index, jpeg)| {
            let (width, height) = image::ImageReader::new(std::io::Cursor::new(&jpeg))
                .with_guessed_format()
                .ok()
                .and_then(|reader| reader.into_dimensions().ok())
                .unwrap_or((0, 0));
            CapturedImage {
                shot: index as u8 + 1,
                width,
                height,
                jpeg: Arc::from(jpeg),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::photo::jpeg_data_url;
    use crate::testing::{MemoryGateway, MockCamera};
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn setup(
        camera: &MockCamera,
        gateway: &MemoryGateway,
    ) -> (
        CaptureController<MemoryGateway>,
        UnboundedReceiver<CaptureEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = CameraStreamManager::new(Box::new(camera.clone()));
        (CaptureController::new(manager, gateway.clone(), tx), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<CaptureEvent>) -> Vec<CaptureEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    /// Run an attempt while blanking the preview when shot `fail_on` counts down
    async fn run_with_dead_preview(
        controller: &mut CaptureController<MemoryGateway>,
        rx: &mut UnboundedReceiver<CaptureEvent>,
        kind: AttemptKind,
        fail_on: u8,
    ) -> Result<(), CaptureError> {
        let preview = controller.preview();
        let watcher = async {
            while let Some(event) = rx.recv().await {
                if let CaptureEvent::Countdown { shot, remaining: 1 } = event
                    && shot == fail_on
                {
                    preview.clear();
                }
                if matches!(event, CaptureEvent::AttemptFailed { .. }) {
                    break;
                }
            }
        };
        let (result, ()) = tokio::join!(controller.run_attempt(kind), watcher);
        result
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_commits_three_ordered_shots() {
        let camera = MockCamera::new();
        let gateway = MemoryGateway::new();
        let (mut controller, mut rx) = setup(&camera, &gateway);

        let start = tokio::time::Instant::now();
        controller.run_attempt(AttemptKind::First).await.unwrap();
        assert_eq!(
            start.elapsed(),
            crate::constants::timing::shot_duration() * SHOTS_TOTAL as u32
        );

        let state = controller.state();
        assert!(state.has_completed_first_try());
        assert!(!state.has_used_redo());
        assert!(state.active_attempt.is_none());
        let shots: Vec<u8> = state.existing_shots.iter().map(|s| s.shot).collect();
        assert_eq!(shots, vec![1, 2, 3]);

        let saves = gateway.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].redo_count, 0);
        assert_eq!(saves[0].primary_image, saves[0].slot1);

        let events = drain(&mut rx);
        assert!(events.contains(&CaptureEvent::AttemptCommitted(AttemptKind::First)));
        assert!(!events.contains(&CaptureEvent::FlowAdvance));
        let countdown: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                CaptureEvent::Countdown { shot: 1, remaining } => Some(*remaining),
                _ => None,
            })
            .collect();
        assert_eq!(countdown, vec![3, 2, 1]);
        assert_eq!(camera.starts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redo_replaces_shots_and_advances_flow() {
        let camera = MockCamera::new();
        let gateway = MemoryGateway::new();
        let (mut controller, mut rx) = setup(&camera, &gateway);

        controller.run_attempt(AttemptKind::First).await.unwrap();
        drain(&mut rx);

        camera.show([250, 10, 10]);
        controller.run_attempt(AttemptKind::Redo).await.unwrap();

        let state = controller.state();
        assert!(state.has_used_redo());
        assert_eq!(state.existing_shots.len(), 3);
        assert_eq!(state.chances_used(), 2);

        let saves = gateway.saves();
        assert_eq!(saves.len(), 2);
        assert_eq!(saves[1].redo_count, 1);
        assert_ne!(saves[1].slot1, saves[0].slot1);
        assert_eq!(gateway.record().unwrap().redo_count, Some(1));

        let events = drain(&mut rx);
        let cleared = events
            .iter()
            .position(|e| *e == CaptureEvent::PreviewCleared)
            .unwrap();
        let first_shot = events
            .iter()
            .position(|e| matches!(e, CaptureEvent::ShotCaptured(_)))
            .unwrap();
        assert!(cleared < first_shot);
        assert_eq!(events.last(), Some(&CaptureEvent::FlowAdvance));
        assert_eq!(camera.starts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_triggers_change_nothing() {
        let camera = MockCamera::new();
        let gateway = MemoryGateway::new();
        let (mut controller, mut rx) = setup(&camera, &gateway);

        let err = controller.run_attempt(AttemptKind::Redo).await.unwrap_err();
        assert_eq!(err, CaptureError::Rejected(RejectReason::RedoNotAvailable));
        assert!(!controller.state().has_completed_first_try());
        assert!(gateway.saves().is_empty());
        assert!(drain(&mut rx).contains(&CaptureEvent::Status(messages::REDO_UNAVAILABLE)));

        controller.run_attempt(AttemptKind::First).await.unwrap();
        let err = controller.run_attempt(AttemptKind::First).await.unwrap_err();
        assert_eq!(
            err,
            CaptureError::Rejected(RejectReason::FirstAlreadyCompleted)
        );
        assert_eq!(gateway.saves().len(), 1);

        controller.run_attempt(AttemptKind::Redo).await.unwrap();
        let err = controller.run_attempt(AttemptKind::Redo).await.unwrap_err();
        assert_eq!(err, CaptureError::Rejected(RejectReason::RedoNotAvailable));
        assert_eq!(gateway.saves().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_failure_on_any_shot_aborts_without_saving() {
        for fail_on in 1..=SHOTS_TOTAL as u8 {
            let camera = MockCamera::new();
            let gateway = MemoryGateway::new();
            let (mut controller, mut rx) = setup(&camera, &gateway);

            let err = run_with_dead_preview(&mut controller, &mut rx, AttemptKind::First, fail_on)
                .await
                .unwrap_err();
            assert_eq!(
                err,
                CaptureError::CaptureUnavailable(PhotoError::NoFrameAvailable)
            );
            assert_eq!(err.user_message(), messages::ATTEMPT_FAILED);

            let state = controller.state();
            assert!(!state.has_completed_first_try());
            assert!(state.active_attempt.is_none());
            assert_eq!(state.existing_shots.len(), fail_on as usize - 1);
            assert!(gateway.saves().is_empty());

            // Same kind may be retried from scratch
            camera.show([0, 0, 0]);
            controller.run_attempt(AttemptKind::First).await.unwrap();
            assert!(controller.state().has_completed_first_try());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_redo_leaves_first_flag_alone() {
        let camera = MockCamera::new();
        let gateway = MemoryGateway::new();
        let (mut controller, mut rx) = setup(&camera, &gateway);
        controller.run_attempt(AttemptKind::First).await.unwrap();
        drain(&mut rx);

        run_with_dead_preview(&mut controller, &mut rx, AttemptKind::Redo, 2)
            .await
            .unwrap_err();
        assert!(controller.state().has_completed_first_try());
        assert!(!controller.state().has_used_redo());

        camera.show([1, 1, 1]);
        controller.run_attempt(AttemptKind::Redo).await.unwrap();
        assert!(controller.state().has_used_redo());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_failure_keeps_new_shots_but_not_flags() {
        let camera = MockCamera::new();
        let gateway = MemoryGateway::with_record(SessionRecord {
            slot1: Some(jpeg_data_url(&[0xFF, 0xD8, 9])),
            ..SessionRecord::default()
        });
        let (mut controller, mut rx) = setup(&camera, &gateway);
        controller.load_existing().await;
        assert_eq!(controller.state().existing_shots.len(), 1);

        gateway.fail_saves(true);
        let err = controller.run_attempt(AttemptKind::First).await.unwrap_err();
        assert!(matches!(err, CaptureError::PersistenceFailure(_)));

        let state = controller.state();
        assert!(!state.has_completed_first_try());
        let new: Vec<u8> = state.existing_shots.iter().map(|s| s.shot).collect();
        assert_eq!(new, vec![1, 2, 3]);
        assert_eq!(gateway.record().unwrap().redo_count, None);
        assert!(drain(&mut rx).contains(&CaptureEvent::Error(messages::SAVE_FAILED)));

        gateway.fail_saves(false);
        controller.run_attempt(AttemptKind::First).await.unwrap();
        assert!(controller.state().has_completed_first_try());
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_failure_is_recoverable_on_next_trigger() {
        let camera = MockCamera::denying();
        let gateway = MemoryGateway::new();
        let (mut controller, mut rx) = setup(&camera, &gateway);

        let err = controller.ensure_camera().await.unwrap_err();
        assert!(matches!(err, CaptureError::CameraUnavailable(_)));
        assert!(!controller.state().camera_ready);

        let err = controller.run_attempt(AttemptKind::First).await.unwrap_err();
        assert!(matches!(err, CaptureError::CameraUnavailable(_)));
        assert!(drain(&mut rx).contains(&CaptureEvent::Error(messages::CAMERA_FAILED)));

        camera.set_deny(false);
        controller.run_attempt(AttemptKind::First).await.unwrap();
        assert!(controller.state().camera_ready);
        assert_eq!(camera.starts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_existing_tolerates_partial_and_broken_records() {
        let camera = MockCamera::new();
        let gateway = MemoryGateway::with_record(SessionRecord {
            slot1: Some("data:image/jpeg;base64,@@@".to_string()),
            slot2: Some(jpeg_data_url(&[0xFF, 0xD8, 2])),
            ..SessionRecord::default()
        });
        let (mut controller, _rx) = setup(&camera, &gateway);
        controller.load_existing().await;
        assert_eq!(controller.state().existing_shots.len(), 1);
        assert_eq!(controller.state().existing_shots[0].shot, 1);

        let broken = MemoryGateway::new();
        broken.fail_loads(true);
        let (mut controller, mut rx) = setup(&camera, &broken);
        controller.load_existing().await;
        assert!(controller.state().existing_shots.is_empty());
        let events = drain(&mut rx);
        assert!(events.contains(&CaptureEvent::Status(messages::LOAD_FAILED)));
        assert!(events.contains(&CaptureEvent::ExistingLoaded(Vec::new())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_mid_attempt_releases_once_and_saves_nothing() {
        let camera = MockCamera::new();
        let gateway = MemoryGateway::new();
        let (mut controller, _rx) = setup(&camera, &gateway);

        let interrupted = tokio::time::timeout(
            Duration::from_millis(4_500),
            controller.run_attempt(AttemptKind::First),
        )
        .await;
        assert!(interrupted.is_err());
        assert!(controller.state().active_attempt.is_some());

        controller.teardown();
        controller.teardown();
        assert_eq!(camera.stops(), 1);
        assert!(!camera.streaming());
        assert!(controller.state().active_attempt.is_none());
        assert!(!controller.state().has_completed_first_try());
        assert!(gateway.saves().is_empty());

        drop(controller);
        assert_eq!(camera.stops(), 1);
        assert_eq!(camera.double_starts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_attempt_rejects_as_busy() {
        let camera = MockCamera::new();
        let gateway = MemoryGateway::new();
        let (mut controller, _rx) = setup(&camera, &gateway);
        controller.ensure_camera().await.unwrap();
        controller.state.active_attempt = Some(CaptureAttempt::new(AttemptKind::First));

        let err = controller.run_attempt(AttemptKind::First).await.unwrap_err();
        assert_eq!(err, CaptureError::Rejected(RejectReason::Busy));
        assert!(controller.state().active_attempt.is_some());
    }
}
