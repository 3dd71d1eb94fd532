// SPDX-License-Identifier: GPL-3.0-only

//! Capture session state
//!
//! Everything the controller tracks for one screen lives in
//! [`SessionCaptureState`]; the attempt flags can only move forward.

use crate::constants::SHOTS_TOTAL;
use crate::errors::{CaptureError, RejectReason};
use crate::pipelines::photo::CapturedImage;
use std::fmt;

/// Which of the guest's two chances an attempt uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptKind {
    First,
    Redo,
}

impl AttemptKind {
    /// Value written to the record's `redoCount` field
    pub fn redo_count(self) -> u8 {
        match self {
            AttemptKind::First => 0,
            AttemptKind::Redo => 1,
        }
    }
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptKind::First => write!(f, "first"),
            AttemptKind::Redo => write!(f, "redo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptOutcome {
    #[default]
    InProgress,
    Completed,
    Failed,
}

/// One run through all shots
#[derive(Debug, Clone)]
pub struct CaptureAttempt {
    kind: AttemptKind,
    shots: Vec<CapturedImage>,
    outcome: AttemptOutcome,
}

impl CaptureAttempt {
    pub fn new(kind: AttemptKind) -> Self {
        Self {
            kind,
            shots: Vec::with_capacity(SHOTS_TOTAL),
            outcome: AttemptOutcome::InProgress,
        }
    }

    pub fn kind(&self) -> AttemptKind {
        self.kind
    }

    pub fn shots(&self) -> &[CapturedImage] {
        &self.shots
    }

    pub fn outcome(&self) -> AttemptOutcome {
        self.outcome
    }

    /// Shot number the next capture gets, 1-based
    pub fn next_shot(&self) -> u8 {
        self.shots.len() as u8 + 1
    }

    /// Append the next shot; shots arrive strictly in order
    pub fn push(&mut self, image: CapturedImage) {
        debug_assert_eq!(image.shot, self.next_shot());
        debug_assert!(self.shots.len() < SHOTS_TOTAL);
        self.shots.push(image);
    }

    pub fn is_full(&self) -> bool {
        self.shots.len() == SHOTS_TOTAL
    }

    pub fn finish(&mut self, outcome: AttemptOutcome) {
        self.outcome = outcome;
    }
}

/// Coarse controller state, derived from [`SessionCaptureState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    AwaitingCamera,
    FirstRunning,
    RedoRunning,
}

/// State owned by the capture controller for the lifetime of a screen
#[derive(Debug, Clone, Default)]
pub struct SessionCaptureState {
    /// The shot sequence on screen: loaded shots, then each attempt's shots
    pub existing_shots: Vec<CapturedImage>,
    pub camera_ready: bool,
    /// Set while the camera is being requested
    pub awaiting_camera: bool,
    pub active_attempt: Option<CaptureAttempt>,
    has_completed_first_try: bool,
    has_used_redo: bool,
}

impl SessionCaptureState {
    pub fn has_completed_first_try(&self) -> bool {
        self.has_completed_first_try
    }

    pub fn has_used_redo(&self) -> bool {
        self.has_used_redo
    }

    pub fn phase(&self) -> ControllerPhase {
        match &self.active_attempt {
            Some(attempt) if attempt.kind() == AttemptKind::First => ControllerPhase::FirstRunning,
            Some(_) => ControllerPhase::RedoRunning,
            None if self.awaiting_camera => ControllerPhase::AwaitingCamera,
            None => ControllerPhase::Idle,
        }
    }

    /// Whether an attempt of `kind` may start given the flags alone
    pub fn check_eligible(&self, kind: AttemptKind) -> Result<(), RejectReason> {
        match kind {
            AttemptKind::First if self.has_completed_first_try => {
                Err(RejectReason::FirstAlreadyCompleted)
            }
            AttemptKind::Redo if !self.has_completed_first_try || self.has_used_redo => {
                Err(RejectReason::RedoNotAvailable)
            }
            _ => Ok(()),
        }
    }

    /// Record a committed attempt
    pub fn mark_committed(&mut self, kind: AttemptKind) {
        match kind {
            AttemptKind::First => self.has_completed_first_try = true,
            AttemptKind::Redo => {
                debug_assert!(self.has_completed_first_try);
                self.has_used_redo = true;
            }
        }
    }

    /// Chances spent so far, out of [`crate::constants::CHANCES_TOTAL`]
    pub fn chances_used(&self) -> usize {
        usize::from(self.has_completed_first_try) + usize::from(self.has_used_redo)
    }
}

/// Everything the controller reports to the screen hosting it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Prior shots are being read from the store
    LoadingExisting,
    /// Shots recovered from the store, possibly fewer than three
    ExistingLoaded(Vec<CapturedImage>),
    CameraOpening,
    CameraReady,
    /// The camera request was refused or failed
    CameraFailed,
    CameraReleased,
    AttemptStarted(AttemptKind),
    /// The on-screen shot sequence was emptied for a redo
    PreviewCleared,
    /// Which shot the countdown belongs to, and the value to show
    Countdown { shot: u8, remaining: u8 },
    FlashOn,
    FlashOff,
    ShotCaptured(CapturedImage),
    Saving(AttemptKind),
    AttemptCommitted(AttemptKind),
    AttemptFailed {
        kind: AttemptKind,
        error: CaptureError,
    },
    /// Informational line, e.g. a rejected trigger
    Status(&'static str),
    /// Error line
    Error(&'static str),
    /// The redo committed; the hosting flow moves to the next step
    FlowAdvance,
}
