// SPDX-License-Identifier: MPL-2.0

//! Photobooth capture screen
//!
//! # Architecture
//!
//! - `state`: Session state, attempts and the events the screen consumes
//! - `sequencer`: Countdown/flash timing for a single shot
//! - `controller`: The two-chance capture state machine
//! - `session`: Task hosting a controller behind a command channel
//! - `view`: Display state folded from events
//!
//! # Main Types
//!
//! - `CaptureController`: Owns camera, store and session state
//! - `CaptureEvent`: Everything the screen needs to draw
//! - `KioskView`: What the screen shows right now

pub mod controller;
pub mod sequencer;
pub mod session;
pub mod state;
pub mod view;

pub use controller::CaptureController;
pub use sequencer::{ShotPhase, ShotTimings, shot_sequence};
pub use session::{SessionCommand, SessionExit, SessionHandle, run_session, spawn_session};
pub use state::{
    AttemptKind, AttemptOutcome, CaptureAttempt, CaptureEvent, ControllerPhase,
    SessionCaptureState,
};
pub use view::KioskView;
