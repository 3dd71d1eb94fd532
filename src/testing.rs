// SPDX-License-Identifier: GPL-3.0-only

//! Test doubles for the camera and the session store

use crate::backends::camera::{
    BackendError, BackendResult, CameraBackend, CameraBackendType, CameraFrame, PreviewSink,
    StreamRequest,
};
use crate::errors::StorageError;
use crate::storage::{PersistenceGateway, PhotoboothPatch, SessionRecord};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockCameraState {
    deny: bool,
    streaming: bool,
    starts: usize,
    stops: usize,
    double_starts: usize,
    sink: Option<PreviewSink>,
}

/// Closed gate blocks `start` on the blocking pool until opened
#[derive(Debug, Default)]
struct StartGate {
    held: Mutex<bool>,
    opened: Condvar,
}

/// Camera that publishes a solid 64×48 frame while streaming
///
/// Clones share state, so a test can keep a handle after boxing one.
/// Dropping any clone stops the stream, as the real backends do.
#[derive(Debug, Clone, Default)]
pub struct MockCamera {
    state: Arc<Mutex<MockCameraState>>,
    gate: Arc<StartGate>,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// A camera whose permission prompt is refused
    pub fn denying() -> Self {
        let camera = Self::new();
        camera.set_deny(true);
        camera
    }

    fn lock(&self) -> MutexGuard<'_, MockCameraState> {
        self.state.lock().unwrap()
    }

    pub fn set_deny(&self, deny: bool) {
        self.lock().deny = deny;
    }

    /// Make the next starts wait until [`MockCamera::open_gate`]
    pub fn hold_starts(&self) {
        *self.gate.held.lock().unwrap() = true;
    }

    pub fn open_gate(&self) {
        *self.gate.held.lock().unwrap() = false;
        self.gate.opened.notify_all();
    }

    /// Successful starts so far
    pub fn starts(&self) -> usize {
        self.lock().starts
    }

    pub fn stops(&self) -> usize {
        self.lock().stops
    }

    pub fn streaming(&self) -> bool {
        self.lock().streaming
    }

    /// Starts requested while a stream was already playing
    pub fn double_starts(&self) -> usize {
        self.lock().double_starts
    }

    /// Publish a frame of the given colour, as the device would
    pub fn show(&self, rgb: [u8; 3]) {
        if let Some(sink) = self.lock().sink.as_ref() {
            sink.publish(solid_frame(rgb));
        }
    }
}

fn solid_frame(rgb: [u8; 3]) -> CameraFrame {
    let pixel = [rgb[0], rgb[1], rgb[2], 255];
    CameraFrame::from_rgba(64, 48, pixel.repeat(64 * 48))
}

impl CameraBackend for MockCamera {
    fn start(&mut self, _request: &StreamRequest, sink: PreviewSink) -> BackendResult<()> {
        let mut held = self.gate.held.lock().unwrap();
        while *held {
            held = self.gate.opened.wait(held).unwrap();
        }
        drop(held);

        let mut state = self.lock();
        if state.deny {
            return Err(BackendError::PermissionDenied(
                "mock camera refused".to_string(),
            ));
        }
        if state.streaming {
            state.double_starts += 1;
            return Err(BackendError::Other("already streaming".to_string()));
        }
        sink.publish(solid_frame([90, 140, 200]));
        state.sink = Some(sink);
        state.streaming = true;
        state.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        let mut state = self.lock();
        if state.streaming {
            state.stops += 1;
        }
        state.streaming = false;
        state.sink = None;
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming()
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }

    fn describe(&self) -> String {
        "mock camera".to_string()
    }
}

impl Drop for MockCamera {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    record: Option<SessionRecord>,
    saves: Vec<PhotoboothPatch>,
    fail_saves: bool,
    fail_loads: bool,
    hold_saves: bool,
    saves_started: usize,
}

/// In-memory session store with failure injection
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `record`
    pub fn with_record(record: SessionRecord) -> Self {
        let gateway = Self::new();
        gateway.lock().record = Some(record);
        gateway
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    pub fn fail_loads(&self, fail: bool) {
        self.lock().fail_loads = fail;
    }

    /// Make saves hang until the caller gives up on them
    pub fn hold_saves(&self) {
        self.lock().hold_saves = true;
    }

    /// Save calls made, including held and failed ones
    pub fn saves_started(&self) -> usize {
        self.lock().saves_started
    }

    /// Every patch that was accepted, in order
    pub fn saves(&self) -> Vec<PhotoboothPatch> {
        self.lock().saves.clone()
    }

    pub fn record(&self) -> Option<SessionRecord> {
        self.lock().record.clone()
    }
}

impl PersistenceGateway for MemoryGateway {
    async fn load(&self) -> Result<Option<SessionRecord>, StorageError> {
        let state = self.lock();
        if state.fail_loads {
            return Err(StorageError::Io("store offline".to_string()));
        }
        Ok(state.record.clone())
    }

    async fn save(&self, patch: PhotoboothPatch) -> Result<(), StorageError> {
        let held = {
            let mut state = self.lock();
            state.saves_started += 1;
            state.hold_saves
        };
        if held {
            std::future::pending::<()>().await;
        }

        let mut state = self.lock();
        if state.fail_saves {
            return Err(StorageError::Io("store offline".to_string()));
        }
        state.record.get_or_insert_with(SessionRecord::default).apply(&patch);
        state.saves.push(patch);
        Ok(())
    }
}
