// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end capture sessions against the test-pattern camera and a
//! record file on disk

use photobooth::app::{AttemptKind, ShotTimings, SessionExit, spawn_session};
use photobooth::backends::camera::{CameraStreamManager, backend_for_source};
use photobooth::pipelines::photo::decode_data_url;
use photobooth::{
    CameraSource, CaptureController, CaptureEvent, JsonFileGateway, KioskView, PersistenceGateway,
};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

fn quick_timings() -> ShotTimings {
    ShotTimings {
        countdown_from: 3,
        tick: Duration::from_millis(10),
        flash: Duration::from_millis(5),
        inter_shot_delay: Duration::from_millis(5),
    }
}

fn controller(
    gateway: JsonFileGateway,
) -> (
    CaptureController<JsonFileGateway>,
    UnboundedReceiver<CaptureEvent>,
) {
    let (tx, rx) = unbounded_channel();
    let camera = CameraStreamManager::new(backend_for_source(&CameraSource::TestPattern));
    let controller = CaptureController::new(camera, gateway, tx).with_timings(quick_timings());
    (controller, rx)
}

/// Feed events into `view` until `done` matches one
async fn wait_for(
    events: &mut UnboundedReceiver<CaptureEvent>,
    view: &mut KioskView,
    done: impl Fn(&CaptureEvent) -> bool,
) {
    let wait = async {
        while let Some(event) = events.recv().await {
            view.apply(&event);
            if done(&event) {
                return;
            }
        }
        panic!("event stream closed early");
    };
    tokio::time::timeout(Duration::from_secs(20), wait)
        .await
        .expect("timed out waiting for event");
}

#[tokio::test]
async fn test_first_try_then_redo_writes_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, r#"{"guestName":"Ada","frame":"gold"}"#).unwrap();

    let (controller, mut events) = controller(JsonFileGateway::new(&path));
    let (handle, task) = spawn_session(controller);
    let mut view = KioskView::new();

    wait_for(&mut events, &mut view, |e| matches!(e, CaptureEvent::CameraReady)).await;
    assert!(view.can_start());
    handle.start();

    wait_for(&mut events, &mut view, |e| {
        matches!(e, CaptureEvent::AttemptCommitted(AttemptKind::First))
    })
    .await;
    assert_eq!(view.shots.len(), 3);
    assert!(view.can_redo());

    let gateway = JsonFileGateway::new(&path);
    let first = gateway.load().await.unwrap().unwrap();
    assert_eq!(first.redo_count, Some(0));
    assert_eq!(first.saved_slots().len(), 3);
    assert_eq!(first.primary_image, first.slot1);

    handle.redo();
    wait_for(&mut events, &mut view, |e| matches!(e, CaptureEvent::FlowAdvance)).await;
    assert_eq!(task.await.unwrap(), SessionExit::Advanced);
    assert_eq!(view.chances_used(), "2 of 2");

    let record = gateway.load().await.unwrap().unwrap();
    assert_eq!(record.redo_count, Some(1));
    assert_eq!(record.primary_image, record.slot1);
    assert!(record.photobooth_updated_at.is_some());
    assert_eq!(record.other["guestName"], "Ada");
    assert_eq!(record.other["frame"], "gold");
    for url in record.saved_slots() {
        let jpeg = decode_data_url(url).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}

#[tokio::test]
async fn test_reopened_session_shows_saved_shots() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let (controller_a, mut events) = controller(JsonFileGateway::new(&path));
    let (handle, task) = spawn_session(controller_a);
    let mut view = KioskView::new();
    wait_for(&mut events, &mut view, |e| matches!(e, CaptureEvent::CameraReady)).await;
    handle.start();
    wait_for(&mut events, &mut view, |e| {
        matches!(e, CaptureEvent::AttemptCommitted(AttemptKind::First))
    })
    .await;
    handle.teardown();
    assert_eq!(task.await.unwrap(), SessionExit::TornDown);

    let (controller_b, mut events) = controller(JsonFileGateway::new(&path));
    let (handle, task) = spawn_session(controller_b);
    let mut view = KioskView::new();
    wait_for(&mut events, &mut view, |e| {
        matches!(e, CaptureEvent::ExistingLoaded(_))
    })
    .await;
    assert_eq!(view.shots.len(), 3);
    assert_eq!(view.shots[0].width, 640);

    handle.teardown();
    assert_eq!(task.await.unwrap(), SessionExit::TornDown);
}

#[tokio::test]
async fn test_teardown_while_counting_down_keeps_record_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let (controller, mut events) = controller(JsonFileGateway::new(&path));
    let (handle, task) = spawn_session(controller);
    let mut view = KioskView::new();
    wait_for(&mut events, &mut view, |e| matches!(e, CaptureEvent::CameraReady)).await;

    handle.start();
    wait_for(&mut events, &mut view, |e| {
        matches!(e, CaptureEvent::Countdown { shot: 2, .. })
    })
    .await;
    handle.teardown();

    assert_eq!(task.await.unwrap(), SessionExit::TornDown);
    wait_for(&mut events, &mut view, |e| {
        matches!(e, CaptureEvent::CameraReleased)
    })
    .await;
    assert!(!path.exists());
}
