// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the photobooth
//!
//! This module provides command-line functionality for:
//! - Showing what the session record holds
//! - Exporting saved shots as JPEG files
//! - Running attempts headless, without the kiosk screen

use photobooth::app::{AttemptKind, CaptureController, CaptureEvent, SessionExit, spawn_session};
use photobooth::backends::camera::{CameraStreamManager, backend_for_source};
use photobooth::constants::{CHANCES_TOTAL, SHOTS_TOTAL};
use photobooth::errors::{AppError, AppResult};
use photobooth::flash::HardwareFlash;
use photobooth::pipelines::photo::decode_data_url;
use photobooth::storage::{JsonFileGateway, PersistenceGateway};
use photobooth::Config;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::info;

/// Print a summary of the stored session record
pub async fn show_status(config: &Config) -> AppResult<()> {
    let gateway = JsonFileGateway::new(config.record_path.clone());
    println!("Record: {}", gateway.path().display());

    let Some(record) = gateway.load().await? else {
        println!("No session record yet.");
        return Ok(());
    };

    let slots = [&record.slot1, &record.slot2, &record.slot3];
    for (index, slot) in slots.iter().enumerate() {
        let state = match slot.as_deref() {
            None | Some("") => "empty".to_string(),
            Some(url) => match decode_data_url(url) {
                Ok(bytes) => format!("{} KiB", bytes.len().div_ceil(1024)),
                Err(e) => format!("unreadable ({})", e),
            },
        };
        println!("  slot{}: {}", index + 1, state);
    }

    match record.redo_count {
        Some(0) => println!("Chances used: 1 of {}", CHANCES_TOTAL),
        Some(_) => println!("Chances used: {} of {}", CHANCES_TOTAL, CHANCES_TOTAL),
        None => println!("Chances used: 0 of {}", CHANCES_TOTAL),
    }
    if let Some(updated) = &record.photobooth_updated_at {
        println!("Last saved: {}", updated);
    }
    if !record.other.is_empty() {
        let mut keys: Vec<&str> = record.other.keys().map(String::as_str).collect();
        keys.sort_unstable();
        println!("Other fields: {}", keys.join(", "));
    }

    Ok(())
}

/// Write every saved slot to `out/slotN.jpg`
pub async fn export_shots(config: &Config, out: &Path) -> AppResult<()> {
    let gateway = JsonFileGateway::new(config.record_path.clone());
    let record = gateway
        .load()
        .await?
        .ok_or_else(|| AppError::Other("No session record to export".to_string()))?;

    tokio::fs::create_dir_all(out).await?;

    let slots = [&record.slot1, &record.slot2, &record.slot3];
    let mut written = 0;
    for (index, slot) in slots.iter().enumerate() {
        let Some(url) = slot.as_deref().filter(|url| !url.is_empty()) else {
            continue;
        };
        let bytes = decode_data_url(url)?;
        let path = out.join(format!("slot{}.jpg", index + 1));
        tokio::fs::write(&path, bytes).await?;
        println!("Saved: {}", path.display());
        written += 1;
    }

    if written == 0 {
        println!("The record has no saved shots.");
    }
    info!(written, out = %out.display(), "Exported shots");
    Ok(())
}

/// Run the first try (and optionally the redo) without a screen
///
/// Ctrl+C tears the session down, releasing the camera.
pub async fn run_headless(config: &Config, redo: bool) -> AppResult<()> {
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let camera = CameraStreamManager::new(backend_for_source(&config.camera));
    let gateway = JsonFileGateway::new(config.record_path.clone());
    let (handle, task) = spawn_session(CaptureController::new(camera, gateway, events_tx));

    let interrupt = handle.clone();
    ctrlc::set_handler(move || {
        interrupt.teardown();
    })
    .map_err(|e| AppError::Other(format!("Failed to install Ctrl+C handler: {}", e)))?;

    let mut flash = config.hardware_flash.then(HardwareFlash::discover);
    let mut failed = None;

    while let Some(event) = events.recv().await {
        if let Some(flash) = flash.as_mut() {
            match &event {
                CaptureEvent::FlashOn => flash.set(true),
                CaptureEvent::FlashOff | CaptureEvent::AttemptFailed { .. } => flash.set(false),
                _ => {}
            }
        }
        if let Some(line) = describe(&event) {
            println!("{}", line);
        }

        match event {
            CaptureEvent::CameraReady => {
                handle.start();
            }
            CaptureEvent::CameraFailed => {
                failed = Some("camera unavailable".to_string());
                handle.teardown();
            }
            CaptureEvent::AttemptCommitted(AttemptKind::First) if redo => {
                handle.redo();
            }
            CaptureEvent::AttemptCommitted(AttemptKind::First) => {
                handle.teardown();
            }
            CaptureEvent::AttemptFailed { error, .. } => {
                failed = Some(error.to_string());
                handle.teardown();
            }
            _ => {}
        }
    }

    if let Some(flash) = flash.as_mut() {
        flash.off();
    }

    let exit = task
        .await
        .map_err(|e| AppError::Other(format!("capture session crashed: {}", e)))?;
    info!(?exit, "Headless session finished");

    match (failed, exit) {
        (Some(reason), _) => Err(AppError::Other(format!("Capture failed: {}", reason))),
        (None, SessionExit::Advanced) => {
            println!("Both tries used. Continue to the final image.");
            Ok(())
        }
        (None, SessionExit::TornDown) => Ok(()),
    }
}

/// One console line per event worth showing
fn describe(event: &CaptureEvent) -> Option<String> {
    match event {
        CaptureEvent::CameraReady => Some("Camera ready".to_string()),
        CaptureEvent::AttemptStarted(kind) => Some(format!("Starting {} try", kind)),
        CaptureEvent::Countdown { shot, remaining } => {
            Some(format!("Shot {} in {}...", shot, remaining))
        }
        CaptureEvent::ShotCaptured(image) => Some(format!(
            "Captured {} of {} ({}x{})",
            image.shot, SHOTS_TOTAL, image.width, image.height
        )),
        CaptureEvent::Saving(_) => Some("Saving...".to_string()),
        CaptureEvent::Status(message) => Some((*message).to_string()),
        CaptureEvent::Error(message) => Some(format!("Error: {}", message)),
        _ => None,
    }
}
