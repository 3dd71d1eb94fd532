// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Shot count and timings are fixed for every kiosk; they are deliberately
//! not part of [`crate::config::Config`].

use std::time::Duration;

/// Number of shots taken per attempt
pub const SHOTS_TOTAL: usize = 3;

/// Number of attempts a guest gets (first try + one redo)
pub const CHANCES_TOTAL: usize = 2;

/// Countdown timing for a single shot
pub mod timing {
    use super::Duration;

    /// Countdown starts at this value and ticks down to 1
    pub const COUNTDOWN_FROM: u8 = 3;

    /// Length of one countdown tick
    pub const TICK: Duration = Duration::from_millis(1000);

    /// How long the flash overlay stays lit
    pub const FLASH: Duration = Duration::from_millis(140);

    /// Pause after a capture before the next countdown begins
    pub const INTER_SHOT_DELAY: Duration = Duration::from_millis(500);

    /// Full wall-clock length of one shot, countdown through inter-shot delay
    pub const fn shot_duration() -> Duration {
        Duration::from_millis(
            TICK.as_millis() as u64 * COUNTDOWN_FROM as u64
                + FLASH.as_millis() as u64
                + INTER_SHOT_DELAY.as_millis() as u64,
        )
    }
}

/// Camera stream request defaults
pub mod camera {
    /// Preferred preview width
    pub const IDEAL_WIDTH: u32 = 640;

    /// Preferred preview height
    pub const IDEAL_HEIGHT: u32 = 480;

    /// Synthetic sources publish at roughly this rate
    pub const VIRTUAL_FPS: u64 = 30;
}

/// GStreamer pipeline tuning
pub mod pipeline {
    /// Appsink queue depth; old frames are dropped beyond this
    pub const MAX_BUFFERS: u32 = 2;

    /// Pipeline PLAYING state timeout on start
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// Pipeline NULL state timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 90;
}

/// Still encoding
pub mod encoding {
    /// JPEG quality for captured shots (0.72 on a 0..1 scale)
    pub const JPEG_QUALITY: u8 = 72;

    /// MIME type used in image data URLs
    pub const JPEG_MIME: &str = "image/jpeg";
}

/// User-facing copy shown by the kiosk
pub mod messages {
    pub const CAMERA_FAILED: &str = "Camera access failed. Allow webcam permission and try again.";
    pub const FIRST_ALREADY_DONE: &str =
        "First try is already complete. Use Redo for your second chance.";
    pub const REDO_UNAVAILABLE: &str = "Redo is only available once after the first completed try.";
    pub const BUSY: &str = "Hold still, a capture is already running.";
    pub const ATTEMPT_FAILED: &str = "Could not complete the interaction. Please try again.";
    pub const SAVE_FAILED: &str = "Your photos could not be saved. Please try again.";
    pub const LOAD_FAILED: &str = "Previous photos could not be loaded. You can still take new ones.";
    pub const FIRST_COMPLETE: &str = "First try complete. Press Redo for your second and final try.";
    pub const REDO_COMPLETE: &str = "Second try complete. Moving to final image...";

    pub const WAITING_FOR_CAMERA: &str = "Waiting for camera permission...";
    pub const ALL_CAPTURED: &str = "All 3 shots captured";
    pub const READY: &str = "Ready to start interaction";
    pub const LOADING_PREVIOUS: &str = "Loading previous photobooth data...";
    pub const OPENING_CAMERA: &str = "Opening camera...";
}

/// Supported still image formats for the virtual camera
pub mod file_formats {
    /// Image extensions the virtual camera can load
    pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

    /// Check if an extension (lowercase, no dot) is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext)
    }
}
