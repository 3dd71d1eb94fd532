// SPDX-License-Identifier: GPL-3.0-only

//! Hardware flash LED control via Linux sysfs
//!
//! Booths built on phones or SBCs with a flash LED can light it for the
//! white-flash phase of every shot. LEDs are found at `/sys/class/leds/*:flash`
//! and driven through the torch-mode `brightness` file, which is
//! group-writable by `feedbackd`.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const LEDS_DIR: &str = "/sys/class/leds";

/// A flash LED device discovered via sysfs
#[derive(Debug, Clone)]
pub struct FlashDevice {
    path: PathBuf,
    max_brightness: u32,
    name: String,
}

impl FlashDevice {
    /// Get the device name (e.g. "white:flash")
    pub fn name(&self) -> &str {
        &self.name
    }

    fn set_brightness(&self, value: u32) -> io::Result<()> {
        let clamped = value.min(self.max_brightness);
        std::fs::write(self.path.join("brightness"), clamped.to_string())
    }
}

/// Scan `leds_dir` for writable `*:flash` entries
fn discover_in(leds_dir: &Path) -> Vec<FlashDevice> {
    let Ok(entries) = std::fs::read_dir(leds_dir) else {
        debug!(path = %leds_dir.display(), "No LED class directory, flash disabled");
        return Vec::new();
    };

    let mut devices: Vec<FlashDevice> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            if !name.ends_with(":flash") {
                return None;
            }

            let path = entry.path();
            let max_brightness = std::fs::read_to_string(path.join("max_brightness"))
                .ok()
                .and_then(|s| s.trim().parse::<u32>().ok())
                .filter(|v| *v > 0);
            let Some(max_brightness) = max_brightness else {
                warn!(name, "Invalid max_brightness, skipping LED");
                return None;
            };

            if let Err(e) = std::fs::OpenOptions::new()
                .write(true)
                .open(path.join("brightness"))
            {
                warn!(
                    name,
                    error = %e,
                    "Cannot write brightness; user may need to be in 'feedbackd' group"
                );
                return None;
            }

            info!(name, max_brightness, "Discovered flash LED");
            Some(FlashDevice {
                path,
                max_brightness,
                name,
            })
        })
        .collect();

    devices.sort_by(|a, b| a.name.cmp(&b.name));
    devices
}

/// The set of flash LEDs lit together during the flash phase
#[derive(Debug, Default)]
pub struct HardwareFlash {
    devices: Vec<FlashDevice>,
    lit: bool,
}

impl HardwareFlash {
    /// Discover the system's flash LEDs; empty when there are none
    pub fn discover() -> Self {
        Self::discover_in(Path::new(LEDS_DIR))
    }

    pub fn discover_in(leds_dir: &Path) -> Self {
        Self {
            devices: discover_in(leds_dir),
            lit: false,
        }
    }

    pub fn is_available(&self) -> bool {
        !self.devices.is_empty()
    }

    pub fn devices(&self) -> &[FlashDevice] {
        &self.devices
    }

    /// Light or darken every LED; write failures are logged, not fatal
    pub fn set(&mut self, on: bool) {
        if self.lit == on {
            return;
        }
        for device in &self.devices {
            let value = if on { device.max_brightness } else { 0 };
            if let Err(e) = device.set_brightness(value) {
                warn!(name = device.name(), error = %e, "Flash LED write failed");
            }
        }
        self.lit = on;
    }

    /// Force the LEDs off, whatever state we think they are in
    pub fn off(&mut self) {
        self.lit = true;
        self.set(false);
    }
}

impl Drop for HardwareFlash {
    fn drop(&mut self) {
        if self.lit {
            self.set(false);
        }
    }
}
