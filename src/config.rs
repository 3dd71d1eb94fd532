// SPDX-License-Identifier: GPL-3.0-only

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Where preview frames come from
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraSource {
    /// First camera GStreamer finds
    #[default]
    Auto,
    /// A specific V4L2 device node, e.g. `/dev/video2`
    Device(String),
    /// Synthetic colour bars
    TestPattern,
    /// A still image shown as a live feed
    StillImage(PathBuf),
}

impl FromStr for CameraSource {
    type Err = String;

    /// `auto`, `test-pattern`, a `/dev/video*` node or a still image path
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "" => Err("camera source is empty".to_string()),
            "auto" => Ok(CameraSource::Auto),
            "test-pattern" | "test" => Ok(CameraSource::TestPattern),
            _ if s.starts_with("/dev/") => Ok(CameraSource::Device(s.to_string())),
            _ => {
                let path = PathBuf::from(s);
                let is_image = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_ascii_lowercase)
                    .is_some_and(|ext| crate::constants::file_formats::is_image_extension(&ext));
                if is_image {
                    Ok(CameraSource::StillImage(path))
                } else {
                    Err(format!(
                        "'{}' is not 'auto', 'test-pattern', a /dev node or an image file",
                        s
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session record the photobooth reads and writes
    pub record_path: PathBuf,
    /// Camera to open for the preview
    pub camera: CameraSource,
    /// Mirror camera preview horizontally (selfie mode)
    pub mirror_preview: bool,
    /// Light the device flash LED during the flash phase
    pub hardware_flash: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            record_path: default_record_path(),
            camera: CameraSource::default(),
            mirror_preview: true,
            hardware_flash: false,
        }
    }
}

impl Config {
    /// Load the config file, falling back to defaults when there is none
    pub fn load() -> AppResult<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load a specific config file; a missing file yields defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// `~/.config/photobooth/config.json`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("photobooth").join("config.json"))
}

fn default_record_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photobooth")
        .join("session.json")
}
