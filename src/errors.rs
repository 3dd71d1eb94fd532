// SPDX-License-Identifier: MPL-2.0

//! Error types for the photobooth
//!
//! Each layer has its own enum; [`CaptureError`] is what the capture
//! controller reports and [`AppError`] is what the binary surfaces.

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error for the binary
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera could not be opened
    Camera(CameraError),
    /// Session record could not be read or written
    Storage(StorageError),
    /// Configuration file problems
    Config(String),
    /// Terminal setup or drawing failed
    Terminal(String),
    /// Generic error with message
    Other(String),
}

/// Camera stream errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Permission denied or the device refused to start
    Unavailable(String),
}

/// Frame capture errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoError {
    /// The preview has not produced a frame yet
    NoFrameAvailable,
    /// Frame could not be turned into a still
    EncodingFailed(String),
}

/// Session record errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Filesystem error
    Io(String),
    /// Record is not valid JSON or has the wrong shape
    Serialization(String),
    /// An image reference could not be decoded
    InvalidImage(String),
}

/// Errors reported by the capture controller
///
/// None of these are fatal: the screen stays interactive and the user
/// can retry whatever attempt is still eligible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Camera acquisition failed
    CameraUnavailable(CameraError),
    /// No frame at the capture instant; the attempt was abandoned
    CaptureUnavailable(PhotoError),
    /// All shots captured but the save failed; nothing was committed
    PersistenceFailure(StorageError),
    /// Prior shots could not be loaded at startup
    LoadFailure(StorageError),
    /// Trigger was not eligible and changed no state
    Rejected(RejectReason),
}

/// Why a trigger was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Another attempt is still running
    Busy,
    /// First try already completed
    FirstAlreadyCompleted,
    /// Redo needs a completed first try and can only be used once
    RedoNotAvailable,
}

impl CaptureError {
    /// Message shown to the guest
    pub fn user_message(&self) -> &'static str {
        use crate::constants::messages;

        match self {
            CaptureError::CameraUnavailable(_) => messages::CAMERA_FAILED,
            CaptureError::CaptureUnavailable(_) => messages::ATTEMPT_FAILED,
            CaptureError::PersistenceFailure(_) => messages::SAVE_FAILED,
            CaptureError::LoadFailure(_) => messages::LOAD_FAILED,
            CaptureError::Rejected(reason) => reason.user_message(),
        }
    }

    /// Rejections are status notes, everything else is an error line
    pub fn is_rejection(&self) -> bool {
        matches!(self, CaptureError::Rejected(_))
    }
}

impl RejectReason {
    pub fn user_message(&self) -> &'static str {
        use crate::constants::messages;

        match self {
            RejectReason::Busy => messages::BUSY,
            RejectReason::FirstAlreadyCompleted => messages::FIRST_ALREADY_DONE,
            RejectReason::RedoNotAvailable => messages::REDO_UNAVAILABLE,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Storage(e) => write!(f, "Storage error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Terminal(msg) => write!(f, "Terminal error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::Unavailable(msg) => write!(f, "Camera unavailable: {}", msg),
        }
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoError::NoFrameAvailable => write!(f, "No frame available for capture"),
            PhotoError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "I/O error: {}", msg),
            StorageError::Serialization(msg) => write!(f, "Invalid session record: {}", msg),
            StorageError::InvalidImage(msg) => write!(f, "Invalid image reference: {}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::CameraUnavailable(e) => write!(f, "{}", e),
            CaptureError::CaptureUnavailable(e) => write!(f, "Capture unavailable: {}", e),
            CaptureError::PersistenceFailure(e) => write!(f, "Save failed: {}", e),
            CaptureError::LoadFailure(e) => write!(f, "Load failed: {}", e),
            CaptureError::Rejected(reason) => write!(f, "Rejected: {:?}", reason),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for PhotoError {}
impl std::error::Error for StorageError {}
impl std::error::Error for CaptureError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::CameraUnavailable(e) => AppError::Camera(e),
            CaptureError::PersistenceFailure(e) | CaptureError::LoadFailure(e) => {
                AppError::Storage(e)
            }
            other => AppError::Other(other.to_string()),
        }
    }
}

impl From<CameraError> for CaptureError {
    fn from(err: CameraError) -> Self {
        CaptureError::CameraUnavailable(err)
    }
}

impl From<PhotoError> for CaptureError {
    fn from(err: PhotoError) -> Self {
        CaptureError::CaptureUnavailable(err)
    }
}

impl From<RejectReason> for CaptureError {
    fn from(reason: RejectReason) -> Self {
        CaptureError::Rejected(reason)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}
