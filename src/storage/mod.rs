// SPDX-License-Identifier: MPL-2.0

//! Session record persistence
//!
//! The kiosk flow shares one record per guest. The photobooth owns only the
//! photo fields; everything else in the record (name, answer, ...) is carried
//! through untouched.

pub mod json_file;

pub use json_file::JsonFileGateway;

use crate::constants::SHOTS_TOTAL;
use crate::errors::StorageError;
use crate::pipelines::photo::CapturedImage;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Shared session record as stored by the kiosk flow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot3: Option<String>,
    /// Image used on the final print; always the first slot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_image: Option<String>,
    /// 0 after a first try, 1 after the redo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redo_count: Option<u8>,
    /// RFC 3339 time of the last photobooth save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photobooth_updated_at: Option<String>,
    /// Fields owned by other steps of the flow
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl SessionRecord {
    /// Saved slot references in slot order, skipping empty ones
    pub fn saved_slots(&self) -> Vec<&str> {
        [&self.slot1, &self.slot2, &self.slot3]
            .into_iter()
            .filter_map(|slot| slot.as_deref())
            .filter(|value| !value.is_empty())
            .collect()
    }

    /// Merge the photobooth fields of a save
    pub fn apply(&mut self, patch: &PhotoboothPatch) {
        self.slot1 = Some(patch.slot1.clone());
        self.slot2 = Some(patch.slot2.clone());
        self.slot3 = Some(patch.slot3.clone());
        self.primary_image = Some(patch.primary_image.clone());
        self.redo_count = Some(patch.redo_count);
        self.photobooth_updated_at = Some(chrono::Utc::now().to_rfc3339());
    }
}

/// The partial record a completed attempt writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoboothPatch {
    pub slot1: String,
    pub slot2: String,
    pub slot3: String,
    pub primary_image: String,
    pub redo_count: u8,
}

impl PhotoboothPatch {
    /// Map a full set of shots onto the fixed slots
    ///
    /// Returns `None` unless exactly one image per slot is given.
    pub fn from_shots(shots: &[CapturedImage], redo_count: u8) -> Option<Self> {
        let [first, second, third] = shots else {
            return None;
        };
        debug_assert_eq!(shots.len(), SHOTS_TOTAL);

        let slot1 = first.to_data_url();
        Some(Self {
            primary_image: slot1.clone(),
            slot1,
            slot2: second.to_data_url(),
            slot3: third.to_data_url(),
            redo_count,
        })
    }
}

/// Loads and saves the shared session record
///
/// `save` must be all-or-nothing: on error the stored record is unchanged.
pub trait PersistenceGateway: Send + Sync {
    /// The current record, or `None` when the guest has none yet
    fn load(&self) -> impl Future<Output = Result<Option<SessionRecord>, StorageError>> + Send;

    /// Merge the photobooth fields into the record
    fn save(&self, patch: PhotoboothPatch) -> impl Future<Output = Result<(), StorageError>> + Send;
}
