// SPDX-License-Identifier: GPL-3.0-only

//! Session record stored as a JSON file
//!
//! Saves read the current record, merge the photobooth fields and replace
//! the file through a rename, so a failed save never leaves a half-written
//! record behind.

use super::{PersistenceGateway, PhotoboothPatch, SessionRecord};
use crate::errors::StorageError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Gateway backed by one JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileGateway {
    path: PathBuf,
}

impl JsonFileGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read_record(&self) -> Result<Option<SessionRecord>, StorageError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        let record = serde_json::from_str(&contents)?;
        Ok(Some(record))
    }
}

impl PersistenceGateway for JsonFileGateway {
    async fn load(&self) -> Result<Option<SessionRecord>, StorageError> {
        let record = self.read_record().await?;
        debug!(
            path = %self.path.display(),
            found = record.is_some(),
            "Loaded session record"
        );
        Ok(record)
    }

    async fn save(&self, patch: PhotoboothPatch) -> Result<(), StorageError> {
        // A corrupt record is an error rather than a fresh start: overwriting
        // it would drop fields owned by other steps.
        let mut record = self.read_record().await?.unwrap_or_default();
        record.apply(&patch);

        let json = serde_json::to_string_pretty(&record)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        if let Err(e) = tokio::fs::write(&temp, json.as_bytes()).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            warn!(error = %e, "Could not replace session record");
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        info!(
            path = %self.path.display(),
            redo_count = patch.redo_count,
            "Session record saved"
        );
        Ok(())
    }
}
