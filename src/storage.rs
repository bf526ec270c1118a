//! Durable storage — the persisted tenant-context side channel.
//!
//! DESIGN
//! ======
//! Only `current_church_id` survives a restart; every other piece of
//! session state is re-derived by `check_auth` on boot. The document is a
//! single small JSON object written whole on every change. Repeated writes
//! are acceptable, silent data loss is not, so writes go through a temp
//! file and an atomic rename.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage document corrupt: {0}")]
    Corrupt(String),
}

// =============================================================================
// TRAIT
// =============================================================================

/// Key-value persistence surviving process restarts. The store treats it as
/// a black box with "save" and "load on boot" operations.
pub trait DurableStorage: Send + Sync {
    /// Persist the current tenant context. Called on every change.
    fn save_church_id(&self, church_id: Option<Uuid>) -> Result<(), StorageError>;

    /// Load the tenant context persisted by a previous process.
    fn load_church_id(&self) -> Result<Option<Uuid>, StorageError>;
}

// =============================================================================
// JSON FILE STORAGE
// =============================================================================

/// The persisted document. One namespaced file per deployment.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StorageDocument {
    current_church_id: Option<Uuid>,
}

/// File-backed [`DurableStorage`] writing a small JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_document(&self) -> Result<StorageDocument, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StorageDocument::default());
            }
            Err(e) => return Err(StorageError::Io(e)),
        };
        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    fn write_document(&self, document: &StorageDocument) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string(document)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        // Write-then-rename so a crash mid-write cannot truncate the document.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl DurableStorage for JsonFileStorage {
    fn save_church_id(&self, church_id: Option<Uuid>) -> Result<(), StorageError> {
        self.write_document(&StorageDocument { current_church_id: church_id })
    }

    fn load_church_id(&self) -> Result<Option<Uuid>, StorageError> {
        Ok(self.read_document()?.current_church_id)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
