//! Session state persistence
//!
//! One structured JSON record per project root, holding the
//! `ProjectContext` schema plus a schema-version marker. Saves are
//! atomic (write to a temp file, then rename), so a concurrent reader
//! never observes a partially written record. Records with an
//! unrecognized version are rejected as corrupt rather than migrated by
//! guesswork.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{ProjectContext, SessionEvent};

/// Version of the persisted record layout
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from session store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No session record found")]
    NotFound,

    #[error("Corrupt session record: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to acquire store lock: {0}")]
    Lock(String),
}

/// On-disk envelope: the context schema plus the version marker
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedRecord {
    schema_version: u32,
    #[serde(flatten)]
    context: ProjectContext,
}

/// Exclusive access to the store for the duration of a phase step.
/// The advisory lock is released when the guard drops, on every exit
/// path including failure.
pub struct StoreLock {
    file: fs::File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Durable key/value record of project context and history
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Open or create a session store rooted at the given directory
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "Opened session store");
        Ok(Self { root })
    }

    fn record_path(&self) -> PathBuf {
        self.root.join("session.json")
    }

    fn tmp_path(&self) -> PathBuf {
        self.root.join("session.json.tmp")
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    /// Whether a record exists for this project
    pub fn exists(&self) -> bool {
        self.record_path().exists()
    }

    /// Load the project context.
    ///
    /// Returns `NotFound` when no record exists, `Corrupt` when the
    /// record does not parse into the expected schema or carries an
    /// unrecognized version.
    pub fn load(&self) -> Result<ProjectContext, StoreError> {
        let raw = match fs::read_to_string(self.record_path()) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt(format!("not valid JSON: {}", e)))?;

        let version = value
            .get("schemaVersion")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| StoreError::Corrupt("missing schemaVersion marker".to_string()))?;

        if version != SCHEMA_VERSION as u64 {
            return Err(StoreError::Corrupt(format!(
                "unrecognized schema version {} (expected {})",
                version, SCHEMA_VERSION
            )));
        }

        let record: PersistedRecord = serde_json::from_value(value)
            .map_err(|e| StoreError::Corrupt(format!("record does not match schema: {}", e)))?;

        Ok(record.context)
    }

    /// Persist the project context atomically: the record is written to
    /// a temp file and renamed into place, so readers see either the old
    /// record or the new one, never a partial write.
    pub fn save(&self, context: &ProjectContext) -> Result<(), StoreError> {
        let record = PersistedRecord {
            schema_version: SCHEMA_VERSION,
            context: context.clone(),
        };
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| StoreError::Corrupt(format!("failed to serialize record: {}", e)))?;

        let tmp = self.tmp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, self.record_path())?;
        debug!(events = context.session_history.len(), "Saved session record");
        Ok(())
    }

    /// Append a session event to the persisted history
    pub fn append_event(&self, event: SessionEvent) -> Result<ProjectContext, StoreError> {
        let mut context = self.load()?;
        context.push_event(event);
        self.save(&context)?;
        Ok(context)
    }

    /// Delete the record (fresh-start recovery)
    pub fn delete(&self) -> Result<(), StoreError> {
        match fs::remove_file(self.record_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Acquire exclusive access to the store. Held by the driver for the
    /// duration of a phase step; released when the guard drops.
    pub fn lock_exclusive(&self) -> Result<StoreLock, StoreError> {
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        file.lock_exclusive().map_err(|e| StoreError::Lock(e.to_string()))?;
        Ok(StoreLock { file })
    }
}
