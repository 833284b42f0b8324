// gitfleet: bulk Git operations with a repository-state cache
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Durable cache snapshots.
//!
//! ```text
//! {"version": 1, "saved_at": <ms>, "entries": [{"key", "data", "timestamp_ms", "ttl_ms"}]}
//! ```
//!
//! [`FileSnapshotStore`] writes to a temporary file in the target directory
//! and renames it into place, so a crash mid-write leaves the previous
//! snapshot intact.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::{CacheError, FleetResult};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One persisted cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: String,
    pub data: Value,
    pub timestamp_ms: u64,
    pub ttl_ms: u64,
}

/// A serialized point-in-time copy of the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: u64,
    pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    #[must_use]
    pub const fn new(saved_at: u64, entries: Vec<SnapshotEntry>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at,
            entries,
        }
    }

    /// # Errors
    ///
    /// Returns `CacheError::Snapshot` if encoding fails.
    pub fn encode(&self) -> FleetResult<String> {
        Ok(serde_json::to_string(self).map_err(CacheError::Snapshot)?)
    }

    /// # Errors
    ///
    /// Returns `CacheError::Snapshot` if `raw` is not a valid snapshot.
    pub fn decode(raw: &str) -> FleetResult<Self> {
        Ok(serde_json::from_str(raw).map_err(CacheError::Snapshot)?)
    }
}

/// Durable storage for one serialized snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Returns the stored snapshot, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    fn load(&self) -> FleetResult<Option<String>>;

    /// Replaces the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    fn save(&self, snapshot: &str) -> FleetResult<()>;

    /// Removes the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    fn clear(&self) -> FleetResult<()>;
}

/// Snapshot kept in a single JSON file.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Persistence {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> FleetResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.persistence_error(e).into()),
        }
    }

    fn save(&self, snapshot: &str) -> FleetResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| self.persistence_error(e))?;

        let mut file = NamedTempFile::new_in(dir).map_err(|e| self.persistence_error(e))?;
        file.write_all(snapshot.as_bytes())
            .map_err(|e| self.persistence_error(e))?;
        file.persist(&self.path)
            .map_err(|e| self.persistence_error(e.error))?;
        Ok(())
    }

    fn clear(&self) -> FleetResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.persistence_error(e).into()),
        }
    }
}

/// In-memory snapshot storage, for tests and ephemeral caches.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<String>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> FleetResult<Option<String>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, snapshot: &str) -> FleetResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.to_string());
        Ok(())
    }

    fn clear(&self) -> FleetResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
