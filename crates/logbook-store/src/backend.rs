//! Persistence backends for the log collection.
//!
//! This module provides the [`CollectionBackend`] trait plus two
//! implementations:
//! - [`JsonFileBackend`]: a single pretty-printed JSON array on disk,
//!   replaced atomically on every write
//! - [`MemoryBackend`]: keeps the last written collection in memory

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::error::{Result, StoreError};
use crate::types::LogEntry;

/// Trait for whole-collection persistence.
///
/// A backend stores exactly one collection. Every write replaces the
/// previous collection entirely.
pub trait CollectionBackend: Send + Sync {
    /// Loads the persisted collection.
    ///
    /// Returns `Ok(None)` if nothing has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read or does not hold a
    /// valid collection.
    fn load(&self) -> Result<Option<Vec<LogEntry>>>;

    /// Replaces the persisted collection with `entries`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be written. The previously
    /// persisted collection must stay intact in that case.
    fn persist(&self, entries: &[LogEntry]) -> Result<()>;

    /// Short human-readable location, used in diagnostics.
    fn location(&self) -> String;
}

/// Stores the collection as one JSON array file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// Creates a backend for the file at `path`. Nothing is touched on disk
    /// until the first load or persist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parent_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::StorageWrite {
            path: self.path.clone(),
            source,
        }
    }
}

impl CollectionBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<Vec<LogEntry>>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::StorageRead {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        // An empty file is an uninitialized collection, not a corrupt one.
        if contents.trim().is_empty() {
            return Ok(Some(Vec::new()));
        }

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    fn persist(&self, entries: &[LogEntry]) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(entries)?;
        bytes.push(b'\n');

        let dir = self.parent_dir();
        fs::create_dir_all(dir).map_err(|e| self.write_error(e))?;

        // Write beside the target and rename over it so the file on disk is
        // always a complete document.
        let mut staged = NamedTempFile::new_in(dir).map_err(|e| self.write_error(e))?;
        staged.write_all(&bytes).map_err(|e| self.write_error(e))?;
        staged.as_file().sync_all().map_err(|e| self.write_error(e))?;
        staged
            .persist(&self.path)
            .map_err(|e| self.write_error(e.error))?;

        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps the collection in memory. Useful for tests and ephemeral servers.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    snapshot: Mutex<Option<Vec<LogEntry>>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBackend {
    /// Creates an empty backend with nothing persisted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that already holds `entries`.
    #[must_use]
    pub fn with_entries(entries: Vec<LogEntry>) -> Self {
        Self {
            snapshot: Mutex::new(Some(entries)),
            ..Self::default()
        }
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Returns a copy of the last successfully written collection.
    #[must_use]
    pub fn snapshot(&self) -> Option<Vec<LogEntry>> {
        self.snapshot.lock().clone()
    }

    /// Returns the number of successful writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }
}

impl CollectionBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Vec<LogEntry>>> {
        Ok(self.snapshot.lock().clone())
    }

    fn persist(&self, entries: &[LogEntry]) -> Result<()> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(StoreError::StorageWrite {
                path: PathBuf::from(self.location()),
                source: std::io::Error::other("writes disabled"),
            });
        }
        *self.snapshot.lock() = Some(entries.to_vec());
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}
