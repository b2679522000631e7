//! The capacity-bounded, tenant-partitioned log store.
//!
//! [`LogStore`] owns the collection in memory behind a read/write lock and
//! flushes it in full through a [`CollectionBackend`] on every mutation.
//! Mutations hold the write lock across mutate, persist and commit, so two
//! appends or deletes can never interleave. Listings share the read lock.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::backend::{CollectionBackend, JsonFileBackend};
use crate::error::{Result, StoreError};
use crate::id::IdGenerator;
use crate::types::{EntryId, LogEntry, MergePolicy, Payload, Scope, Timestamp, normalize_code};

/// Default number of entries retained before the oldest is evicted.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Configuration for the log store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStoreConfig {
    /// Maximum number of entries to keep.
    pub max_entries: usize,
    /// How caller payloads combine with generated envelope fields.
    pub merge_policy: MergePolicy,
}

impl Default for LogStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            merge_policy: MergePolicy::default(),
        }
    }
}

impl LogStoreConfig {
    /// Sets the maximum number of retained entries.
    #[must_use]
    pub const fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Sets the merge policy.
    #[must_use]
    pub const fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if `max_entries` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(StoreError::InvalidConfig(
                "max_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a successful append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Id of the stored entry.
    pub id: EntryId,
    /// Id of the entry evicted to make room, if any.
    pub evicted: Option<EntryId>,
}

/// Outcome of a successful delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteReceipt {
    /// Number of entries removed.
    pub deleted: usize,
    /// Number of entries left in the collection.
    pub remaining: usize,
}

/// Thread-safe log store with oldest-first eviction and full-collection
/// persistence.
pub struct LogStore {
    config: LogStoreConfig,
    backend: Arc<dyn CollectionBackend>,
    entries: RwLock<VecDeque<LogEntry>>,
    ids: IdGenerator,
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("config", &self.config)
            .field("backend", &self.backend.location())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl LogStore {
    /// Opens a store over `backend`, loading whatever it already holds.
    ///
    /// An empty backend is initialized with an empty collection. A loaded
    /// collection larger than the configured bound is trimmed from the front.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, or if the backend
    /// cannot be read, holds a corrupt collection, or cannot be initialized.
    pub fn open(config: LogStoreConfig, backend: Arc<dyn CollectionBackend>) -> Result<Self> {
        config.validate()?;

        let mut entries = match backend.load()? {
            Some(loaded) => VecDeque::from(loaded),
            None => {
                backend.persist(&[])?;
                info!(location = %backend.location(), "initialized empty log collection");
                VecDeque::new()
            }
        };

        if entries.len() > config.max_entries {
            let surplus = entries.len() - config.max_entries;
            entries.drain(..surplus);
            warn!(
                surplus,
                max_entries = config.max_entries,
                "loaded collection exceeds capacity, dropped oldest entries"
            );
        }

        let ids = IdGenerator::new();
        for id in entries.iter().filter_map(|e| e.id.as_log_id()) {
            ids.observe(id);
        }
        let last_id = ids.last();
        debug!(
            location = %backend.location(),
            entries = entries.len(),
            last_id,
            "opened log store"
        );

        Ok(Self {
            config,
            backend,
            entries: RwLock::new(entries),
            ids,
        })
    }

    /// Opens a store persisted as a JSON array file at `path`.
    ///
    /// # Errors
    ///
    /// See [`LogStore::open`].
    pub fn open_file(config: LogStoreConfig, path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(config, Arc::new(JsonFileBackend::new(path)))
    }

    /// Appends a new entry built from `payload`, owned by `tenant` if given.
    ///
    /// If the collection is full, the oldest entry is evicted. If persisting
    /// fails, the collection is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be written.
    pub fn append(&self, tenant: Option<&str>, payload: Payload) -> Result<AppendReceipt> {
        let code = tenant.and_then(normalize_code);

        let mut entries = self.entries.write();

        // Issue the id under the lock so id order matches insertion order.
        let entry = LogEntry::compose(
            self.ids.next(),
            code,
            Timestamp::now(),
            payload,
            self.config.merge_policy,
        );
        let id = entry.id.clone();
        if let Some(assigned) = id.as_log_id() {
            self.ids.observe(assigned);
        }

        entries.push_back(entry);
        let evicted = if entries.len() > self.config.max_entries {
            entries.pop_front()
        } else {
            None
        };

        if let Err(e) = self.backend.persist(entries.make_contiguous()) {
            entries.pop_back();
            if let Some(oldest) = evicted {
                entries.push_front(oldest);
            }
            drop(entries);
            warn!(id = %id, error = %e, "append rolled back, collection not persisted");
            return Err(e);
        }

        let evicted = evicted.map(|oldest| oldest.id);
        if let Some(oldest) = &evicted {
            debug!(evicted = %oldest, "evicted oldest log entry");
        }

        Ok(AppendReceipt { id, evicted })
    }

    /// Returns copies of the entries in `scope`, in insertion order.
    #[must_use]
    pub fn list(&self, scope: Scope<'_>) -> Vec<LogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.in_scope(scope))
            .cloned()
            .collect()
    }

    /// Removes every entry owned by `code`.
    ///
    /// If nothing matches, no write takes place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingCode`] if `code` is blank, or a storage
    /// error if the remaining collection cannot be written. On error the
    /// collection is unchanged.
    pub fn delete_by_tenant(&self, code: &str) -> Result<DeleteReceipt> {
        let code = normalize_code(code).ok_or(StoreError::MissingCode)?;

        let mut entries = self.entries.write();
        let before = entries.len();

        let mut retained: VecDeque<LogEntry> = entries
            .iter()
            .filter(|e| !e.belongs_to(&code))
            .cloned()
            .collect();
        let deleted = before - retained.len();

        if deleted > 0 {
            self.backend.persist(retained.make_contiguous())?;
            *entries = retained;
        }

        Ok(DeleteReceipt {
            deleted,
            remaining: entries.len(),
        })
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the maximum number of retained entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.config.max_entries
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LogStoreConfig {
        &self.config
    }

    /// Returns where the collection is persisted.
    #[must_use]
    pub fn location(&self) -> String {
        self.backend.location()
    }
}

/// A log store shared across threads.
pub type SharedLogStore = Arc<LogStore>;
