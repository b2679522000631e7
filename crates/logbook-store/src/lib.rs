//! # logbook-store
//!
//! Append-only, capacity-bounded log collection partitioned by tenant code
//! and persisted as a single JSON document.
//!
//! This crate provides:
//!
//! - [`LogEntry`]: Fixed envelope (id, code, timestamp) plus open attributes
//! - [`EntryId`] / [`Timestamp`]: Envelope values, kept verbatim when a
//!   caller overrides them
//! - [`MergePolicy`]: How caller payloads combine with the envelope
//! - [`LogStore`]: Thread-safe store with oldest-first eviction
//! - [`IdGenerator`]: Strictly increasing, millisecond-derived ids
//! - [`CollectionBackend`]: Persistence seam, with [`JsonFileBackend`] and
//!   [`MemoryBackend`]
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use logbook_store::{LogStore, LogStoreConfig, MemoryBackend, Payload, Scope};
//! use serde_json::json;
//!
//! let store = LogStore::open(LogStoreConfig::default(), Arc::new(MemoryBackend::new()))?;
//!
//! let mut payload = Payload::new();
//! payload.insert("type".into(), json!("signup"));
//! let receipt = store.append(Some("acme"), payload)?;
//!
//! let entries = store.list(Scope::Tenant("acme"));
//! assert_eq!(entries[0].id, receipt.id);
//! assert_eq!(store.delete_by_tenant("acme")?.deleted, 1);
//! # Ok::<(), logbook_store::StoreError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod id;
pub mod store;
pub mod types;

// Re-export main types
pub use backend::{CollectionBackend, JsonFileBackend, MemoryBackend};
pub use error::{Result, StoreError};
pub use id::{IdGenerator, MAX_SAFE_ID};
pub use store::{
    AppendReceipt, DEFAULT_MAX_ENTRIES, DeleteReceipt, LogStore, LogStoreConfig, SharedLogStore,
};
pub use types::{
    EntryId, LogEntry, LogId, MergePolicy, Payload, RESERVED_FIELDS, Scope, Timestamp,
    format_timestamp, normalize_code, normalize_code_value, now_timestamp, parse_timestamp,
};
