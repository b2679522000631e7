//! Shared state for the logbook server.

use std::sync::Arc;

use logbook_store::SharedLogStore;

use crate::config::ServerConfig;
use crate::guard::AccessGuard;

/// State shared by every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The log collection.
    store: SharedLogStore,
    /// Admission policy for guarded routes.
    guard: Arc<AccessGuard>,
    /// Server configuration.
    config: Arc<ServerConfig>,
}

impl AppState {
    /// Create state over an opened store.
    #[must_use]
    pub fn new(config: ServerConfig, store: SharedLogStore) -> Self {
        Self {
            guard: Arc::new(AccessGuard::from_config(&config)),
            config: Arc::new(config),
            store,
        }
    }

    /// Get the log store.
    #[must_use]
    pub fn store(&self) -> &SharedLogStore {
        &self.store
    }

    /// Get the access guard.
    #[must_use]
    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
