//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use logbook_store::{LogStoreConfig, MergePolicy};

use crate::guard::{SharedSecret, TenancyMode};

/// Port the server listens on when none is configured.
pub const DEFAULT_PORT: u16 = 4000;

/// File the collection is persisted to when none is configured.
pub const DEFAULT_LOG_FILE: &str = "logs.json";

/// Largest request body accepted by default (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Configuration for the logbook server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// Shared secret expected in `x-api-key` (none disables the check).
    pub api_key: Option<SharedSecret>,
    /// Whether requests must carry a tenant code.
    pub tenancy: TenancyMode,
    /// Path of the JSON collection file.
    pub log_file: PathBuf,
    /// Store bound and merge policy.
    pub store: LogStoreConfig,
    /// CORS allowed origins (empty means all).
    pub cors_origins: Vec<String>,
    /// Maximum accepted request body size.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            api_key: None,
            tenancy: TenancyMode::default(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            store: LogStoreConfig::default(),
            cors_origins: Vec::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Require this API key on guarded routes. An empty key disables the check.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = SharedSecret::new(key);
        self
    }

    /// Set the tenancy mode.
    #[must_use]
    pub const fn with_tenancy(mut self, tenancy: TenancyMode) -> Self {
        self.tenancy = tenancy;
        self
    }

    /// Set the collection file path.
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    /// Set the maximum number of retained entries.
    #[must_use]
    pub const fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.store = self.store.with_max_entries(max_entries);
        self
    }

    /// Set the payload merge policy.
    #[must_use]
    pub const fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.store = self.store.with_merge_policy(policy);
        self
    }

    /// Add a CORS allowed origin.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origins.push(origin.into());
        self
    }

    /// Set the maximum accepted request body size.
    #[must_use]
    pub const fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}
