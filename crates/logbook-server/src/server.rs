//! Logbook server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use logbook_store::{JsonFileBackend, LogStore, SharedLogStore};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::routes::create_router;
use crate::state::AppState;

/// HTTP server in front of a [`LogStore`].
#[derive(Debug, Clone)]
pub struct LogServer {
    state: AppState,
}

impl LogServer {
    /// Open the configured log file and build a server over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection file cannot be read, is corrupt,
    /// or cannot be initialized.
    pub fn open(config: ServerConfig) -> ApiResult<Self> {
        let backend = Arc::new(JsonFileBackend::new(config.log_file.clone()));
        let store = LogStore::open(config.store.clone(), backend)?;
        info!(
            path = %store.location(),
            entries = store.len(),
            capacity = store.capacity(),
            tenancy = ?config.tenancy,
            "log store opened"
        );
        Ok(Self::new(config, Arc::new(store)))
    }

    /// Create a server over an already opened store.
    #[must_use]
    pub fn new(config: ServerConfig, store: SharedLogStore) -> Self {
        Self {
            state: AppState::new(config, store),
        }
    }

    /// Get the server state for external access.
    #[must_use]
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Get the log store.
    #[must_use]
    pub fn store(&self) -> SharedLogStore {
        Arc::clone(self.state.store())
    }

    /// Build the router without binding a socket.
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Start the server and listen for connections.
    ///
    /// This method runs until the server encounters a fatal error.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve(&self, addr: SocketAddr) -> ApiResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::BindFailed(addr, e))?;

        info!(addr = %addr, "Logging server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(ApiError::Serve)?;

        Ok(())
    }

    /// Start the server with graceful shutdown support.
    ///
    /// The server will shut down when the provided future completes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve_with_shutdown<F>(&self, addr: SocketAddr, shutdown: F) -> ApiResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::BindFailed(addr, e))?;

        info!(addr = %addr, "Logging server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ApiError::Serve)?;

        info!("Logging server shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use logbook_store::{LogStoreConfig, MemoryBackend, Payload};
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    fn memory_server(config: ServerConfig) -> LogServer {
        let store = LogStore::open(config.store.clone(), Arc::new(MemoryBackend::new())).unwrap();
        LogServer::new(config, Arc::new(store))
    }

    #[test]
    fn test_open_initializes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.json");
        let server = LogServer::open(ServerConfig::default().with_log_file(&path)).unwrap();

        assert!(server.store().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_open_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.json");
        std::fs::write(&path, "{oops").unwrap();

        let err = LogServer::open(ServerConfig::default().with_log_file(&path)).unwrap_err();

        assert!(matches!(err, ApiError::Storage(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{oops");
    }

    #[test]
    fn test_state_shares_store() {
        let server = memory_server(ServerConfig::default().with_max_entries(5));
        server.store().append(None, Payload::new()).unwrap();

        assert_eq!(server.state().store().len(), 1);
        assert_eq!(server.store().config(), &LogStoreConfig::default().with_max_entries(5));
    }

    #[tokio::test]
    async fn test_serve_with_shutdown() {
        let server = memory_server(ServerConfig::default());
        let (tx, rx) = oneshot::channel::<()>();
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let handle = tokio::spawn(async move {
            server
                .serve_with_shutdown(addr, async {
                    let _ = rx.await;
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = occupied.local_addr().unwrap();
        let server = memory_server(ServerConfig::default());

        let err = server.serve(addr).await.unwrap_err();
        assert!(matches!(err, ApiError::BindFailed(a, _) if a == addr));
    }
}
