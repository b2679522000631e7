//! # logbook-server
//!
//! Minimal append-only event logging service over HTTP.
//!
//! Clients post arbitrary JSON objects, which are stamped with an id and a
//! timestamp and appended to a bounded collection persisted as one JSON
//! file. Entries can be listed and deleted per tenant code.
//!
//! ## Features
//!
//! - **Shared secret**: optional `x-api-key` check on every data route
//! - **Tenancy**: `shared` (one log) or `per-code` (callers must identify a
//!   tenant and only see their own entries)
//! - **Bounded**: the oldest entry is evicted once the collection is full
//!
//! ## Example
//!
//! ```rust,no_run
//! use logbook_server::{LogServer, ServerConfig, TenancyMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), logbook_server::ApiError> {
//!     let config = ServerConfig::default()
//!         .with_api_key("s3cret")
//!         .with_tenancy(TenancyMode::PerCode);
//!     let addr = config.bind_addr;
//!
//!     let server = LogServer::open(config)?;
//!     server.serve(addr).await
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/` | GET | Health check |
//! | `/log` | POST | Append the JSON object body as an entry |
//! | `/logs` | GET | List entries visible to the caller |
//! | `/logs` | DELETE | Delete every entry owned by the caller's code |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use cli::{LogFormat, ServeArgs};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use guard::{AccessGuard, Caller, SharedSecret, TenancyMode, TenantCode};
pub use routes::create_router;
pub use server::LogServer;
pub use state::AppState;
