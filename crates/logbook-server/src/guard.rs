//! Request admission: shared-secret check and tenant-code resolution.
//!
//! Guarded routes run [`guard_request`] as middleware. It rejects requests
//! whose `x-api-key` does not match the configured secret, then resolves the
//! caller's tenant code from, in order:
//!
//! 1. the `x-project-code` header
//! 2. the `code` query parameter
//! 3. the `code` field of a JSON request body
//!
//! The first non-blank value wins and is attached to the request as a
//! [`ResolvedCode`] extension. Handlers read it through [`Caller`].

use std::fmt;

use axum::body::{Body, Bytes};
use axum::extract::{FromRequestParts, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use axum::middleware::Next;
use axum::response::Response;
use clap::ValueEnum;
use http_body_util::LengthLimitError;
use logbook_store::{Scope, normalize_code, normalize_code_value};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the tenant code.
pub const CODE_HEADER: &str = "x-project-code";

/// Query parameter and body field carrying the tenant code.
pub const CODE_PARAM: &str = "code";

/// Whether append and list calls must identify a tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TenancyMode {
    /// One shared log. A code is optional and is recorded when given.
    #[default]
    Shared,
    /// Every call must carry a code; listings only show that tenant.
    PerCode,
}

/// API key compared in constant time and wiped from memory on drop.
#[derive(Clone)]
pub struct SharedSecret(Zeroizing<String>);

impl SharedSecret {
    /// Wraps `value`, or returns `None` if it is empty.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            return None;
        }
        Some(Self(Zeroizing::new(value)))
    }

    /// Returns true if `candidate` equals the secret.
    #[must_use]
    pub fn matches(&self, candidate: &[u8]) -> bool {
        self.0.as_bytes().ct_eq(candidate).into()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedSecret").field(&"[REDACTED]").finish()
    }
}

/// A non-blank, trimmed tenant code.
///
/// Normalized exactly as the store normalizes codes it records, so a code
/// resolved here always matches the entries it addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantCode(String);

impl TenantCode {
    /// Trims `raw`; returns `None` if nothing is left.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        normalize_code(raw).map(Self)
    }

    /// Reads a code from a JSON value; non-string scalars use their JSON text.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        normalize_code_value(value).map(Self)
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request extension holding the code resolved by [`guard_request`].
#[derive(Debug, Clone, Default)]
pub struct ResolvedCode(pub Option<TenantCode>);

/// Admission policy built from the server configuration.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    secret: Option<SharedSecret>,
    tenancy: TenancyMode,
    max_body_bytes: usize,
}

impl AccessGuard {
    /// Creates a guard.
    #[must_use]
    pub const fn new(
        secret: Option<SharedSecret>,
        tenancy: TenancyMode,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            secret,
            tenancy,
            max_body_bytes,
        }
    }

    /// Creates a guard from the server configuration.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.api_key.clone(), config.tenancy, config.max_body_bytes)
    }

    /// Returns the tenancy mode.
    #[must_use]
    pub const fn tenancy(&self) -> TenancyMode {
        self.tenancy
    }

    /// Returns true if append and list require a code.
    #[must_use]
    pub const fn requires_code(&self) -> bool {
        matches!(self.tenancy, TenancyMode::PerCode)
    }

    /// Checks the shared secret, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the key header is missing or wrong.
    pub fn check_secret(&self, headers: &HeaderMap) -> ApiResult<()> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };
        let presented = headers
            .get(API_KEY_HEADER)
            .map_or(&[][..], |value| value.as_bytes());
        if secret.matches(presented) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    /// Resolves the tenant code, buffering the body only when the header and
    /// query carry none. Returns the request with its body restored.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::PayloadTooLarge`] if the body exceeds the limit.
    pub async fn resolve_code(&self, request: Request) -> ApiResult<(Request, Option<TenantCode>)> {
        if let Some(code) =
            code_from_headers(request.headers()).or_else(|| code_from_query(request.uri()))
        {
            return Ok((request, Some(code)));
        }

        let (parts, body) = request.into_parts();
        let bytes = read_body(body, self.max_body_bytes).await?;
        let code = code_from_body(&bytes);
        Ok((Request::from_parts(parts, Body::from(bytes)), code))
    }
}

/// Middleware applied to every guarded route.
pub async fn guard_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let guard = state.guard();
    if let Err(err) = guard.check_secret(request.headers()) {
        debug!(path = %request.uri().path(), "rejected request with bad api key");
        return Err(err);
    }

    let (mut request, code) = guard.resolve_code(request).await?;
    request.extensions_mut().insert(ResolvedCode(code));
    Ok(next.run(request).await)
}

/// Reads a request body up to `limit` bytes.
pub(crate) async fn read_body(body: Body, limit: usize) -> ApiResult<Bytes> {
    axum::body::to_bytes(body, limit).await.map_err(|err| {
        let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
        while let Some(cause) = source {
            if cause.is::<LengthLimitError>() {
                return ApiError::PayloadTooLarge(limit);
            }
            source = cause.source();
        }
        ApiError::InvalidRequest(format!("failed to read request body: {err}"))
    })
}

/// Code from the `x-project-code` header.
pub fn code_from_headers(headers: &HeaderMap) -> Option<TenantCode> {
    headers
        .get(CODE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(TenantCode::parse)
}

#[derive(Deserialize)]
struct CodeQuery {
    code: Option<String>,
}

/// Code from the `code` query parameter.
pub fn code_from_query(uri: &Uri) -> Option<TenantCode> {
    let Query(query) = Query::<CodeQuery>::try_from_uri(uri).ok()?;
    query.code.as_deref().and_then(TenantCode::parse)
}

/// Code from the `code` field of a JSON object body.
pub fn code_from_body(bytes: &[u8]) -> Option<TenantCode> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    value.get(CODE_PARAM).and_then(TenantCode::from_value)
}

/// The admitted caller, as seen by append and list handlers.
///
/// Extraction fails with [`ApiError::CodeRequired`] in
/// [`TenancyMode::PerCode`] when no code was resolved.
#[derive(Debug, Clone)]
pub struct Caller {
    code: Option<TenantCode>,
    tenancy: TenancyMode,
}

impl Caller {
    /// Returns the caller's tenant code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_ref().map(TenantCode::as_str)
    }

    /// Returns the listing scope: the caller's tenant in per-code mode,
    /// everything otherwise.
    #[must_use]
    pub fn scope(&self) -> Scope<'_> {
        match (self.tenancy, self.code()) {
            (TenancyMode::PerCode, Some(code)) => Scope::Tenant(code),
            _ => Scope::All,
        }
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let code = parts
            .extensions
            .get::<ResolvedCode>()
            .and_then(|resolved| resolved.0.clone());
        let guard = state.guard();
        if code.is_none() && guard.requires_code() {
            return Err(ApiError::CodeRequired);
        }
        Ok(Self {
            code,
            tenancy: guard.tenancy(),
        })
    }
}
