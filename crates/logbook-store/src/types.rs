//! Core types for the log collection.
//!
//! This module provides:
//! - [`LogId`]: Numeric identifier issued by the store
//! - [`EntryId`] and [`Timestamp`]: Envelope values as stored, which may be
//!   caller overrides kept verbatim
//! - [`LogEntry`]: Fixed envelope (id, code, timestamp) plus open fields
//! - [`MergePolicy`]: How caller payloads combine with the envelope
//! - [`Scope`]: Which entries a listing covers

use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied attributes for a new entry.
pub type Payload = Map<String, Value>;

/// Payload keys that address envelope fields rather than open attributes,
/// in the order `id`, `timestamp`, `code`.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "timestamp", "code"];

/// Numeric identifier issued by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(pub u64);

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier as stored on an entry.
///
/// Issued ids are numbers. An `id` supplied in the payload is kept exactly
/// as sent, whatever its JSON type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Value);

impl EntryId {
    /// Wraps a raw JSON value.
    #[must_use]
    pub const fn verbatim(value: Value) -> Self {
        Self(value)
    }

    /// Returns the numeric id, if this id is a non-negative integer.
    #[must_use]
    pub fn as_log_id(&self) -> Option<LogId> {
        self.0.as_u64().map(LogId)
    }

    /// Returns the stored JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<LogId> for EntryId {
    fn from(id: LogId) -> Self {
        Self(Value::from(id.0))
    }
}

impl PartialEq<LogId> for EntryId {
    fn eq(&self, other: &LogId) -> bool {
        self.as_log_id() == Some(*other)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(raw) => f.write_str(raw),
            other => write!(f, "{other}"),
        }
    }
}

/// Creation time as stored on an entry.
///
/// Generated timestamps are RFC 3339 strings with millisecond precision and
/// a `Z` suffix. A `timestamp` supplied in the payload is kept exactly as
/// sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(Value);

impl Timestamp {
    /// Current time, truncated to milliseconds.
    #[must_use]
    pub fn now() -> Self {
        Self::from(now_timestamp())
    }

    /// Wraps a raw JSON value.
    #[must_use]
    pub const fn verbatim(value: Value) -> Self {
        Self(value)
    }

    /// Returns the timestamp text, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    /// Parses the timestamp, if it is an RFC 3339 string.
    #[must_use]
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.as_str().and_then(|raw| parse_timestamp(raw).ok())
    }

    /// Returns the stored JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(timestamp: DateTime<Utc>) -> Self {
        Self(Value::String(format_timestamp(&timestamp)))
    }
}

/// How a caller payload is merged over the synthesized envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Payload keys `id`, `timestamp` and `code` replace the generated values.
    #[default]
    PayloadOverrides,
    /// Generated values are kept; reserved payload keys are discarded.
    EnvelopeWins,
}

/// Which entries a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Every entry in the collection.
    All,
    /// Only entries owned by the given tenant code.
    Tenant(&'a str),
}

/// A structured log entry: a small fixed envelope plus open attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Identifier for this entry
    pub id: EntryId,
    /// Owning tenant code, if any
    #[serde(
        default,
        deserialize_with = "deserialize_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<String>,
    /// When the entry was created
    pub timestamp: Timestamp,
    /// Caller-supplied attributes, flattened alongside the envelope
    #[serde(flatten)]
    pub fields: Payload,
}

impl LogEntry {
    /// Builds an entry from a synthesized envelope and a caller payload.
    ///
    /// Under [`MergePolicy::PayloadOverrides`] a payload `id` or `timestamp`
    /// replaces the generated one verbatim, and a payload `code` replaces the
    /// tenant code after normalization (see [`normalize_code`]). A `code`
    /// that normalizes to nothing leaves the tenant code in place.
    #[must_use]
    pub fn compose(
        id: LogId,
        code: Option<String>,
        timestamp: Timestamp,
        mut payload: Payload,
        policy: MergePolicy,
    ) -> Self {
        let [id_override, timestamp_override, code_override] =
            RESERVED_FIELDS.map(|key| payload.remove(key));

        let mut entry = Self {
            id: id.into(),
            code,
            timestamp,
            fields: payload,
        };

        if policy == MergePolicy::PayloadOverrides {
            if let Some(value) = id_override {
                entry.id = EntryId(value);
            }
            if let Some(value) = timestamp_override {
                entry.timestamp = Timestamp(value);
            }
            if let Some(code) = code_override.as_ref().and_then(normalize_code_value) {
                entry.code = Some(code);
            }
        }

        entry
    }

    /// Returns the conventional `type` attribute, used for diagnostics.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.fields.get("type").and_then(Value::as_str)
    }

    /// Returns true if this entry is owned by the given tenant code.
    #[must_use]
    pub fn belongs_to(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }

    /// Checks if this entry falls within the scope.
    #[must_use]
    pub fn in_scope(&self, scope: Scope<'_>) -> bool {
        match scope {
            Scope::All => true,
            Scope::Tenant(code) => self.belongs_to(code),
        }
    }
}

/// Canonical form of a tenant code: trimmed, and `None` when blank.
///
/// Every code the store compares or records goes through this function.
#[must_use]
pub fn normalize_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Current time truncated to millisecond precision.
#[must_use]
pub fn now_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Formats a timestamp as RFC 3339 with milliseconds and a `Z` suffix.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 timestamp into UTC.
///
/// # Errors
///
/// Returns the chrono parse error if the string is not RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

/// Canonical tenant code for a JSON value.
///
/// Strings are normalized with [`normalize_code`]. Other non-null values use
/// their JSON text, so `9` and `"9"` name the same tenant.
#[must_use]
pub fn normalize_code_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(raw) => normalize_code(raw),
        other => normalize_code(&other.to_string()),
    }
}

fn deserialize_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(normalize_code_value))
}
