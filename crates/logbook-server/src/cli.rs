//! Command-line and environment configuration for the `logbook` binary.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use logbook_store::{DEFAULT_MAX_ENTRIES, MergePolicy};

use crate::config::{DEFAULT_LOG_FILE, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT, ServerConfig};
use crate::guard::TenancyMode;

/// Append-only JSON event log over HTTP.
#[derive(Debug, Parser)]
#[command(name = "logbook")]
#[command(version, about)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind to
    #[arg(long, env = "LOG_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Shared secret required in the `x-api-key` header
    #[arg(long, env = "LOG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path of the JSON file holding the log collection
    #[arg(long, env = "LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Number of entries kept before the oldest is evicted
    #[arg(long, env = "LOG_MAX_ENTRIES", default_value_t = DEFAULT_MAX_ENTRIES, value_parser = parse_capacity)]
    pub max_entries: usize,

    /// Whether callers must identify a tenant code
    #[arg(long, env = "LOG_TENANCY", value_enum, default_value_t = TenancyMode::Shared)]
    pub tenancy: TenancyMode,

    /// How payload keys combine with generated id, timestamp and code
    #[arg(long, env = "LOG_MERGE_POLICY", value_enum, default_value_t = MergePolicyArg::PayloadOverrides)]
    pub merge_policy: MergePolicyArg,

    /// Allowed CORS origin (repeatable; all origins when unset)
    #[arg(long = "cors-origin", env = "LOG_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Largest accepted request body in bytes
    #[arg(long, env = "LOG_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Diagnostic log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Diagnostic log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Merge policy as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MergePolicyArg {
    /// Payload `id`, `timestamp` and `code` replace generated values
    PayloadOverrides,
    /// Generated values win; reserved payload keys are dropped
    EnvelopeWins,
}

impl From<MergePolicyArg> for MergePolicy {
    fn from(arg: MergePolicyArg) -> Self {
        match arg {
            MergePolicyArg::PayloadOverrides => Self::PayloadOverrides,
            MergePolicyArg::EnvelopeWins => Self::EnvelopeWins,
        }
    }
}

impl ServeArgs {
    /// Address the server binds to.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Build the server configuration.
    #[must_use]
    pub fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::new(self.bind_addr())
            .with_tenancy(self.tenancy)
            .with_log_file(self.log_file)
            .with_max_entries(self.max_entries)
            .with_merge_policy(self.merge_policy.into())
            .with_max_body_bytes(self.max_body_bytes);

        if let Some(key) = self.api_key {
            config = config.with_api_key(key);
        }
        for origin in self.cors_origins {
            let origin = origin.trim();
            if !origin.is_empty() {
                config = config.with_cors_origin(origin);
            }
        }
        config
    }
}

fn parse_capacity(raw: &str) -> Result<usize, String> {
    let value: usize = raw
        .parse()
        .map_err(|e| format!("invalid entry count: {e}"))?;
    if value == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        ServeArgs::command().debug_assert();
    }

    #[test]
    fn test_explicit_flags() {
        let args = ServeArgs::try_parse_from([
            "logbook",
            "--port",
            "8081",
            "--host",
            "127.0.0.1",
            "--api-key",
            "s3cret",
            "--log-file",
            "/tmp/logs.json",
            "--max-entries",
            "25",
            "--tenancy",
            "per-code",
            "--merge-policy",
            "envelope-wins",
            "--cors-origin",
            "http://a.example,http://b.example",
            "--max-body-bytes",
            "2048",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.log_format, LogFormat::Json);
        let config = args.into_config();
        assert_eq!(config.bind_addr, "127.0.0.1:8081".parse().unwrap());
        assert!(config.api_key.is_some_and(|key| key.matches(b"s3cret")));
        assert_eq!(config.log_file, PathBuf::from("/tmp/logs.json"));
        assert_eq!(config.store.max_entries, 25);
        assert_eq!(config.store.merge_policy, MergePolicy::EnvelopeWins);
        assert_eq!(config.tenancy, TenancyMode::PerCode);
        assert_eq!(
            config.cors_origins,
            vec!["http://a.example", "http://b.example"]
        );
        assert_eq!(config.max_body_bytes, 2048);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = ServeArgs::try_parse_from(["logbook", "--max-entries", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_tenancy_is_rejected() {
        let result = ServeArgs::try_parse_from(["logbook", "--tenancy", "isolated"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_api_key_disables_check() {
        let args = ServeArgs::try_parse_from(["logbook", "--api-key", ""]).unwrap();
        assert!(args.into_config().api_key.is_none());
    }

    #[test]
    fn test_parse_capacity() {
        assert_eq!(parse_capacity("1"), Ok(1));
        assert_eq!(parse_capacity("1000"), Ok(1000));
        assert!(parse_capacity("0").is_err());
        assert!(parse_capacity("-3").is_err());
        assert!(parse_capacity("many").is_err());
    }

    #[test]
    fn test_merge_policy_conversion() {
        assert_eq!(
            MergePolicy::from(MergePolicyArg::PayloadOverrides),
            MergePolicy::PayloadOverrides
        );
        assert_eq!(
            MergePolicy::from(MergePolicyArg::EnvelopeWins),
            MergePolicy::EnvelopeWins
        );
    }
}
