//! Environment-style deployment knobs.
//!
//! Consumed by the driver and deployment tooling only — the core never
//! reads configuration, it takes explicit parameters.

use std::path::PathBuf;

/// A `host:port` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn parse(s: &str) -> Option<Self> {
        let (host, port) = s.rsplit_once(':')?;
        if host.is_empty() {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            port: port.parse().ok()?,
        })
    }
}

impl std::fmt::Display for HostPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Process configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where a persisting deployment would keep its state.
    pub data_dir: PathBuf,
    /// Upper bound on tracked identities.
    pub max_users: usize,
    /// Validator service endpoint.
    pub validator_addr: HostPort,
    /// Relay service endpoint.
    pub relay_addr: HostPort,
}

impl Config {
    /// Read from `MERIT_*` environment variables, with defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            data_dir: lookup("MERIT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            max_users: lookup("MERIT_MAX_USERS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            validator_addr: lookup("MERIT_VALIDATOR_ADDR")
                .and_then(|v| HostPort::parse(&v))
                .unwrap_or_else(|| HostPort {
                    host: "0.0.0.0".into(),
                    port: 5001,
                }),
            relay_addr: lookup("MERIT_RELAY_ADDR")
                .and_then(|v| HostPort::parse(&v))
                .unwrap_or_else(|| HostPort {
                    host: "0.0.0.0".into(),
                    port: 5002,
                }),
        }
    }
}
