//! Configuration file of the challenger.

use std::{collections::HashSet, fmt, fs, path::Path, str::FromStr, time::Duration};

use challenger_utils::ensure;
use serde::Deserialize;
use tracing::Level;

use crate::{error::ConfigError, monitor::MonitorConfig, retry::RetryPolicy};

/// The top level configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ChallengerConfig {
    /// Nodes and signing key of the Greenfield chain.
    pub greenfield: GreenfieldConfig,
    /// Health monitor and validator refresh tunables.
    #[serde(default)]
    pub monitor: MonitorSettings,
    /// Logging and tracing.
    #[serde(default)]
    pub log: LogConfig,
    /// Prometheus endpoint.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl ChallengerConfig {
    /// Load a `ChallengerConfig` from a TOML file on disk and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid TOML for this
    /// schema, or fails [`Self::validate`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .map_err(|e| ConfigError::Io(path_ref.display().to_string(), e))?;
        contents.parse()
    }

    /// Checks the invariants the executor relies on.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let greenfield = &self.greenfield;
        ensure!(!greenfield.rpc_addrs.is_empty(), ConfigError::NoEndpoints);
        ensure!(
            greenfield.rpc_addrs.len() == greenfield.grpc_addrs.len(),
            ConfigError::AddressCountMismatch {
                rpc: greenfield.rpc_addrs.len(),
                grpc: greenfield.grpc_addrs.len(),
            }
        );

        let mut seen = HashSet::new();
        for addr in &greenfield.rpc_addrs {
            ensure!(
                seen.insert(addr.as_str()),
                ConfigError::DuplicateProvider(addr.clone())
            );
        }

        let monitor = &self.monitor;
        for (name, value) in [
            ("greenfield.request_timeout_secs", greenfield.request_timeout_secs),
            ("monitor.update_client_interval_secs", monitor.update_client_interval_secs),
            ("monitor.update_validators_interval_secs", monitor.update_validators_interval_secs),
            ("monitor.deny_service_threshold_secs", monitor.deny_service_threshold_secs),
            ("monitor.height_query_timeout_secs", monitor.height_query_timeout_secs),
        ] {
            ensure!(value > 0, ConfigError::Invalid(format!("{name} must be positive")));
        }
        ensure!(
            monitor.height_query_attempts > 0,
            ConfigError::Invalid("monitor.height_query_attempts must be positive".to_string())
        );

        Ok(())
    }
}

impl FromStr for ChallengerConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

/// Greenfield nodes and signing key.
#[derive(Clone, Debug, Deserialize)]
pub struct GreenfieldConfig {
    /// CometBFT JSON-RPC addresses, one per node.
    pub rpc_addrs: Vec<String>,
    /// Cosmos SDK gRPC addresses, paired index by index with `rpc_addrs`.
    pub grpc_addrs: Vec<String>,
    /// Deadline of a single remote request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Where the signing key comes from.
    pub key: KeyConfig,
}

impl GreenfieldConfig {
    /// [`Self::request_timeout_secs`] as a duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

const fn default_request_timeout_secs() -> u64 {
    10
}

/// Source of the hex encoded secp256k1 signing key.
#[derive(Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KeyConfig {
    /// The key is written in the config file.
    Local {
        /// Hex encoded key, with or without `0x`.
        private_key: String,
    },
    /// The key is read from an environment variable at startup.
    Env {
        /// Name of the variable.
        var: String,
    },
}

impl fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { .. } => f.debug_struct("Local").finish_non_exhaustive(),
            Self::Env { var } => f.debug_struct("Env").field("var", var).finish(),
        }
    }
}

/// Health monitor and validator refresh tunables. Every field is optional.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorSettings {
    /// Seconds between two health checks.
    pub update_client_interval_secs: u64,
    /// Seconds between two validator set refreshes.
    pub update_validators_interval_secs: u64,
    /// Blocks the active node may lag behind before it is replaced.
    pub fall_behind_threshold: u64,
    /// Seconds without a successful height read before a node is reported.
    pub deny_service_threshold_secs: u64,
    /// Attempts of each height query.
    pub height_query_attempts: u32,
    /// Milliseconds between two height query attempts.
    pub height_query_delay_ms: u64,
    /// Deadline of each height query attempt.
    pub height_query_timeout_secs: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        let defaults = MonitorConfig::default();
        Self {
            update_client_interval_secs: defaults.interval.as_secs(),
            update_validators_interval_secs: 60,
            fall_behind_threshold: defaults.fall_behind_threshold,
            deny_service_threshold_secs: defaults.deny_service_threshold.as_secs(),
            height_query_attempts: defaults.height_query.attempts,
            height_query_delay_ms: 1000,
            height_query_timeout_secs: defaults.height_query.attempt_timeout.as_secs(),
        }
    }
}

impl MonitorSettings {
    /// Settings of the health monitor.
    #[must_use]
    pub const fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.update_client_interval_secs),
            fall_behind_threshold: self.fall_behind_threshold,
            deny_service_threshold: Duration::from_secs(self.deny_service_threshold_secs),
            height_query: self.height_query_policy(),
        }
    }

    /// Retry policy of height queries.
    #[must_use]
    pub const fn height_query_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.height_query_attempts,
            delay: Duration::from_millis(self.height_query_delay_ms),
            attempt_timeout: Duration::from_secs(self.height_query_timeout_secs),
        }
    }

    /// Pause between two validator set refreshes.
    #[must_use]
    pub const fn validators_interval(&self) -> Duration {
        Duration::from_secs(self.update_validators_interval_secs)
    }
}

/// Logging and tracing.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level, overridden by `RUST_LOG`.
    pub level: String,
    /// Whether spans are exported over OTLP.
    pub use_otel: bool,
    /// OTLP collector endpoint.
    pub otel_endpoint: Option<String>,
    /// Service name reported to the collector.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            use_otel: false,
            otel_endpoint: None,
            service_name: "challenger".to_string(),
        }
    }
}

impl LogConfig {
    /// Returns the configured log level, `INFO` when unparsable.
    #[must_use]
    pub fn level(&self) -> Level {
        Level::from_str(&self.level).unwrap_or(Level::INFO)
    }
}

/// The Prometheus endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Address to bind to.
    pub address: String,
    /// Port to bind to.
    pub port: u16,
    /// Whether `/metrics` is served at all.
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 9000,
            enabled: true,
        }
    }
}
