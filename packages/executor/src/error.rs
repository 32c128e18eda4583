//! Error types for the executor.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single call against a remote node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NodeError {
    /// The node could not be reached or the call failed in transit.
    #[error("transport error: {0}")]
    Transport(String),
    /// The call did not complete within its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The requested height or address does not exist on the node.
    #[error("not found: {0}")]
    NotFound(String),
    /// The node answered, but the payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// The requested height is not a valid block height.
    #[error("invalid block height {0}")]
    InvalidHeight(u64),
}

impl NodeError {
    /// Whether a retry of the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

impl From<tendermint_rpc::Error> for NodeError {
    fn from(err: tendermint_rpc::Error) -> Self {
        let msg = err.to_string();
        // CometBFT reports unknown heights as an RPC response error, not a status code.
        if msg.contains("must be less than or equal to")
            || msg.contains("could not find")
            || msg.contains("not found")
        {
            Self::NotFound(msg)
        } else {
            Self::Transport(msg)
        }
    }
}

impl From<tonic::Status> for NodeError {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::NotFound => Self::NotFound(status.message().to_string()),
            tonic::Code::DeadlineExceeded => Self::Transport(format!(
                "deadline exceeded: {}",
                status.message()
            )),
            _ => Self::Transport(status.to_string()),
        }
    }
}

impl From<prost::DecodeError> for NodeError {
    fn from(err: prost::DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Errors raised while loading configuration or constructing the executor.
///
/// These are startup failures; the process is expected to abort on them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading `{0}`: {1}")]
    Io(String, #[source] std::io::Error),
    /// The config file is not valid TOML for the expected schema.
    #[error("invalid TOML in config: {0}")]
    Toml(#[from] toml::de::Error),
    /// No node addresses were configured.
    #[error("no node endpoints configured")]
    NoEndpoints,
    /// The status and query address lists must pair up index by index.
    #[error("rpc_addrs has {rpc} entries but grpc_addrs has {grpc}")]
    AddressCountMismatch {
        /// Number of status channel addresses.
        rpc: usize,
        /// Number of query channel addresses.
        grpc: usize,
    },
    /// The same provider appears twice in the pool.
    #[error("duplicate node provider `{0}`")]
    DuplicateProvider(String),
    /// A node address could not be turned into a channel.
    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint {
        /// The offending address.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The signing key is malformed.
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    /// The environment variable holding the signing key is not set.
    #[error("environment variable `{0}` holding the private key is not set")]
    MissingKeyEnv(String),
    /// Any other rejected setting.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
