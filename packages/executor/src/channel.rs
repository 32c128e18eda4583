//! The two RPC surfaces of a node.
//!
//! [`StatusChannel`] covers the CometBFT JSON-RPC endpoints (status, blocks,
//! commits, validators) and [`QueryChannel`] covers the Cosmos SDK gRPC query
//! services. The pool, monitor and builders are written against these traits
//! so that the network implementations in [`crate::rpc`] and [`crate::grpc`]
//! can be swapped for in-memory nodes in tests.

use std::sync::Arc;

use async_trait::async_trait;
use cosmos_sdk_proto::Any;
use tendermint::{block::signed_header::SignedHeader, validator, Block};
use tendermint_rpc::endpoint::block_results;

use crate::error::NodeError;

/// A validator as reported by the node, including the BLS key the relayer
/// uses for cross-chain signature verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorRecord {
    /// The consensus-level validator entry.
    pub info: validator::Info,
    /// Raw relayer BLS public key. Empty when the node does not report one.
    pub bls_key: Vec<u8>,
}

impl From<validator::Info> for ValidatorRecord {
    fn from(info: validator::Info) -> Self {
        Self {
            info,
            bls_key: Vec::new(),
        }
    }
}

/// The streaming/status surface of a node.
#[async_trait]
pub trait StatusChannel: Send + Sync + 'static {
    /// Latest block height the node has synced.
    async fn latest_block_height(&self) -> Result<u64, NodeError>;

    /// The full block at `height`.
    async fn block_at(&self, height: u64) -> Result<Block, NodeError>;

    /// Execution results of the block at `height`.
    async fn block_results_at(&self, height: u64) -> Result<block_results::Response, NodeError>;

    /// Validator set effective at `height`, or at the latest height when `None`.
    async fn validators_at(&self, height: Option<u64>) -> Result<Vec<ValidatorRecord>, NodeError>;

    /// Header plus commit signatures for `height`.
    async fn signed_header_at(&self, height: u64) -> Result<SignedHeader, NodeError>;
}

/// The binary query surface of a node.
#[async_trait]
pub trait QueryChannel: Send + Sync + 'static {
    /// Raw account payload for `address`. `Ok(None)` when the node answered
    /// without a payload.
    async fn account(&self, address: &str) -> Result<Option<Any>, NodeError>;
}

#[async_trait]
impl<T: StatusChannel + ?Sized> StatusChannel for Arc<T> {
    async fn latest_block_height(&self) -> Result<u64, NodeError> {
        (**self).latest_block_height().await
    }

    async fn block_at(&self, height: u64) -> Result<Block, NodeError> {
        (**self).block_at(height).await
    }

    async fn block_results_at(&self, height: u64) -> Result<block_results::Response, NodeError> {
        (**self).block_results_at(height).await
    }

    async fn validators_at(&self, height: Option<u64>) -> Result<Vec<ValidatorRecord>, NodeError> {
        (**self).validators_at(height).await
    }

    async fn signed_header_at(&self, height: u64) -> Result<SignedHeader, NodeError> {
        (**self).signed_header_at(height).await
    }
}

#[async_trait]
impl<T: QueryChannel + ?Sized> QueryChannel for Arc<T> {
    async fn account(&self, address: &str) -> Result<Option<Any>, NodeError> {
        (**self).account(address).await
    }
}
