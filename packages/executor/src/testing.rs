//! In-memory nodes for unit tests.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use cosmos_sdk_proto::Any;
use tendermint::{block::signed_header::SignedHeader, Block};
use tendermint_rpc::endpoint::block_results;
use tendermint_testgen::Generator;

use crate::{
    channel::{QueryChannel, StatusChannel, ValidatorRecord},
    error::NodeError,
    handle::NodeHandle,
    pool::ClientPool,
};

pub type FakePool = ClientPool<Arc<FakeNode>, Arc<FakeNode>>;

/// A node whose answers are set by the test.
#[derive(Debug)]
pub struct FakeNode {
    height: Mutex<Result<u64, NodeError>>,
    validators: Mutex<Result<Vec<ValidatorRecord>, NodeError>>,
    signed_header: Mutex<Result<SignedHeader, NodeError>>,
    account: Mutex<Result<Option<Any>, NodeError>>,
    pub height_calls: AtomicU32,
    pub validator_calls: AtomicU32,
}

impl FakeNode {
    pub fn at_height(height: u64) -> Arc<Self> {
        Arc::new(Self {
            height: Mutex::new(Ok(height)),
            validators: Mutex::new(Ok(Vec::new())),
            signed_header: Mutex::new(Err(NodeError::NotFound("no commit".into()))),
            account: Mutex::new(Ok(None)),
            height_calls: AtomicU32::new(0),
            validator_calls: AtomicU32::new(0),
        })
    }

    pub fn set_height(&self, height: Result<u64, NodeError>) {
        *self.height.lock().unwrap() = height;
    }

    pub fn set_validators(&self, validators: Result<Vec<ValidatorRecord>, NodeError>) {
        *self.validators.lock().unwrap() = validators;
    }

    pub fn set_signed_header(&self, header: Result<SignedHeader, NodeError>) {
        *self.signed_header.lock().unwrap() = header;
    }

    pub fn set_account(&self, account: Result<Option<Any>, NodeError>) {
        *self.account.lock().unwrap() = account;
    }
}

#[async_trait]
impl StatusChannel for FakeNode {
    async fn latest_block_height(&self) -> Result<u64, NodeError> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        self.height.lock().unwrap().clone()
    }

    async fn block_at(&self, height: u64) -> Result<Block, NodeError> {
        Err(NodeError::NotFound(format!("block {height}")))
    }

    async fn block_results_at(&self, height: u64) -> Result<block_results::Response, NodeError> {
        Err(NodeError::NotFound(format!("block results {height}")))
    }

    async fn validators_at(&self, _height: Option<u64>) -> Result<Vec<ValidatorRecord>, NodeError> {
        self.validator_calls.fetch_add(1, Ordering::SeqCst);
        self.validators.lock().unwrap().clone()
    }

    async fn signed_header_at(&self, _height: u64) -> Result<SignedHeader, NodeError> {
        self.signed_header.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryChannel for FakeNode {
    async fn account(&self, _address: &str) -> Result<Option<Any>, NodeError> {
        self.account.lock().unwrap().clone()
    }
}

/// Builds a pool of fake nodes named `node-0`, `node-1`, ... at the given heights.
pub fn fake_pool(heights: &[u64]) -> (Arc<FakePool>, Vec<Arc<FakeNode>>) {
    let nodes: Vec<_> = heights.iter().map(|h| FakeNode::at_height(*h)).collect();
    let handles = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| NodeHandle::new(format!("node-{i}"), node.clone(), node.clone()))
        .collect();
    (Arc::new(ClientPool::new(handles).unwrap()), nodes)
}

/// Validators with distinct BLS keys, generated by `tendermint-testgen`.
pub fn validators(names: &[&str]) -> Vec<ValidatorRecord> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| ValidatorRecord {
            info: tendermint_testgen::Validator::new(name)
                .voting_power(50)
                .generate()
                .unwrap(),
            bls_key: vec![u8::try_from(i).unwrap(); 48],
        })
        .collect()
}
