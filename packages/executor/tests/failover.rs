//! Foreground queries follow the health monitor across a failover.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use challenger_executor::{
    account::BASE_ACCOUNT_TYPE_URL, light_block::decode_light_block, ClientPool, Executor,
    HealthMonitor, Identity, LogAlertSink, MonitorConfig, NodeError, NodeHandle, QueryChannel,
    StatusChannel, ValidatorRecord,
};
use cosmos_sdk_proto::{cosmos::auth::v1beta1::BaseAccount, Any};
use prost::Message;
use tendermint::{block::signed_header::SignedHeader, validator, Block};
use tendermint_rpc::endpoint::block_results;
use tendermint_testgen::{Generator, LightBlock};

const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// A node that serves generated blocks up to its current height.
struct SimNode {
    name: &'static str,
    height: AtomicU64,
    down: AtomicBool,
}

impl SimNode {
    fn new(name: &'static str, height: u64) -> Arc<Self> {
        Arc::new(Self {
            name,
            height: AtomicU64::new(height),
            down: AtomicBool::new(false),
        })
    }

    fn check(&self, height: Option<u64>) -> Result<(), NodeError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(NodeError::Transport(format!("{} is down", self.name)));
        }
        match height {
            Some(h) if h > self.height.load(Ordering::SeqCst) => {
                Err(NodeError::NotFound(format!("height {h} is not available yet")))
            }
            _ => Ok(()),
        }
    }

    fn light_block(height: u64) -> (SignedHeader, Vec<validator::Info>) {
        let block = LightBlock::new_default(height).generate().unwrap();
        (block.signed_header, block.validators.validators().clone())
    }
}

#[async_trait]
impl StatusChannel for SimNode {
    async fn latest_block_height(&self) -> Result<u64, NodeError> {
        self.check(None)?;
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn block_at(&self, height: u64) -> Result<Block, NodeError> {
        self.check(Some(height))?;
        Err(NodeError::NotFound(format!("{} keeps no block bodies", self.name)))
    }

    async fn block_results_at(&self, height: u64) -> Result<block_results::Response, NodeError> {
        self.check(Some(height))?;
        Err(NodeError::NotFound(format!("{} keeps no block results", self.name)))
    }

    async fn validators_at(&self, height: Option<u64>) -> Result<Vec<ValidatorRecord>, NodeError> {
        self.check(height)?;
        let height = height.unwrap_or_else(|| self.height.load(Ordering::SeqCst));
        Ok(Self::light_block(height)
            .1
            .into_iter()
            .map(|info| ValidatorRecord {
                info,
                bls_key: self.name.as_bytes().to_vec(),
            })
            .collect())
    }

    async fn signed_header_at(&self, height: u64) -> Result<SignedHeader, NodeError> {
        self.check(Some(height))?;
        Ok(Self::light_block(height).0)
    }
}

#[async_trait]
impl QueryChannel for SimNode {
    async fn account(&self, address: &str) -> Result<Option<Any>, NodeError> {
        self.check(None)?;
        Ok(Some(Any {
            type_url: BASE_ACCOUNT_TYPE_URL.to_string(),
            value: BaseAccount {
                address: address.to_string(),
                pub_key: None,
                account_number: 3,
                sequence: self.height.load(Ordering::SeqCst),
            }
            .encode_to_vec(),
        }))
    }
}

const MONITOR: MonitorConfig = MonitorConfig {
    interval: Duration::from_secs(10),
    fall_behind_threshold: 5,
    deny_service_threshold: Duration::from_secs(60),
    height_query: challenger_executor::RetryPolicy {
        attempts: 2,
        delay: Duration::from_millis(500),
        attempt_timeout: Duration::from_secs(1),
    },
};

fn setup(
    nodes: &[Arc<SimNode>],
) -> (
    Executor<Arc<SimNode>, Arc<SimNode>>,
    HealthMonitor<Arc<SimNode>, Arc<SimNode>>,
) {
    let pool = Arc::new(
        ClientPool::new(
            nodes
                .iter()
                .map(|node| NodeHandle::new(node.name, node.clone(), node.clone()))
                .collect(),
        )
        .unwrap(),
    );
    let executor = Executor::new(
        pool.clone(),
        Identity::from_hex(KEY).unwrap(),
        Arc::new(LogAlertSink),
        MONITOR,
        Duration::from_secs(60),
    );
    let monitor = HealthMonitor::new(pool, Arc::new(LogAlertSink), MONITOR);
    (executor, monitor)
}

#[tokio::test(start_paused = true)]
async fn queries_move_to_the_highest_node_after_failover() {
    let primary = SimNode::new("primary", 40);
    let backup = SimNode::new("backup", 40);
    let (executor, monitor) = setup(&[primary.clone(), backup.clone()]);

    monitor.tick().await;
    assert_eq!(executor.latest_block_height_with_retry().await, Ok(40));

    // primary stalls while backup keeps producing
    primary.down.store(true, Ordering::SeqCst);
    backup.height.store(50, Ordering::SeqCst);
    let report = monitor.tick().await;

    assert_eq!(report.heights, vec![None, Some(50)]);
    assert_eq!(report.switched.map(|s| s.to), Some(1));
    assert_eq!(executor.pool().current_handle().provider(), "backup");
    assert_eq!(executor.latest_block_height_with_retry().await, Ok(50));
    assert_eq!(executor.account("0xabc").await.unwrap().sequence(), 50);

    let bytes = executor.light_block_bytes(48).await.unwrap();
    let (header, validators) = decode_light_block(&bytes).unwrap();
    assert_eq!(header.header.height.value(), 48);
    assert_eq!(validators.hash(), header.header.validators_hash);
}

#[tokio::test(start_paused = true)]
async fn light_block_beyond_the_tip_is_not_found() {
    let node = SimNode::new("only", 10);
    let (executor, _) = setup(&[node]);

    assert!(matches!(
        executor.light_block_bytes(11).await,
        Err(NodeError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn cached_validators_come_from_the_node_active_at_first_use() {
    let first = SimNode::new("first", 20);
    let second = SimNode::new("second", 30);
    let (executor, monitor) = setup(&[first, second]);

    monitor.tick().await;
    let keys = executor.validators_bls_public_keys().await.unwrap();

    assert!(!keys.is_empty());
    assert!(keys.iter().all(|key| *key == hex::encode("second")));
}
