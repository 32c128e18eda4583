//! The executor: every chain query the challenger needs, served by the
//! currently active node.

use std::{sync::Arc, time::Duration};

use tendermint::Block;
use tendermint_rpc::endpoint::block_results;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    account::{resolve_account, Account, AccountRegistry},
    alert::{AlertSink, LogAlertSink},
    channel::{QueryChannel, StatusChannel, ValidatorRecord},
    config::ChallengerConfig,
    error::{ConfigError, NodeError},
    grpc::GrpcQueryChannel,
    identity::Identity,
    light_block::build_light_block,
    monitor::{HealthMonitor, MonitorConfig},
    pool::ClientPool,
    retry::{log_height_query_retry, retry},
    rpc::TendermintStatusChannel,
    validators::ValidatorCache,
};

/// Owns the node pool, the validator cache and the signing identity.
///
/// Foreground calls go to the active node and are not retried, except for
/// [`Executor::latest_block_height_with_retry`]. The background tasks started
/// by [`Executor::spawn_background_tasks`] keep the active node and the
/// validator cache fresh.
pub struct Executor<S = TendermintStatusChannel, Q = GrpcQueryChannel> {
    pool: Arc<ClientPool<S, Q>>,
    validators: Arc<ValidatorCache>,
    accounts: AccountRegistry,
    identity: Identity,
    alerts: Arc<dyn AlertSink>,
    monitor: MonitorConfig,
    validators_interval: Duration,
}

impl<S, Q> std::fmt::Debug for Executor<S, Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("address", &self.identity.address())
            .field("nodes", &self.pool.len())
            .field("active", &self.pool.active_index())
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Connects to every configured node and loads the signing key.
    ///
    /// Must be called from within a tokio runtime. Alerts go to the log.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, a node address
    /// cannot be parsed or the key cannot be loaded.
    pub fn from_config(config: &ChallengerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let greenfield = &config.greenfield;
        let pool = ClientPool::connect(
            &greenfield.rpc_addrs,
            &greenfield.grpc_addrs,
            greenfield.request_timeout(),
        )?;
        let identity = Identity::from_config(&greenfield.key)?;

        tracing::info!(
            address = identity.address(),
            nodes = pool.len(),
            "executor initialised"
        );

        Ok(Self::new(
            Arc::new(pool),
            identity,
            Arc::new(LogAlertSink),
            config.monitor.monitor_config(),
            config.monitor.validators_interval(),
        ))
    }
}

impl<S, Q> Executor<S, Q>
where
    S: StatusChannel,
    Q: QueryChannel,
{
    /// Assembles an executor from its parts.
    pub fn new(
        pool: Arc<ClientPool<S, Q>>,
        identity: Identity,
        alerts: Arc<dyn AlertSink>,
        monitor: MonitorConfig,
        validators_interval: Duration,
    ) -> Self {
        Self {
            pool,
            validators: Arc::new(ValidatorCache::new()),
            accounts: AccountRegistry::default(),
            identity,
            alerts,
            monitor,
            validators_interval,
        }
    }

    /// Replaces the account decoders.
    #[must_use]
    pub fn with_account_registry(mut self, accounts: AccountRegistry) -> Self {
        self.accounts = accounts;
        self
    }

    /// The block at `height`.
    ///
    /// # Errors
    /// Returns the active node's error.
    pub async fn block_at_height(&self, height: u64) -> Result<Block, NodeError> {
        self.pool.active_status_channel().block_at(height).await
    }

    /// Execution results of the block at `height`.
    ///
    /// # Errors
    /// Returns the active node's error.
    pub async fn block_results_at_height(
        &self,
        height: u64,
    ) -> Result<block_results::Response, NodeError> {
        self.pool.active_status_channel().block_results_at(height).await
    }

    /// Latest height of the active node, retried per the height query policy.
    ///
    /// # Errors
    /// Returns the last attempt's error when every attempt fails.
    pub async fn latest_block_height_with_retry(&self) -> Result<u64, NodeError> {
        let handle = self.pool.current_handle();
        retry(
            self.monitor.height_query,
            log_height_query_retry(handle.provider()),
            || handle.status().latest_block_height(),
        )
        .await
    }

    /// Protobuf encoded `tendermint.types.LightBlock` at `height`.
    ///
    /// # Errors
    /// Returns the active node's error for either underlying query.
    pub async fn light_block_bytes(&self, height: u64) -> Result<Vec<u8>, NodeError> {
        build_light_block(self.pool.active_status_channel(), height).await
    }

    /// Validator set at `height`, bypassing the cache.
    ///
    /// # Errors
    /// Returns the active node's error.
    pub async fn validators_at_height(&self, height: u64) -> Result<Vec<ValidatorRecord>, NodeError> {
        self.pool.active_status_channel().validators_at(Some(height)).await
    }

    /// The cached latest validator set, fetched from the active node when the
    /// cache is still empty. The set may be up to one refresh interval old.
    ///
    /// # Errors
    /// Returns the active node's error when the cache is empty and the fetch
    /// fails.
    pub async fn cached_latest_validators(&self) -> Result<Arc<Vec<ValidatorRecord>>, NodeError> {
        self.validators.get_or_fetch(self.pool.as_ref()).await
    }

    /// Hex encoded BLS keys of the cached latest validators, in validator order.
    ///
    /// # Errors
    /// See [`Self::cached_latest_validators`].
    pub async fn validators_bls_public_keys(&self) -> Result<Vec<String>, NodeError> {
        Ok(self
            .cached_latest_validators()
            .await?
            .iter()
            .map(|validator| hex::encode(&validator.bls_key))
            .collect())
    }

    /// The account at `address`.
    ///
    /// # Errors
    /// See [`resolve_account`].
    pub async fn account(&self, address: &str) -> Result<Account, NodeError> {
        resolve_account(self.pool.active_query_channel(), &self.accounts, address).await
    }

    /// Checksummed address of the signing key.
    #[must_use]
    pub fn address(&self) -> &str {
        self.identity.address()
    }

    /// The signing identity.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The node pool.
    #[must_use]
    pub const fn pool(&self) -> &Arc<ClientPool<S, Q>> {
        &self.pool
    }

    /// The validator cache.
    #[must_use]
    pub const fn validator_cache(&self) -> &Arc<ValidatorCache> {
        &self.validators
    }

    /// Starts the health monitor and the validator refresh. Both stop once
    /// `shutdown` turns `true` or its sender is dropped.
    #[must_use]
    pub fn spawn_background_tasks(&self, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let monitor = HealthMonitor::new(self.pool.clone(), self.alerts.clone(), self.monitor);
        let monitor_task = tokio::spawn(monitor.run(shutdown.clone()));

        let pool = self.pool.clone();
        let cache = self.validators.clone();
        let interval = self.validators_interval;
        let shutdown = shutdown.clone();
        let validators_task =
            tokio::spawn(async move { cache.run(pool.as_ref(), interval, shutdown).await });

        vec![monitor_task, validators_task]
    }
}
