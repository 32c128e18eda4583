//! Health-driven failover between the nodes of a [`ClientPool`].

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tokio::{sync::watch, time::Instant};

use crate::{
    alert::AlertSink,
    channel::StatusChannel,
    grpc::GrpcQueryChannel,
    handle::NodeHandle,
    metrics::{self, FAILOVER_COUNTER, NODE_HEIGHT},
    pool::ClientPool,
    retry::{log_height_query_retry, retry, RetryPolicy},
    rpc::TendermintStatusChannel,
};

/// Deadline of a single alert delivery.
pub const ALERT_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables of the health monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Pause between two ticks.
    pub interval: Duration,
    /// Number of blocks the active node may lag behind the best node.
    pub fall_behind_threshold: u64,
    /// Silence after which a node is reported as unreachable.
    pub deny_service_threshold: Duration,
    /// Retry policy of the per-node height query.
    pub height_query: RetryPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            fall_behind_threshold: 5,
            deny_service_threshold: Duration::from_secs(60),
            height_query: RetryPolicy::HEIGHT_QUERY,
        }
    }
}

/// A move of the active pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Switch {
    /// Previously active index.
    pub from: usize,
    /// Newly active index.
    pub to: usize,
}

/// Outcome of one [`HealthMonitor::tick`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Height read from each node this tick, `None` where every attempt failed.
    pub heights: Vec<Option<u64>>,
    /// Providers an alert was sent for.
    pub stale_providers: Vec<String>,
    /// Set when the active node was replaced.
    pub switched: Option<Switch>,
}

/// Index and height of the highest node. The lowest index wins ties.
///
/// Returns `None` for an empty input.
#[must_use]
pub fn select_highest(heights: &[u64]) -> Option<(usize, u64)> {
    let (&first, rest) = heights.split_first()?;
    let mut best = (0, first);
    for (index, &height) in rest.iter().enumerate() {
        if height > best.1 {
            best = (index + 1, height);
        }
    }
    Some(best)
}

/// Whether a node at `active` is unacceptably behind a node at `highest`.
#[must_use]
pub const fn falls_behind(active: u64, highest: u64, threshold: u64) -> bool {
    active.saturating_add(threshold) < highest
}

/// Polls every node of a pool and points the pool at the highest one when the
/// active node lags too far behind.
pub struct HealthMonitor<S = TendermintStatusChannel, Q = GrpcQueryChannel> {
    pool: Arc<ClientPool<S, Q>>,
    alerts: Arc<dyn AlertSink>,
    config: MonitorConfig,
}

impl<S, Q> std::fmt::Debug for HealthMonitor<S, Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("nodes", &self.pool.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, Q> HealthMonitor<S, Q>
where
    S: StatusChannel,
    Q: Send + Sync + 'static,
{
    /// Creates a monitor over `pool`.
    pub fn new(pool: Arc<ClientPool<S, Q>>, alerts: Arc<dyn AlertSink>, config: MonitorConfig) -> Self {
        Self {
            pool,
            alerts,
            config,
        }
    }

    /// Runs one collect, alert, decide and switch cycle.
    pub async fn tick(&self) -> TickReport {
        tracing::info!("checking health of greenfield nodes");

        let heights = join_all(self.pool.handles().iter().map(|handle| self.collect(handle))).await;

        let now = Instant::now();
        let stale_providers: Vec<String> = self
            .pool
            .handles()
            .iter()
            .filter(|handle| {
                now.saturating_duration_since(handle.updated_at()) > self.config.deny_service_threshold
            })
            .map(|handle| handle.provider().to_string())
            .collect();
        join_all(stale_providers.iter().map(|provider| self.alert_stale(provider))).await;

        TickReport {
            heights,
            stale_providers,
            switched: self.decide(),
        }
    }

    /// Ticks every [`MonitorConfig::interval`] until `shutdown` turns `true`
    /// or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval = ?self.config.interval, "health monitor started");
        loop {
            tokio::select! {
                _ = shutdown.wait_for(|stop| *stop) => break,
                () = tokio::time::sleep(self.config.interval) => {}
            }
            self.tick().await;
        }
        tracing::info!("health monitor stopped");
    }

    async fn collect(&self, handle: &NodeHandle<S, Q>) -> Option<u64> {
        let provider = handle.provider();
        let result = retry(
            self.config.height_query,
            log_height_query_retry(provider),
            || handle.status().latest_block_height(),
        )
        .await;

        match result {
            Ok(height) => {
                let previous = handle.record_height(height, Instant::now());
                if height < previous {
                    tracing::warn!(provider, height, previous, "node height went backwards");
                }
                NODE_HEIGHT
                    .with_label_values(&[provider])
                    .set(metrics::gauge_value(height));
                Some(height)
            }
            Err(err) => {
                tracing::error!(provider, %err, "get latest block height error");
                None
            }
        }
    }

    async fn alert_stale(&self, provider: &str) {
        let message = format!("data seed {provider} is not accessible");
        if tokio::time::timeout(ALERT_TIMEOUT, self.alerts.alert(&message))
            .await
            .is_err()
        {
            tracing::warn!(provider, timeout = ?ALERT_TIMEOUT, "alert delivery timed out");
        }
    }

    fn decide(&self) -> Option<Switch> {
        let heights: Vec<u64> = self.pool.handles().iter().map(NodeHandle::height).collect();
        let (highest_index, highest_height) = select_highest(&heights)?;
        let active = self.pool.active_index();

        if !falls_behind(heights[active], highest_height, self.config.fall_behind_threshold) {
            return None;
        }

        let from = self.pool.switch_active(highest_index)?;
        tracing::warn!(
            from = self.pool.handles()[from].provider(),
            to = self.pool.handles()[highest_index].provider(),
            active_height = heights[from],
            highest_height,
            "active node fell behind, switching"
        );
        FAILOVER_COUNTER.inc();
        Some(Switch {
            from,
            to: highest_index,
        })
    }
}
