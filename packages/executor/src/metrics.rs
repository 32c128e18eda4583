//! Prometheus metrics for node health and failover.

#![allow(missing_docs)]

use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
};
use std::sync::LazyLock;

/// Last observed chain height, per node
pub static NODE_HEIGHT: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    register_int_gauge_vec!(
        "challenger_node_height",
        "Last observed block height of a node",
        &["provider"]
    )
    .unwrap()
});

/// Index of the node currently serving queries
pub static ACTIVE_NODE_INDEX: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!(
        "challenger_active_node_index",
        "Index of the node serving foreground queries"
    )
    .unwrap()
});

/// Number of times the active node was replaced
pub static FAILOVER_COUNTER: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "challenger_failover_total",
        "Number of switches to a node with a higher block height"
    )
    .unwrap()
});

/// Failed latest-height attempts, per node
pub static HEIGHT_QUERY_RETRIES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "challenger_height_query_retry_total",
        "Failed latest-height query attempts",
        &["provider"]
    )
    .unwrap()
});

/// Saturating conversion for gauge values.
pub(crate) fn gauge_value(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
