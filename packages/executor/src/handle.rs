//! A single remote node: its two channels and observed health.

use std::sync::{PoisonError, RwLock};

use tokio::time::Instant;

/// Last observed health of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthSnapshot {
    /// Last observed chain height.
    pub height: u64,
    /// When the height was last read successfully.
    pub updated_at: Instant,
}

/// One node of the pool.
///
/// The channels are owned for the lifetime of the handle. Health metadata is
/// written only by the health monitor; readers may see a value that is about
/// to be replaced.
#[derive(Debug)]
pub struct NodeHandle<S, Q> {
    provider: String,
    status: S,
    query: Q,
    health: RwLock<HealthSnapshot>,
}

impl<S, Q> NodeHandle<S, Q> {
    /// Creates a handle with height 0, last updated now.
    pub fn new(provider: impl Into<String>, status: S, query: Q) -> Self {
        Self {
            provider: provider.into(),
            status,
            query,
            health: RwLock::new(HealthSnapshot {
                height: 0,
                updated_at: Instant::now(),
            }),
        }
    }

    /// Address identifying the node.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// The status channel.
    pub const fn status(&self) -> &S {
        &self.status
    }

    /// The query channel.
    pub const fn query(&self) -> &Q {
        &self.query
    }

    /// Current health snapshot.
    #[must_use]
    pub fn health(&self) -> HealthSnapshot {
        *self.health.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last observed chain height.
    #[must_use]
    pub fn height(&self) -> u64 {
        self.health().height
    }

    /// When the height was last read successfully.
    #[must_use]
    pub fn updated_at(&self) -> Instant {
        self.health().updated_at
    }

    /// Records a successful height read and returns the previous height.
    pub(crate) fn record_height(&self, height: u64, at: Instant) -> u64 {
        let mut health = self.health.write().unwrap_or_else(PoisonError::into_inner);
        let previous = health.height;
        *health = HealthSnapshot {
            height,
            updated_at: at,
        };
        previous
    }
}
