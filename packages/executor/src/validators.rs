//! Cached validator set of the latest height.

use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::{
    channel::{StatusChannel, ValidatorRecord},
    error::NodeError,
    pool::ClientPool,
};

/// Where fresh validator sets come from.
#[async_trait]
pub trait ValidatorSource: Send + Sync {
    /// Validator set at the latest height.
    async fn latest_validators(&self) -> Result<Vec<ValidatorRecord>, NodeError>;
}

#[async_trait]
impl<S: StatusChannel, Q: Send + Sync> ValidatorSource for ClientPool<S, Q> {
    async fn latest_validators(&self) -> Result<Vec<ValidatorRecord>, NodeError> {
        self.active_status_channel().validators_at(None).await
    }
}

/// Latest known validator set, replaced wholesale on every refresh.
///
/// An empty set means the cache has not been populated yet. Readers get an
/// [`Arc`] snapshot and never see a partially applied refresh.
#[derive(Debug, Default)]
pub struct ValidatorCache {
    validators: RwLock<Arc<Vec<ValidatorRecord>>>,
}

impl ValidatorCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. May be empty.
    #[must_use]
    pub fn cached(&self) -> Arc<Vec<ValidatorRecord>> {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the cached set.
    pub fn replace(&self, validators: Vec<ValidatorRecord>) {
        *self.validators.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(validators);
    }

    /// The cached set, or a fresh fetch from `source` when nothing is cached
    /// yet. A successful fetch also populates the cache.
    ///
    /// # Errors
    /// Returns the source's error when the cache is empty and the fetch fails.
    pub async fn get_or_fetch<V: ValidatorSource + ?Sized>(
        &self,
        source: &V,
    ) -> Result<Arc<Vec<ValidatorRecord>>, NodeError> {
        let cached = self.cached();
        if !cached.is_empty() {
            return Ok(cached);
        }

        let fetched = Arc::new(source.latest_validators().await?);
        *self.validators.write().unwrap_or_else(PoisonError::into_inner) = fetched.clone();
        Ok(fetched)
    }

    /// Fetches from `source` and replaces the cached set.
    ///
    /// # Errors
    /// Returns the source's error; the previous set is kept.
    pub async fn refresh<V: ValidatorSource + ?Sized>(&self, source: &V) -> Result<usize, NodeError> {
        let validators = source.latest_validators().await?;
        let count = validators.len();
        self.replace(validators);
        Ok(count)
    }

    /// Refreshes every `interval` until `shutdown` turns `true` or its sender
    /// is dropped. Failed refreshes are logged and keep the previous set.
    pub async fn run<V: ValidatorSource + ?Sized>(
        &self,
        source: &V,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(?interval, "validator refresh started");
        loop {
            tokio::select! {
                _ = shutdown.wait_for(|stop| *stop) => break,
                () = tokio::time::sleep(interval) => {}
            }
            match self.refresh(source).await {
                Ok(count) => tracing::debug!(count, "validator set refreshed"),
                Err(err) => tracing::error!(%err, "failed to refresh validator set"),
            }
        }
        tracing::info!("validator refresh stopped");
    }
}
