//! The ordered set of node handles and the active pointer.

use std::{
    collections::HashSet,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use challenger_utils::ensure;

use crate::{
    error::ConfigError,
    grpc::GrpcQueryChannel,
    handle::NodeHandle,
    metrics::{self, ACTIVE_NODE_INDEX},
    rpc::TendermintStatusChannel,
};

/// A fixed set of nodes, one of which is active.
///
/// Foreground callers resolve the active node through the shared lock; only
/// the health monitor takes the write lock, and only to move the pointer.
/// Handles are never added or removed after construction, so indices are
/// stable.
#[derive(Debug)]
pub struct ClientPool<S = TendermintStatusChannel, Q = GrpcQueryChannel> {
    handles: Vec<NodeHandle<S, Q>>,
    active: RwLock<usize>,
}

impl ClientPool {
    /// Builds one handle per `(rpc_addrs[i], grpc_addrs[i])` pair.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// - [`ConfigError::NoEndpoints`] if no addresses are given
    /// - [`ConfigError::AddressCountMismatch`] if the lists differ in length
    /// - [`ConfigError::DuplicateProvider`] if an rpc address repeats
    /// - [`ConfigError::InvalidEndpoint`] if an address cannot be parsed
    pub fn connect(
        rpc_addrs: &[String],
        grpc_addrs: &[String],
        request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        ensure!(
            rpc_addrs.len() == grpc_addrs.len(),
            ConfigError::AddressCountMismatch {
                rpc: rpc_addrs.len(),
                grpc: grpc_addrs.len(),
            }
        );

        let handles = rpc_addrs
            .iter()
            .zip(grpc_addrs)
            .map(|(rpc, grpc)| {
                Ok(NodeHandle::new(
                    rpc.clone(),
                    TendermintStatusChannel::new(rpc, request_timeout)?,
                    GrpcQueryChannel::connect_lazy(grpc, request_timeout)?,
                ))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Self::new(handles)
    }
}

impl<S, Q> ClientPool<S, Q> {
    /// Creates a pool with the first handle active.
    ///
    /// # Errors
    /// - [`ConfigError::NoEndpoints`] if `handles` is empty
    /// - [`ConfigError::DuplicateProvider`] if two handles share a provider
    pub fn new(handles: Vec<NodeHandle<S, Q>>) -> Result<Self, ConfigError> {
        ensure!(!handles.is_empty(), ConfigError::NoEndpoints);

        let mut seen = HashSet::new();
        for handle in &handles {
            ensure!(
                seen.insert(handle.provider()),
                ConfigError::DuplicateProvider(handle.provider().to_string())
            );
        }

        ACTIVE_NODE_INDEX.set(0);
        Ok(Self {
            handles,
            active: RwLock::new(0),
        })
    }

    /// Index of the active handle. Always a valid index into [`Self::handles`].
    #[must_use]
    pub fn active_index(&self) -> usize {
        *self.active.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// The active handle, for read-only inspection.
    #[must_use]
    pub fn current_handle(&self) -> &NodeHandle<S, Q> {
        &self.handles[self.active_index()]
    }

    /// Status channel of the active handle.
    #[must_use]
    pub fn active_status_channel(&self) -> &S {
        self.current_handle().status()
    }

    /// Query channel of the active handle.
    #[must_use]
    pub fn active_query_channel(&self) -> &Q {
        self.current_handle().query()
    }

    /// All handles in configuration order.
    #[must_use]
    pub fn handles(&self) -> &[NodeHandle<S, Q>] {
        &self.handles
    }

    /// Number of handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Always false; a pool holds at least one handle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Points the pool at `index`. Out of range indices are ignored.
    ///
    /// Returns the previous index when the pointer moved.
    pub(crate) fn switch_active(&self, index: usize) -> Option<usize> {
        if index >= self.handles.len() {
            tracing::error!(index, len = self.handles.len(), "refusing to switch to unknown node");
            return None;
        }

        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if *active == index {
            return None;
        }
        let previous = std::mem::replace(&mut *active, index);
        drop(active);

        ACTIVE_NODE_INDEX.set(metrics::gauge_value(index as u64));
        Some(previous)
    }
}
