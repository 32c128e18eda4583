//! [`QueryChannel`] over the Cosmos SDK gRPC query services.

use std::time::Duration;

use async_trait::async_trait;
use cosmos_sdk_proto::{
    cosmos::auth::v1beta1::{QueryAccountRequest, QueryAccountResponse},
    Any,
};
use tonic::{
    client::Grpc,
    codec::ProstCodec,
    codegen::http::uri::PathAndQuery,
    transport::{Channel, Endpoint},
};

use crate::{
    channel::QueryChannel,
    error::{ConfigError, NodeError},
};

const ACCOUNT_QUERY_PATH: &str = "/cosmos.auth.v1beta1.Query/Account";

/// A lazily connected gRPC channel to a single node.
#[derive(Debug, Clone)]
pub struct GrpcQueryChannel {
    channel: Channel,
}

impl GrpcQueryChannel {
    /// Builds the channel without dialing; the connection is made on first use
    /// and re-established by `tonic` after failures.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEndpoint`] if `addr` is not a valid uri.
    pub fn connect_lazy(addr: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let endpoint = Endpoint::from_shared(addr.to_string())
            .map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: addr.to_string(),
                reason: e.to_string(),
            })?
            .timeout(timeout)
            .connect_timeout(timeout);

        Ok(Self {
            channel: endpoint.connect_lazy(),
        })
    }
}

#[async_trait]
impl QueryChannel for GrpcQueryChannel {
    async fn account(&self, address: &str) -> Result<Option<Any>, NodeError> {
        let mut grpc = Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| NodeError::Transport(format!("service was not ready: {e}")))?;

        let codec = ProstCodec::<QueryAccountRequest, QueryAccountResponse>::default();
        let request = tonic::Request::new(QueryAccountRequest {
            address: address.to_string(),
        });
        let response = grpc
            .unary(request, PathAndQuery::from_static(ACCOUNT_QUERY_PATH), codec)
            .await?;

        Ok(response.into_inner().account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_grpc_address_is_a_config_error() {
        let err = GrpcQueryChannel::connect_lazy("http://bad host:9090", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[tokio::test]
    async fn unreachable_node_is_a_transport_error() {
        let channel =
            GrpcQueryChannel::connect_lazy("http://127.0.0.1:1", Duration::from_millis(200))
                .unwrap();
        let err = channel.account("0x00").await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error {err:?}");
    }
}
