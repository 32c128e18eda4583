//! [`StatusChannel`] over the CometBFT JSON-RPC `HttpClient`.

use std::{future::Future, str::FromStr, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use challenger_utils::serde::{number_as_string, option_number_as_string};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tendermint::{block::signed_header::SignedHeader, validator, Block};
use tendermint_rpc::{
    dialect::Dialect, endpoint::block_results, request::RequestMessage, Client, HttpClient, Method,
    Url,
};

use crate::{
    channel::{StatusChannel, ValidatorRecord},
    error::{ConfigError, NodeError},
};

/// Largest page the validators endpoint serves.
const VALIDATORS_PER_PAGE: u64 = 100;

/// Fields of a validators entry understood by [`validator::Info`].
const VALIDATOR_INFO_FIELDS: [&str; 4] = ["address", "pub_key", "voting_power", "proposer_priority"];

/// A CometBFT JSON-RPC client bound to a single node, with a per-call deadline.
#[derive(Debug, Clone)]
pub struct TendermintStatusChannel {
    client: HttpClient,
    timeout: Duration,
}

impl TendermintStatusChannel {
    /// Creates a client for the node at `addr`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEndpoint`] if `addr` is not a valid RPC url.
    pub fn new(addr: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: addr.to_string(),
            reason,
        };
        let url = Url::from_str(addr).map_err(|e| invalid(e.to_string()))?;
        let client = HttpClient::new(url).map_err(|e| invalid(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, NodeError>
    where
        F: Future<Output = Result<T, tendermint_rpc::Error>> + Send,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| NodeError::Timeout(self.timeout))?
            .map_err(NodeError::from)
    }
}

fn to_height(height: u64) -> Result<tendermint::block::Height, NodeError> {
    if height == 0 {
        return Err(NodeError::InvalidHeight(height));
    }
    tendermint::block::Height::try_from(height).map_err(|_| NodeError::InvalidHeight(height))
}

#[async_trait]
impl StatusChannel for TendermintStatusChannel {
    async fn latest_block_height(&self) -> Result<u64, NodeError> {
        let status = self.bounded(self.client.status()).await?;
        Ok(status.sync_info.latest_block_height.value())
    }

    async fn block_at(&self, height: u64) -> Result<Block, NodeError> {
        let height = to_height(height)?;
        Ok(self.bounded(self.client.block(height)).await?.block)
    }

    async fn block_results_at(&self, height: u64) -> Result<block_results::Response, NodeError> {
        let height = to_height(height)?;
        self.bounded(self.client.block_results(height)).await
    }

    async fn validators_at(&self, height: Option<u64>) -> Result<Vec<ValidatorRecord>, NodeError> {
        if let Some(h) = height {
            to_height(h)?;
        }

        let mut pages = ValidatorPages::new(height);
        loop {
            let response = self.bounded(self.client.perform(pages.next_request())).await?;
            if pages.absorb(response)? {
                return Ok(pages.validators);
            }
        }
    }

    async fn signed_header_at(&self, height: u64) -> Result<SignedHeader, NodeError> {
        let height = to_height(height)?;
        Ok(self.bounded(self.client.commit(height)).await?.signed_header)
    }
}

/// `validators` request that keeps the Greenfield-specific fields of each
/// entry, which the stock endpoint type drops.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ValidatorsRequest {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_number_as_string"
    )]
    height: Option<u64>,
    #[serde(with = "number_as_string")]
    page: u64,
    #[serde(with = "number_as_string")]
    per_page: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ValidatorsResponse {
    #[serde(with = "number_as_string")]
    block_height: u64,
    validators: Vec<Value>,
    #[serde(with = "number_as_string")]
    total: u64,
}

/// Accumulates the pages of one validators query.
#[derive(Debug)]
struct ValidatorPages {
    height: Option<u64>,
    page: u64,
    validators: Vec<ValidatorRecord>,
}

impl ValidatorPages {
    const fn new(height: Option<u64>) -> Self {
        Self {
            height,
            page: 1,
            validators: Vec::new(),
        }
    }

    const fn next_request(&self) -> ValidatorsRequest {
        ValidatorsRequest {
            height: self.height,
            page: self.page,
            per_page: VALIDATORS_PER_PAGE,
        }
    }

    /// Adds one page and returns whether the set is complete.
    fn absorb(&mut self, response: ValidatorsResponse) -> Result<bool, NodeError> {
        // Later pages must describe the same set as the first one.
        self.height = Some(response.block_height);

        let fetched = response.validators.len();
        for raw in response.validators {
            self.validators.push(parse_validator(raw)?);
        }
        if fetched == 0 || self.validators.len() as u64 >= response.total {
            return Ok(true);
        }
        self.page += 1;
        Ok(false)
    }
}

impl RequestMessage for ValidatorsRequest {
    fn method(&self) -> Method {
        Method::Validators
    }
}

impl<D: Dialect> tendermint_rpc::Request<D> for ValidatorsRequest {
    type Response = ValidatorsResponse;
}

impl<D: Dialect> tendermint_rpc::SimpleRequest<D> for ValidatorsRequest {
    type Output = ValidatorsResponse;
}

impl tendermint_rpc::Response for ValidatorsResponse {}

/// Splits one raw validators entry into the consensus fields and the BLS key.
fn parse_validator(raw: Value) -> Result<ValidatorRecord, NodeError> {
    let Value::Object(mut fields) = raw else {
        return Err(NodeError::Decode("validator entry is not an object".into()));
    };

    let bls_key = match fields.remove("bls_key") {
        Some(Value::String(encoded)) if !encoded.is_empty() => STANDARD
            .decode(encoded)
            .map_err(|e| NodeError::Decode(format!("invalid bls_key: {e}")))?,
        _ => Vec::new(),
    };

    let info_fields: Map<String, Value> = fields
        .into_iter()
        .filter(|(k, _)| VALIDATOR_INFO_FIELDS.contains(&k.as_str()))
        .collect();
    let info: validator::Info = serde_json::from_value(Value::Object(info_fields))
        .map_err(|e| NodeError::Decode(format!("invalid validator entry: {e}")))?;

    Ok(ValidatorRecord { info, bls_key })
}
