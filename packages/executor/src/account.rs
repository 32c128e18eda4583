//! Account lookups and decoding of the `Any` payload returned by `x/auth`.

use std::collections::HashMap;

use cosmos_sdk_proto::cosmos::auth::v1beta1::{BaseAccount, ModuleAccount};
use prost::{DecodeError, Message};

use crate::{channel::QueryChannel, error::NodeError};

/// Type url of [`BaseAccount`].
pub const BASE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.BaseAccount";
/// Type url of [`ModuleAccount`].
pub const MODULE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.ModuleAccount";

/// A decoded on-chain account.
#[derive(Clone, Debug, PartialEq)]
pub enum Account {
    /// A regular user account.
    Base(BaseAccount),
    /// An account owned by a chain module.
    Module(ModuleAccount),
}

impl Account {
    fn base(&self) -> Option<&BaseAccount> {
        match self {
            Self::Base(base) => Some(base),
            Self::Module(module) => module.base_account.as_ref(),
        }
    }

    /// Account address, empty if the node omitted it.
    #[must_use]
    pub fn address(&self) -> &str {
        self.base().map_or("", |base| base.address.as_str())
    }

    /// Account number assigned at creation.
    #[must_use]
    pub fn account_number(&self) -> u64 {
        self.base().map_or(0, |base| base.account_number)
    }

    /// Sequence of the next transaction.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.base().map_or(0, |base| base.sequence)
    }
}

/// Turns the bytes of an `Any` payload into an [`Account`].
pub type AccountDecoder = fn(&[u8]) -> Result<Account, DecodeError>;

/// Decoders for the account types the chain may return, keyed by type url.
#[derive(Clone, Debug)]
pub struct AccountRegistry {
    decoders: HashMap<String, AccountDecoder>,
}

impl Default for AccountRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(BASE_ACCOUNT_TYPE_URL, |bytes| {
            BaseAccount::decode(bytes).map(Account::Base)
        });
        registry.register(MODULE_ACCOUNT_TYPE_URL, |bytes| {
            ModuleAccount::decode(bytes).map(Account::Module)
        });
        registry
    }
}

impl AccountRegistry {
    /// A registry that knows no account types.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Adds or replaces the decoder for `type_url`.
    pub fn register(&mut self, type_url: impl Into<String>, decoder: AccountDecoder) -> &mut Self {
        self.decoders.insert(type_url.into(), decoder);
        self
    }

    /// Whether a decoder is registered for `type_url`.
    #[must_use]
    pub fn contains(&self, type_url: &str) -> bool {
        self.decoders.contains_key(type_url)
    }

    /// Decodes `value` as the account type named by `type_url`.
    ///
    /// # Errors
    /// Returns [`NodeError::Decode`] for unregistered types and malformed bytes.
    pub fn decode(&self, type_url: &str, value: &[u8]) -> Result<Account, NodeError> {
        let decoder = self
            .decoders
            .get(type_url)
            .ok_or_else(|| NodeError::Decode(format!("unregistered account type {type_url}")))?;
        Ok(decoder(value)?)
    }
}

/// Queries the account at `address` and decodes it with `registry`.
///
/// # Errors
/// - [`NodeError::NotFound`] if the node does not know the address
/// - [`NodeError::Transport`] or [`NodeError::Timeout`] if the query fails
/// - [`NodeError::Decode`] if the payload is missing, of an unregistered
///   type or malformed
pub async fn resolve_account<Q: QueryChannel + ?Sized>(
    query: &Q,
    registry: &AccountRegistry,
    address: &str,
) -> Result<Account, NodeError> {
    let any = query
        .account(address)
        .await?
        .ok_or_else(|| NodeError::Decode(format!("empty account payload for {address}")))?;
    registry.decode(&any.type_url, &any.value)
}
