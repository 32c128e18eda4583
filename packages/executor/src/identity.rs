//! The challenger's signing identity.

use std::fmt;

use alloy_signer_local::PrivateKeySigner;

use crate::{config::KeyConfig, error::ConfigError};

/// A secp256k1 signing key and the address derived from it.
#[derive(Clone)]
pub struct Identity {
    signer: PrivateKeySigner,
    address: String,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Identity {
    /// Parses a hex encoded private key, with or without `0x`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidKey`] when `key` is not a valid 32 byte
    /// secp256k1 scalar.
    pub fn from_hex(key: &str) -> Result<Self, ConfigError> {
        let key = key.trim();
        let bytes = hex::decode(key.strip_prefix("0x").unwrap_or(key))
            .map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            ConfigError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        let signer = PrivateKeySigner::from_slice(&bytes)
            .map_err(|e| ConfigError::InvalidKey(e.to_string()))?;

        Ok(Self {
            address: signer.address().to_string(),
            signer,
        })
    }

    /// Loads the key from where `config` points.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingKeyEnv`] if the environment variable is
    /// unset, otherwise the errors of [`Self::from_hex`].
    pub fn from_config(config: &KeyConfig) -> Result<Self, ConfigError> {
        match config {
            KeyConfig::Local { private_key } => Self::from_hex(private_key),
            KeyConfig::Env { var } => {
                let key = std::env::var(var).map_err(|_| ConfigError::MissingKeyEnv(var.clone()))?;
                Self::from_hex(&key)
            }
        }
    }

    /// Checksummed `0x` address of the key.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The underlying signer.
    #[must_use]
    pub const fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}
