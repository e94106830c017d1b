use alloy::primitives::{Address, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use eyre::{Result, WrapErr};
use std::fmt;

use super::ValidatorSigner;
use crate::error::RelayError;

/// Validator key held in this process
#[derive(Clone)]
pub struct LocalSigner {
    signer: PrivateKeySigner,
}

/// Custom Debug that never prints the key
impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.signer.address())
            .finish()
    }
}

impl LocalSigner {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .wrap_err("Invalid validator private key")?;
        Ok(Self::new(signer))
    }
}

#[async_trait]
impl ValidatorSigner for LocalSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_digest(&self, digest: B256) -> Result<Bytes, RelayError> {
        bridge_core::sign_digest(&self.signer, &digest).map_err(|e| RelayError::Signer(e.to_string()))
    }
}
