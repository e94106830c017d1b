//! Validator signer capability
//!
//! A validator signs the 32-byte attestation digest and never exposes key
//! material to the relayer. Signers are either local keys held by this process
//! or remote signing services reached over HTTP.

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;

use crate::error::RelayError;

pub mod local;
pub mod remote;

pub use local::LocalSigner;
pub use remote::RemoteSigner;

#[async_trait]
pub trait ValidatorSigner: Send + Sync {
    /// Address the produced signatures recover to
    fn address(&self) -> Address;

    /// Sign `digest` as an EIP-191 personal message
    async fn sign_digest(&self, digest: B256) -> Result<Bytes, RelayError>;
}
