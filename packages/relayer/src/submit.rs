//! Destination-side submission interface

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use bridge_core::{AttestationMessage, SignaturePolicy, SignatureSet, TransferRecord};
use std::time::Duration;

use crate::error::RelayError;

/// Arguments of the destination `mint` transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintCall {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub nonce: U256,
    /// Holder's intent signature copied from the burn record
    pub user_signature: Bytes,
    pub owner_signatures: SignatureSet,
}

impl MintCall {
    /// Owner attestation message for this mint on `bridge`
    pub fn attestation(record: &TransferRecord, bridge: Address) -> AttestationMessage {
        AttestationMessage::Mint {
            from: record.from,
            to: record.to,
            amount: record.amount,
            nonce: record.nonce,
            bridge,
        }
    }

    pub fn from_record(record: &TransferRecord, owner_signatures: SignatureSet) -> Self {
        Self {
            from: record.from,
            to: record.to,
            amount: record.amount,
            nonce: record.nonce,
            user_signature: record.signature.clone(),
            owner_signatures,
        }
    }
}

/// Broadcast transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHandle {
    pub tx_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    /// Block number or log position the transaction landed at
    pub position: u64,
    pub success: bool,
    /// Contract revert message when `success` is false and it could be recovered
    pub revert_reason: Option<String>,
}

/// What the destination knows about a broadcast transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Included; check `success` for a revert
    Mined(TxReceipt),
    /// Known to the node but not included within the wait
    Pending,
    /// The node no longer knows the transaction; it will never be included
    Dropped,
}

#[async_trait]
pub trait MintSubmitter: Send + Sync {
    fn chain_name(&self) -> &str;

    /// Identity bound into owner attestations for this destination
    fn bridge_address(&self) -> Address;

    /// Account that submits and collects the gas reimbursement
    fn relayer_address(&self) -> Address;

    /// Owner set and threshold of the destination instance
    async fn policy(&self) -> Result<SignaturePolicy, RelayError>;

    /// Broadcast the mint. A rejection known before broadcast is returned as
    /// `RelayError::Rejected`.
    async fn submit(&self, call: &MintCall) -> Result<TxHandle, RelayError>;

    /// Wait up to `timeout` for `handle` to be included. `Err` only for
    /// failures to reach the node.
    async fn await_confirmation(&self, handle: &TxHandle, timeout: Duration) -> Result<TxStatus, RelayError>;
}
