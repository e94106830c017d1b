//! Error types for the bridge state machine
//!
//! Every variant aborts the enclosing transition with zero state mutation.

use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::types::Channel;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Invalid signature policy: {reason}")]
    InvalidPolicy { reason: String },

    // ========================================================================
    // Signature Errors
    // ========================================================================
    #[error("Insufficient signatures: got {got}, need {required}")]
    InsufficientSignatures { got: usize, required: usize },

    #[error("Insufficient owner signatures: got {got}, need {required}")]
    InsufficientOwnerSignatures { got: usize, required: usize },

    #[error("Invalid user signature: expected signer {expected}, recovered {recovered:?}")]
    InvalidUserSignature {
        expected: Address,
        recovered: Option<Address>,
    },

    // ========================================================================
    // Nonce Errors
    // ========================================================================
    #[error("Nonce already used: {nonce} on channel {channel}")]
    ReplayedNonce { channel: Channel, nonce: U256 },

    // ========================================================================
    // Amount & Funds Errors
    // ========================================================================
    #[error("Insufficient ETH balance: requested {requested}, locked {available}")]
    InsufficientBalance { requested: U256, available: U256 },

    #[error("Locked balance overflow")]
    BalanceOverflow,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

impl BridgeError {
    /// True for the replay rejection the relayer treats as idempotent completion.
    pub fn is_replay(&self) -> bool {
        matches!(self, BridgeError::ReplayedNonce { .. })
    }
}

/// Errors raised by the token capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Unauthorized: {caller} is not the token admin")]
    NotAdmin { caller: Address },

    #[error("Insufficient token balance for {holder}: has {balance}, needs {requested}")]
    InsufficientBalance {
        holder: Address,
        balance: U256,
        requested: U256,
    },

    #[error("Token supply overflow")]
    SupplyOverflow,
}
