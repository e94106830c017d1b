//! Common types for bridge transitions and emitted events

use alloy::primitives::{Address, Bytes, U256};
use std::fmt;

/// Native or token amount (uint256)
pub type Amount = U256;

/// Caller-chosen replay-protection nonce (uint256)
pub type Nonce = U256;

// ============================================================================
// Channels
// ============================================================================

/// Logical nonce namespace
///
/// The same nonce value may be consumed once on each channel, so one logical
/// transfer can carry a single nonce through `burn` on the source side and
/// `mint` on the destination side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Burn,
    Mint,
    Withdraw,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Burn => "burn",
            Channel::Mint => "mint",
            Channel::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Steps and States
// ============================================================================

/// Transition kind, encoded as `uint8` in the `Transfer` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Step {
    Burn = 0,
    Mint = 1,
    EthDeposit = 2,
    EthWithdraw = 3,
}

impl Step {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Step::Burn),
            1 => Some(Step::Mint),
            2 => Some(Step::EthDeposit),
            3 => Some(Step::EthWithdraw),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Burn => "burn",
            Step::Mint => "mint",
            Step::EthDeposit => "eth_deposit",
            Step::EthWithdraw => "eth_withdraw",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of one transition run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Requested,
    Validated,
    Settled,
    Rejected,
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Requested => "requested",
            TransferState::Validated => "validated",
            TransferState::Settled => "settled",
            TransferState::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Settled | TransferState::Rejected)
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Events
// ============================================================================

/// Burn or Mint record, immutable once emitted
///
/// The `signature` field carries the holder's intent signature; on the
/// destination side it is the credential the mint transition re-validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
    /// Unix timestamp (seconds) of the transition
    pub date: u64,
    pub nonce: Nonce,
    pub signature: Bytes,
    pub step: Step,
}

/// Events emitted by a bridge instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// `EthDeposited(address from, uint256 amount)`
    EthDeposited { from: Address, amount: Amount },
    /// `EthSent(address caller, address to, uint256 amount)`
    EthSent {
        caller: Address,
        to: Address,
        amount: Amount,
    },
    /// `Transfer(address,address,uint256,uint256,uint256,bytes,uint8)`
    Transfer(TransferRecord),
}

impl BridgeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::EthDeposited { .. } => "EthDeposited",
            BridgeEvent::EthSent { .. } => "EthSent",
            BridgeEvent::Transfer(_) => "Transfer",
        }
    }

    /// The transfer record, if this is a `Transfer` event
    pub fn as_transfer(&self) -> Option<&TransferRecord> {
        match self {
            BridgeEvent::Transfer(record) => Some(record),
            _ => None,
        }
    }
}

/// Event with its position in the instance's append-only log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEvent {
    /// 1-based position; plays the role of the block number
    pub position: u64,
    pub event: BridgeEvent,
}

/// Terminal outcome of a successful transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub step: Step,
    pub state: TransferState,
    /// `None` for zero-amount no-ops
    pub event: Option<LoggedEvent>,
}

impl Settlement {
    pub(crate) fn settled(step: Step, event: LoggedEvent) -> Self {
        Self {
            step,
            state: TransferState::Settled,
            event: Some(event),
        }
    }

    pub(crate) fn no_op(step: Step) -> Self {
        Self {
            step,
            state: TransferState::Settled,
            event: None,
        }
    }

    pub fn is_no_op(&self) -> bool {
        self.event.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_roundtrip() {
        for step in [Step::Burn, Step::Mint, Step::EthDeposit, Step::EthWithdraw] {
            assert_eq!(Step::from_u8(step.as_u8()), Some(step));
        }
        assert_eq!(Step::from_u8(4), None);
    }

    #[test]
    fn test_step_wire_values() {
        // Transfer.step is 0 for Burn and 1 for Mint on chain
        assert_eq!(Step::Burn.as_u8(), 0);
        assert_eq!(Step::Mint.as_u8(), 1);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Settled.is_terminal());
        assert!(TransferState::Rejected.is_terminal());
        assert!(!TransferState::Requested.is_terminal());
        assert!(!TransferState::Validated.is_terminal());
    }
}
