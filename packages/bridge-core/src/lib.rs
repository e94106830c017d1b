//! Bridge Core: ledger and multisig state machine for the mirror bridge
//!
//! One [`BridgeInstance`] models the bridge deployed on one chain side. It owns
//! its locked native balance, its nonce registry and its append-only event log,
//! and exposes the four transitions of the transfer protocol:
//!
//! - **EthDeposit** - lock native collateral (`deposit_eth`, `receive`)
//! - **EthWithdraw** - release collateral against a threshold of owner signatures (`transfer_eth`)
//! - **Burn** - burn tokens on this side, attested by the holder (`burn`)
//! - **Mint** - mint the mirrored tokens, attested by the holder and the owners (`mint`)
//!
//! Every transition validates signatures, then reserves its nonce, then mutates
//! the ledger or token, then emits exactly one event. A failure at any step
//! leaves no visible mutation.
//!
//! ## Feature Flags
//!
//! - `testing` - deterministic development keys and signing helpers

pub mod error;
pub mod event_log;
pub mod execute;
pub mod hash;
pub mod instance;
pub mod ledger;
pub mod nonce;
pub mod signature;
pub mod token;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{BridgeError, TokenError};
pub use event_log::EventLog;
pub use hash::{keccak256, AttestationMessage};
pub use instance::{BridgeConfig, BridgeInstance};
pub use ledger::BridgeLedger;
pub use nonce::{NonceRegistry, NonceReservation};
pub use signature::{
    recover_signer, sign_digest, Attestation, SignatureFault, SignaturePolicy, SignatureSet,
    SignatureTally,
};
pub use token::{AuthorizedToken, MintableToken, TokenCapability};
pub use types::{
    Amount, BridgeEvent, Channel, LoggedEvent, Nonce, Settlement, Step, TransferRecord,
    TransferState,
};
