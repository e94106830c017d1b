//! Transfer state machine transitions
//!
//! Each transition is one run of `Requested -> Validated -> Settled`, or
//! `Rejected` with no state mutation. Handlers are organized by kind:
//! - `deposit` - EthDeposit (`deposit_eth`, `receive`)
//! - `withdraw` - EthWithdraw (`transfer_eth`)
//! - `burn` - Burn
//! - `mint` - Mint
//!
//! Every handler follows the same order: validate signatures, reserve the
//! nonce, mutate ledger and token, emit the event. A zero amount settles as a
//! no-op without checking signatures or consuming the nonce.

mod burn;
mod deposit;
mod mint;
mod withdraw;

use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::instance::BridgeInstance;
use crate::types::{Amount, Nonce, Settlement, Step, TransferState};

/// Current unix time in seconds, stamped on transfer records
pub(crate) fn now_secs() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

impl BridgeInstance {
    /// Drive one transition through its states, logging each change.
    pub(crate) fn run_transition<F>(
        &self,
        step: Step,
        nonce: Option<Nonce>,
        amount: Amount,
        body: F,
    ) -> Result<Settlement, BridgeError>
    where
        F: FnOnce() -> Result<Settlement, BridgeError>,
    {
        let nonce = nonce.map(|n| n.to_string()).unwrap_or_default();

        if amount.is_zero() {
            debug!(
                chain_id = self.chain_id,
                step = %step,
                nonce = %nonce,
                "Zero amount, settling as no-op"
            );
            return Ok(Settlement::no_op(step));
        }

        debug!(
            chain_id = self.chain_id,
            step = %step,
            nonce = %nonce,
            amount = %amount,
            state = %TransferState::Requested,
            "Transition requested"
        );

        match body() {
            Ok(settlement) => {
                info!(
                    chain_id = self.chain_id,
                    step = %step,
                    nonce = %nonce,
                    amount = %amount,
                    position = settlement.event.as_ref().map(|e| e.position).unwrap_or_default(),
                    state = %settlement.state,
                    "Transition settled"
                );
                Ok(settlement)
            }
            Err(e) => {
                warn!(
                    chain_id = self.chain_id,
                    step = %step,
                    nonce = %nonce,
                    amount = %amount,
                    state = %TransferState::Rejected,
                    error = %e,
                    "Transition rejected"
                );
                Err(e)
            }
        }
    }

    pub(crate) fn mark_validated(&self, step: Step, nonce: Nonce) {
        debug!(
            chain_id = self.chain_id,
            step = %step,
            nonce = %nonce,
            state = %TransferState::Validated,
            "Signatures validated"
        );
    }
}
