//! EthWithdraw: release locked collateral against owner signatures

use alloy::primitives::Address;

use crate::error::BridgeError;
use crate::hash::AttestationMessage;
use crate::instance::BridgeInstance;
use crate::signature::SignatureSet;
use crate::types::{Amount, BridgeEvent, Channel, Nonce, Settlement, Step};

impl BridgeInstance {
    /// Pay `amount` of locked collateral to `to`.
    ///
    /// Requires a threshold of owner signatures over
    /// `("transferEth", to, amount, nonce, self.address)`. Consumes `nonce` on
    /// the withdraw channel and emits `EthSent(caller, to, amount)`.
    pub fn transfer_eth(
        &self,
        caller: Address,
        to: Address,
        amount: Amount,
        nonce: Nonce,
        signatures: &SignatureSet,
    ) -> Result<Settlement, BridgeError> {
        self.run_transition(Step::EthWithdraw, Some(nonce), amount, || {
            let digest = AttestationMessage::TransferEth {
                to,
                amount,
                nonce,
                bridge: self.address,
            }
            .digest();

            let tally = self.policy.tally(&digest, signatures);
            if tally.count() < self.policy.required() {
                return Err(BridgeError::InsufficientSignatures {
                    got: tally.count(),
                    required: self.policy.required(),
                });
            }
            self.mark_validated(Step::EthWithdraw, nonce);

            let reservation = self
                .nonces
                .try_reserve(Channel::Withdraw, nonce)
                .ok_or(BridgeError::ReplayedNonce {
                    channel: Channel::Withdraw,
                    nonce,
                })?;

            // Dropping the reservation on failure releases the nonce
            let withdrawal = self.ledger.reserve_withdrawal(amount)?;
            reservation.commit();
            self.ledger.disburse(withdrawal, to);

            let event = self.log.append(BridgeEvent::EthSent { caller, to, amount });
            Ok(Settlement::settled(Step::EthWithdraw, event))
        })
    }
}
