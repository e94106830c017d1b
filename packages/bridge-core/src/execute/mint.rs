//! Mint: relayer-submitted mirror of a burn observed on the other side
//!
//! Needs both the holder's original intent signature and a threshold of this
//! instance's owners attesting `("mint", from, to, amount, nonce, self)`. The
//! submitting relayer is reimbursed `relayer_fee` out of the locked balance.

use alloy::primitives::{Address, Bytes};

use crate::error::BridgeError;
use crate::hash::AttestationMessage;
use crate::instance::BridgeInstance;
use crate::signature::{recover_signer, SignatureSet};
use crate::types::{Amount, BridgeEvent, Channel, Nonce, Settlement, Step, TransferRecord};

use super::now_secs;

impl BridgeInstance {
    /// Mint `amount` to `to`, mirroring `from`'s burn with the same nonce.
    #[allow(clippy::too_many_arguments)]
    pub fn mint(
        &self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
        nonce: Nonce,
        user_signature: Bytes,
        owner_signatures: &SignatureSet,
    ) -> Result<Settlement, BridgeError> {
        self.run_transition(Step::Mint, Some(nonce), amount, || {
            let owner_digest = AttestationMessage::Mint {
                from,
                to,
                amount,
                nonce,
                bridge: self.address,
            }
            .digest();
            let tally = self.policy.tally(&owner_digest, owner_signatures);
            if tally.count() < self.policy.required() {
                return Err(BridgeError::InsufficientOwnerSignatures {
                    got: tally.count(),
                    required: self.policy.required(),
                });
            }

            let intent_digest = AttestationMessage::UserIntent {
                from,
                to,
                amount,
                nonce,
            }
            .digest();
            let recovered = recover_signer(&intent_digest, &user_signature).ok();
            if recovered != Some(from) {
                return Err(BridgeError::InvalidUserSignature {
                    expected: from,
                    recovered,
                });
            }
            self.mark_validated(Step::Mint, nonce);

            let reservation = self
                .nonces
                .try_reserve(Channel::Mint, nonce)
                .ok_or(BridgeError::ReplayedNonce {
                    channel: Channel::Mint,
                    nonce,
                })?;

            // The fee is held out of the locked balance until the token mint
            // settles; a concurrent withdrawal sees the smaller balance
            let fee = self.ledger.reserve_withdrawal(self.relayer_fee)?;
            if let Err(e) = self.token.mint(to, amount) {
                self.ledger.refund(fee);
                return Err(e.into());
            }
            reservation.commit();
            self.ledger.disburse(fee, caller);

            let event = self.log.append(BridgeEvent::Transfer(TransferRecord {
                from,
                to,
                amount,
                date: now_secs(),
                nonce,
                signature: user_signature,
                step: Step::Mint,
            }));
            Ok(Settlement::settled(Step::Mint, event))
        })
    }
}
