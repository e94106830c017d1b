//! Burn: the holder destroys tokens on this side and signs its intent
//!
//! The emitted `Transfer{step: Burn}` record carries the holder's signature,
//! which is the credential the destination mint re-validates.

use alloy::primitives::{Address, Bytes};

use crate::error::BridgeError;
use crate::hash::AttestationMessage;
use crate::instance::BridgeInstance;
use crate::signature::recover_signer;
use crate::types::{Amount, BridgeEvent, Channel, Nonce, Settlement, Step, TransferRecord};

use super::now_secs;

impl BridgeInstance {
    /// Burn `amount` of `caller`'s tokens for delivery to `to` on the other side.
    pub fn burn(
        &self,
        caller: Address,
        to: Address,
        amount: Amount,
        nonce: Nonce,
        signature: Bytes,
    ) -> Result<Settlement, BridgeError> {
        self.run_transition(Step::Burn, Some(nonce), amount, || {
            let digest = AttestationMessage::UserIntent {
                from: caller,
                to,
                amount,
                nonce,
            }
            .digest();

            let recovered = recover_signer(&digest, &signature).ok();
            if recovered != Some(caller) {
                return Err(BridgeError::InvalidUserSignature {
                    expected: caller,
                    recovered,
                });
            }
            self.mark_validated(Step::Burn, nonce);

            let reservation = self
                .nonces
                .try_reserve(Channel::Burn, nonce)
                .ok_or(BridgeError::ReplayedNonce {
                    channel: Channel::Burn,
                    nonce,
                })?;

            self.token.burn(caller, amount)?;
            reservation.commit();

            let event = self.log.append(BridgeEvent::Transfer(TransferRecord {
                from: caller,
                to,
                amount,
                date: now_secs(),
                nonce,
                signature,
                step: Step::Burn,
            }));
            Ok(Settlement::settled(Step::Burn, event))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{BridgeError, TokenError};
    use crate::testing::{dev_address, ether, fund_tokens, test_instance, user_signature, BRIDGE_A, USER_KEY};
    use crate::types::{Channel, Step};
    use alloy::primitives::U256;

    #[test]
    fn test_burn_emits_transfer_record() {
        let (bridge, token) = test_instance(1);
        let user = dev_address(USER_KEY);
        let recipient = dev_address(1);
        fund_tokens(&token, BRIDGE_A, user, ether(100));

        let nonce = U256::from(1u64);
        let sig = user_signature(USER_KEY, recipient, ether(40), nonce);
        let settlement = bridge.burn(user, recipient, ether(40), nonce, sig.clone()).unwrap();

        let logged = settlement.event.unwrap();
        let record = logged.event.as_transfer().unwrap();
        assert_eq!(record.step, Step::Burn);
        assert_eq!(record.from, user);
        assert_eq!(record.to, recipient);
        assert_eq!(record.signature, sig);
        assert!(record.date > 0);
        assert_eq!(token.balance_of(&user), ether(60));
        assert!(bridge.is_nonce_consumed(Channel::Burn, nonce));
    }

    #[test]
    fn test_burn_requires_holder_signature() {
        let (bridge, token) = test_instance(1);
        let user = dev_address(USER_KEY);
        fund_tokens(&token, BRIDGE_A, user, ether(10));

        // Signed by someone else
        let sig = user_signature(0, dev_address(1), ether(1), U256::from(1u64));
        let err = bridge
            .burn(user, dev_address(1), ether(1), U256::from(1u64), sig)
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::InvalidUserSignature {
                expected: user,
                recovered: Some(dev_address(0)),
            }
        );
        assert_eq!(token.balance_of(&user), ether(10));
    }

    #[test]
    fn test_burn_over_balance_releases_nonce() {
        let (bridge, token) = test_instance(1);
        let user = dev_address(USER_KEY);
        fund_tokens(&token, BRIDGE_A, user, ether(1));

        let nonce = U256::from(3u64);
        let sig = user_signature(USER_KEY, dev_address(1), ether(2), nonce);
        let err = bridge.burn(user, dev_address(1), ether(2), nonce, sig).unwrap_err();
        assert!(matches!(err, BridgeError::Token(TokenError::InsufficientBalance { .. })));
        assert!(!bridge.is_nonce_consumed(Channel::Burn, nonce));
        assert_eq!(bridge.event_head(), 0);
    }

    #[test]
    fn test_burn_nonce_replay() {
        let (bridge, token) = test_instance(1);
        let user = dev_address(USER_KEY);
        fund_tokens(&token, BRIDGE_A, user, ether(10));

        let nonce = U256::from(1u64);
        let sig = user_signature(USER_KEY, dev_address(1), ether(1), nonce);
        bridge.burn(user, dev_address(1), ether(1), nonce, sig.clone()).unwrap();
        let err = bridge.burn(user, dev_address(1), ether(1), nonce, sig).unwrap_err();
        assert!(err.is_replay());
        assert_eq!(token.balance_of(&user), ether(9));
    }
}
