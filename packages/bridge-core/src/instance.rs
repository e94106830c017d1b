//! Bridge instance aggregate
//!
//! A [`BridgeInstance`] is the bridge deployed on one chain side. It is the
//! sole owner of its locked balance, nonce registry and event log; the only
//! way to mutate them is through the transitions in [`crate::execute`].

use alloy::primitives::{Address, U256};
use std::fmt;
use std::sync::Arc;

use crate::error::BridgeError;
use crate::event_log::EventLog;
use crate::ledger::BridgeLedger;
use crate::nonce::NonceRegistry;
use crate::signature::SignaturePolicy;
use crate::token::TokenCapability;
use crate::types::{Channel, LoggedEvent, Nonce};

/// 0.1 ether, the gas reimbursement paid to the relayer on every mint
pub const DEFAULT_RELAYER_FEE: U256 = U256::from_limbs([100_000_000_000_000_000, 0, 0, 0]);

/// Parameters fixed at instance creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub chain_id: u64,
    /// Identity of this instance; bound into every owner attestation
    pub address: Address,
    pub owners: Vec<Address>,
    pub required_signatures: usize,
    pub relayer_fee: U256,
}

impl BridgeConfig {
    pub fn new(chain_id: u64, address: Address, owners: Vec<Address>, required_signatures: usize) -> Self {
        Self {
            chain_id,
            address,
            owners,
            required_signatures,
            relayer_fee: DEFAULT_RELAYER_FEE,
        }
    }

    pub fn with_relayer_fee(mut self, fee: U256) -> Self {
        self.relayer_fee = fee;
        self
    }
}

pub struct BridgeInstance {
    pub(crate) chain_id: u64,
    pub(crate) address: Address,
    pub(crate) relayer_fee: U256,
    pub(crate) policy: SignaturePolicy,
    pub(crate) nonces: NonceRegistry,
    pub(crate) ledger: BridgeLedger,
    pub(crate) token: Arc<dyn TokenCapability>,
    pub(crate) log: EventLog,
}

impl fmt::Debug for BridgeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeInstance")
            .field("chain_id", &self.chain_id)
            .field("address", &self.address)
            .field("owners", &self.policy.owners())
            .field("required_signatures", &self.policy.required())
            .field("locked_balance", &self.ledger.locked_balance())
            .field("events", &self.log.len())
            .finish()
    }
}

impl BridgeInstance {
    pub fn new(config: BridgeConfig, token: Arc<dyn TokenCapability>) -> Result<Self, BridgeError> {
        if config.address.is_zero() {
            return Err(BridgeError::InvalidPolicy {
                reason: "bridge address must be non-zero".to_string(),
            });
        }
        let policy = SignaturePolicy::new(config.owners, config.required_signatures)?;

        tracing::info!(
            chain_id = config.chain_id,
            bridge = %config.address,
            owners = policy.owners().len(),
            required = policy.required(),
            "Bridge instance created"
        );

        Ok(Self {
            chain_id: config.chain_id,
            address: config.address,
            relayer_fee: config.relayer_fee,
            policy,
            nonces: NonceRegistry::new(),
            ledger: BridgeLedger::new(),
            token,
            log: EventLog::new(),
        })
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn policy(&self) -> &SignaturePolicy {
        &self.policy
    }

    pub fn owners(&self) -> &[Address] {
        self.policy.owners()
    }

    pub fn required_signatures(&self) -> usize {
        self.policy.required()
    }

    pub fn relayer_fee(&self) -> U256 {
        self.relayer_fee
    }

    pub fn locked_balance(&self) -> U256 {
        self.ledger.locked_balance()
    }

    /// Native amount paid out to `recipient` by withdrawals and relayer fees
    pub fn disbursed_to(&self, recipient: &Address) -> U256 {
        self.ledger.disbursed_to(recipient)
    }

    pub fn is_nonce_consumed(&self, channel: Channel, nonce: Nonce) -> bool {
        self.nonces.is_consumed(channel, nonce)
    }

    pub fn token_balance(&self, holder: &Address) -> U256 {
        self.token.balance_of(holder)
    }

    pub fn events_since(&self, position: u64) -> Vec<LoggedEvent> {
        self.log.since(position)
    }

    pub fn events_in_range(&self, from: u64, to: u64) -> Vec<LoggedEvent> {
        self.log.range(from, to)
    }

    /// Position of the latest emitted event
    pub fn event_head(&self) -> u64 {
        self.log.head()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dev_address, test_instance};
    use crate::token::{AuthorizedToken, MintableToken};

    #[test]
    fn test_default_fee_is_tenth_of_ether() {
        assert_eq!(DEFAULT_RELAYER_FEE, U256::from(10u64).pow(U256::from(17u64)));
    }

    #[test]
    fn test_new_instance_views() {
        let (bridge, _token) = test_instance(1);
        assert_eq!(bridge.chain_id(), 1);
        assert_eq!(bridge.owners().len(), 3);
        assert_eq!(bridge.required_signatures(), 2);
        assert_eq!(bridge.locked_balance(), U256::ZERO);
        assert_eq!(bridge.event_head(), 0);
        assert!(!bridge.is_nonce_consumed(Channel::Withdraw, U256::from(1u64)));
    }

    #[test]
    fn test_rejects_bad_config() {
        let token = Arc::new(MintableToken::new("Mirror Token", "MIR", dev_address(0)));
        let capability = Arc::new(AuthorizedToken::new(token, dev_address(4)));

        let zero_address = BridgeConfig::new(1, Address::ZERO, vec![dev_address(0)], 1);
        assert!(BridgeInstance::new(zero_address, capability.clone()).is_err());

        let threshold_too_high = BridgeConfig::new(1, dev_address(4), vec![dev_address(0)], 2);
        assert!(matches!(
            BridgeInstance::new(threshold_too_high, capability),
            Err(BridgeError::InvalidPolicy { .. })
        ));
    }
}
