//! EthDeposit: lock native collateral, no signatures involved

use alloy::primitives::Address;

use crate::error::BridgeError;
use crate::instance::BridgeInstance;
use crate::types::{Amount, BridgeEvent, Settlement, Step};

impl BridgeInstance {
    /// Lock `amount` sent by `from` and emit `EthDeposited(from, amount)`.
    pub fn deposit_eth(&self, from: Address, amount: Amount) -> Result<Settlement, BridgeError> {
        self.run_transition(Step::EthDeposit, None, amount, || {
            self.ledger.deposit(amount)?;
            let event = self.log.append(BridgeEvent::EthDeposited { from, amount });
            Ok(Settlement::settled(Step::EthDeposit, event))
        })
    }

    /// Bare value transfer to the bridge; same effect as [`Self::deposit_eth`].
    pub fn receive(&self, from: Address, amount: Amount) -> Result<Settlement, BridgeError> {
        self.deposit_eth(from, amount)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{dev_address, ether, test_instance};
    use crate::types::{BridgeEvent, TransferState};
    use alloy::primitives::U256;

    #[test]
    fn test_deposit_locks_and_emits() {
        let (bridge, _) = test_instance(1);
        let from = dev_address(3);

        let settlement = bridge.deposit_eth(from, ether(2)).unwrap();
        assert_eq!(settlement.state, TransferState::Settled);
        let event = settlement.event.unwrap();
        assert_eq!(event.position, 1);
        assert_eq!(
            event.event,
            BridgeEvent::EthDeposited {
                from,
                amount: ether(2)
            }
        );
        assert_eq!(bridge.locked_balance(), ether(2));
    }

    #[test]
    fn test_receive_matches_deposit() {
        let (bridge, _) = test_instance(1);
        bridge.receive(dev_address(3), ether(1)).unwrap();
        bridge.deposit_eth(dev_address(3), ether(1)).unwrap();
        assert_eq!(bridge.locked_balance(), ether(2));
        let names: Vec<_> = bridge.events_since(0).iter().map(|e| e.event.name()).collect();
        assert_eq!(names, vec!["EthDeposited", "EthDeposited"]);
    }

    #[test]
    fn test_zero_deposit_is_no_op() {
        let (bridge, _) = test_instance(1);
        let settlement = bridge.deposit_eth(dev_address(3), U256::ZERO).unwrap();
        assert!(settlement.is_no_op());
        assert_eq!(bridge.event_head(), 0);
    }
}
