//! Deposit and withdraw scenarios against a 2-of-3 bridge instance

use alloy::primitives::U256;
use bridge_core::testing::{dev_address, ether, ether_str, test_instance, withdraw_signatures, BRIDGE_A};
use bridge_core::{BridgeError, BridgeEvent, Channel, SignatureSet};

#[test]
fn test_deposit_then_threshold_withdraw() {
    let (bridge, _) = test_instance(1);
    let owner = dev_address(0);

    bridge.deposit_eth(owner, ether(2)).unwrap();
    assert_eq!(bridge.locked_balance(), ether(2));

    let amount = ether_str("0.5");
    let nonce = U256::from(1u64);
    let sigs = withdraw_signatures(BRIDGE_A, owner, amount, nonce, &[0, 1]);

    bridge.transfer_eth(owner, owner, amount, nonce, &sigs).unwrap();
    assert_eq!(bridge.locked_balance(), ether_str("1.5"));

    let sent: Vec<_> = bridge
        .events_since(0)
        .into_iter()
        .filter(|e| matches!(e.event, BridgeEvent::EthSent { .. }))
        .collect();
    assert_eq!(sent.len(), 1);

    // Identical call again
    let err = bridge.transfer_eth(owner, owner, amount, nonce, &sigs).unwrap_err();
    assert_eq!(
        err,
        BridgeError::ReplayedNonce {
            channel: Channel::Withdraw,
            nonce
        }
    );
    assert_eq!(bridge.locked_balance(), ether_str("1.5"));
    assert_eq!(bridge.event_head(), 2);
}

#[test]
fn test_single_signature_is_not_enough() {
    let (bridge, _) = test_instance(1);
    let owner = dev_address(0);
    bridge.deposit_eth(owner, ether(2)).unwrap();

    let nonce = U256::from(1u64);
    let sigs = withdraw_signatures(BRIDGE_A, owner, ether(1), nonce, &[2]);
    let err = bridge.transfer_eth(owner, owner, ether(1), nonce, &sigs).unwrap_err();

    assert_eq!(
        err,
        BridgeError::InsufficientSignatures {
            got: 1,
            required: 2
        }
    );
    assert_eq!(bridge.locked_balance(), ether(2));
    // The nonce is still available for a properly signed request
    assert!(!bridge.is_nonce_consumed(Channel::Withdraw, nonce));
}

#[test]
fn test_duplicate_signer_does_not_reach_threshold() {
    let (bridge, _) = test_instance(1);
    let owner = dev_address(0);
    bridge.deposit_eth(owner, ether(2)).unwrap();

    let nonce = U256::from(1u64);
    let sigs = withdraw_signatures(BRIDGE_A, owner, ether(1), nonce, &[1, 1, 1]);
    let err = bridge.transfer_eth(owner, owner, ether(1), nonce, &sigs).unwrap_err();

    assert!(matches!(err, BridgeError::InsufficientSignatures { got: 1, .. }));
    assert_eq!(bridge.locked_balance(), ether(2));
}

#[test]
fn test_withdraw_more_than_locked() {
    let (bridge, _) = test_instance(1);
    let owner = dev_address(0);
    bridge.deposit_eth(owner, ether(2)).unwrap();

    let nonce = U256::from(1u64);
    let sigs = withdraw_signatures(BRIDGE_A, owner, ether(3), nonce, &[0, 1, 2]);
    let err = bridge.transfer_eth(owner, owner, ether(3), nonce, &sigs).unwrap_err();

    assert_eq!(
        err,
        BridgeError::InsufficientBalance {
            requested: ether(3),
            available: ether(2),
        }
    );
    assert_eq!(bridge.locked_balance(), ether(2));
    assert_eq!(bridge.disbursed_to(&owner), U256::ZERO);
}

#[test]
fn test_failed_withdraw_leaves_balance_untouched() {
    let (bridge, _) = test_instance(1);
    let owner = dev_address(0);
    bridge.deposit_eth(owner, ether(5)).unwrap();

    let nonce = U256::from(9u64);
    let valid = withdraw_signatures(BRIDGE_A, owner, ether(1), nonce, &[0, 2]);
    bridge.transfer_eth(owner, owner, ether(1), nonce, &valid).unwrap();
    let before = bridge.locked_balance();

    // Bad signatures at a fresh nonce, then a replayed nonce with good ones
    let fresh = U256::from(10u64);
    let bad = withdraw_signatures(BRIDGE_A, owner, ether(2), fresh, &[3, 4]);
    assert!(bridge.transfer_eth(owner, owner, ether(1), fresh, &bad).is_err());
    assert!(bridge.transfer_eth(owner, owner, ether(1), nonce, &valid).is_err());
    assert!(bridge
        .transfer_eth(owner, owner, ether(1), fresh, &SignatureSet::new())
        .is_err());

    assert_eq!(bridge.locked_balance(), before);
    assert_eq!(bridge.disbursed_to(&owner), ether(1));
}

#[test]
fn test_withdraw_nonce_is_independent_of_other_channels() {
    let (bridge, _) = test_instance(1);
    let owner = dev_address(0);
    bridge.deposit_eth(owner, ether(2)).unwrap();

    let nonce = U256::from(1u64);
    for amount in [ether(1), ether_str("0.5")] {
        let sigs = withdraw_signatures(BRIDGE_A, owner, amount, nonce, &[0, 1]);
        let result = bridge.transfer_eth(owner, owner, amount, nonce, &sigs);
        if amount == ether(1) {
            assert!(result.is_ok());
        } else {
            // Different amount, same nonce: still a replay on the withdraw channel
            assert!(result.unwrap_err().is_replay());
        }
    }
    assert!(!bridge.is_nonce_consumed(Channel::Burn, nonce));
    assert!(!bridge.is_nonce_consumed(Channel::Mint, nonce));
}
