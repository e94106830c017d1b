//! Racing transitions on shared instances

use alloy::primitives::U256;
use bridge_core::testing::{
    dev_address, ether, mint_signatures, test_instance, user_signature, withdraw_signatures, BRIDGE_A,
    BRIDGE_B, RELAYER_KEY, USER_KEY,
};
use bridge_core::BridgeError;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_same_nonce_withdraw_race_has_one_winner() {
    let (bridge, _) = test_instance(1);
    let bridge = Arc::new(bridge);
    let owner = dev_address(0);
    bridge.deposit_eth(owner, ether(10)).unwrap();

    let nonce = U256::from(1u64);
    let sigs = Arc::new(withdraw_signatures(BRIDGE_A, owner, ether(1), nonce, &[0, 1]));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let bridge = Arc::clone(&bridge);
            let sigs = Arc::clone(&sigs);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                bridge.transfer_eth(owner, owner, ether(1), nonce, &sigs)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    let replays = results
        .iter()
        .filter(|r| matches!(r, Err(BridgeError::ReplayedNonce { .. })))
        .count();

    assert_eq!(winners, 1);
    assert_eq!(replays, 7);
    assert_eq!(bridge.locked_balance(), ether(9));
}

#[test]
fn test_distinct_nonces_proceed_in_parallel() {
    let (bridge, _) = test_instance(1);
    let bridge = Arc::new(bridge);
    let owner = dev_address(0);
    bridge.deposit_eth(owner, ether(20)).unwrap();

    let handles: Vec<_> = (1..=16u64)
        .map(|n| {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                let nonce = U256::from(n);
                let sigs = withdraw_signatures(BRIDGE_A, owner, ether(1), nonce, &[1, 2]);
                bridge.transfer_eth(owner, owner, ether(1), nonce, &sigs)
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(bridge.locked_balance(), ether(4));
    assert_eq!(bridge.disbursed_to(&owner), ether(16));
}

#[test]
fn test_withdrawals_never_overdraw() {
    let (bridge, _) = test_instance(1);
    let bridge = Arc::new(bridge);
    let owner = dev_address(0);
    bridge.deposit_eth(owner, ether(3)).unwrap();

    let handles: Vec<_> = (1..=8u64)
        .map(|n| {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                let nonce = U256::from(n);
                let sigs = withdraw_signatures(BRIDGE_A, owner, ether(1), nonce, &[0, 2]);
                bridge.transfer_eth(owner, owner, ether(1), nonce, &sigs)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, BridgeError::InsufficientBalance { .. })));
    assert_eq!(bridge.locked_balance(), U256::ZERO);
}

#[test]
fn test_concurrent_relayers_mint_once() {
    let (bridge, token) = test_instance(2);
    let bridge = Arc::new(bridge);
    bridge.deposit_eth(dev_address(0), ether(1)).unwrap();

    let user = dev_address(USER_KEY);
    let nonce = U256::from(11u64);
    let sig = user_signature(USER_KEY, user, ether(5), nonce);
    let owners = Arc::new(mint_signatures(BRIDGE_B, user, user, ether(5), nonce, &[0, 1]));
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let bridge = Arc::clone(&bridge);
            let owners = Arc::clone(&owners);
            let barrier = Arc::clone(&barrier);
            let sig = sig.clone();
            thread::spawn(move || {
                barrier.wait();
                bridge.mint(dev_address(RELAYER_KEY), user, user, ether(5), nonce, sig, &owners)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(token.balance_of(&user), ether(5));
}
