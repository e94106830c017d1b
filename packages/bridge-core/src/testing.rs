//! Deterministic keys and signing helpers for tests and local simulations
//!
//! Keys are the well-known anvil/hardhat development accounts. Never fund
//! them on a live network.

use alloy::primitives::utils::parse_ether;
use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use std::sync::Arc;

use crate::hash::AttestationMessage;
use crate::instance::{BridgeConfig, BridgeInstance};
use crate::signature::{sign_digest, SignatureSet};
use crate::token::{AuthorizedToken, MintableToken};

pub const ANVIL_KEYS: [&str; 5] = [
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    "0x7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6",
    "0x47e179ec197488593b187f80a00eb0da91f1b9d0b13f8733639f19c30a34926a",
];

/// Dev keys 0..3 own every test instance
pub const OWNER_KEYS: [usize; 3] = [0, 1, 2];
/// Token holder
pub const USER_KEY: usize = 3;
/// Submits mints and collects the gas reimbursement
pub const RELAYER_KEY: usize = 4;

/// First contract addresses anvil assigns to the deployer
pub const BRIDGE_A: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
pub const BRIDGE_B: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");

pub fn dev_signer(index: usize) -> PrivateKeySigner {
    ANVIL_KEYS[index]
        .parse()
        .expect("anvil development keys are valid")
}

pub fn dev_address(index: usize) -> Address {
    dev_signer(index).address()
}

pub fn owner_addresses() -> Vec<Address> {
    OWNER_KEYS.iter().map(|i| dev_address(*i)).collect()
}

/// `n` whole ether in wei
pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

/// Decimal ether string (`"0.5"`) in wei
pub fn ether_str(value: &str) -> U256 {
    parse_ether(value).expect("valid ether amount")
}

/// Sign `digest` with each listed dev key, in order
pub fn sign_set(keys: &[usize], digest: &B256) -> SignatureSet {
    let mut set = SignatureSet::new();
    for index in keys {
        let signer = dev_signer(*index);
        let signature = sign_digest(&signer, digest).expect("local signing succeeds");
        set.push(signer.address(), signature);
    }
    set
}

pub fn withdraw_signatures(bridge: Address, to: Address, amount: U256, nonce: U256, keys: &[usize]) -> SignatureSet {
    let digest = AttestationMessage::TransferEth {
        to,
        amount,
        nonce,
        bridge,
    }
    .digest();
    sign_set(keys, &digest)
}

pub fn mint_signatures(
    bridge: Address,
    from: Address,
    to: Address,
    amount: U256,
    nonce: U256,
    keys: &[usize],
) -> SignatureSet {
    let digest = AttestationMessage::Mint {
        from,
        to,
        amount,
        nonce,
        bridge,
    }
    .digest();
    sign_set(keys, &digest)
}

/// Holder `key` signs its intent to move `amount` to `to`
pub fn user_signature(key: usize, to: Address, amount: U256, nonce: U256) -> Bytes {
    let digest = AttestationMessage::UserIntent {
        from: dev_address(key),
        to,
        amount,
        nonce,
    }
    .digest();
    sign_digest(&dev_signer(key), &digest).expect("local signing succeeds")
}

/// 2-of-3 instance at [`BRIDGE_A`] (odd chain ids) or [`BRIDGE_B`] (even),
/// installed as admin of a fresh token
pub fn test_instance(chain_id: u64) -> (BridgeInstance, Arc<MintableToken>) {
    let bridge = if chain_id % 2 == 1 { BRIDGE_A } else { BRIDGE_B };
    let deployer = dev_address(0);

    let token = Arc::new(MintableToken::new("Mirror Token", "MIR", deployer));
    token
        .update_admin(deployer, bridge)
        .expect("deployer is the initial admin");

    let config = BridgeConfig::new(chain_id, bridge, owner_addresses(), 2);
    let instance = BridgeInstance::new(config, Arc::new(AuthorizedToken::new(Arc::clone(&token), bridge)))
        .expect("valid test configuration");
    (instance, token)
}

/// Seed `holder` with `amount` tokens by minting as the bridge
pub fn fund_tokens(token: &MintableToken, bridge: Address, holder: Address, amount: U256) {
    token
        .mint_from(bridge, holder, amount)
        .expect("bridge is the token admin");
}
