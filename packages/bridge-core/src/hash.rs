//! Canonical attestation messages
//!
//! Signatures are produced over the keccak256 digest of a packed tuple
//! (`abi.encodePacked` layout, no padding):
//!
//! | message       | layout                                                        |
//! |---------------|---------------------------------------------------------------|
//! | `TransferEth` | `"transferEth" ‖ to ‖ amount ‖ nonce ‖ bridge`                |
//! | `Mint`        | `"mint" ‖ from ‖ to ‖ amount ‖ nonce ‖ bridge`                |
//! | `UserIntent`  | `from ‖ to ‖ amount ‖ nonce`                                  |
//!
//! Strings are raw UTF-8, addresses 20 bytes, `uint256` values 32 bytes
//! big-endian. The digest is then signed as an EIP-191 personal message.
//!
//! Some deployment scripts of the original contracts built the withdraw
//! message from 32-byte padded words instead. Those digests do not verify
//! against this encoding; the packed form is the only one accepted here.

use alloy::primitives::{Address, B256, U256};
use tiny_keccak::{Hasher, Keccak};

pub const TRANSFER_ETH_TAG: &str = "transferEth";
pub const MINT_TAG: &str = "mint";

/// Compute keccak256 hash of data
pub fn keccak256(data: &[u8]) -> B256 {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    B256::from(output)
}

/// Message bound by a signature set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttestationMessage {
    /// Owners authorize releasing locked collateral from `bridge`
    TransferEth {
        to: Address,
        amount: U256,
        nonce: U256,
        bridge: Address,
    },
    /// Owners attest they observed the matching burn, for minting on `bridge`
    Mint {
        from: Address,
        to: Address,
        amount: U256,
        nonce: U256,
        bridge: Address,
    },
    /// Token holder's intent to move `amount` to `to` on the other side
    UserIntent {
        from: Address,
        to: Address,
        amount: U256,
        nonce: U256,
    },
}

impl AttestationMessage {
    /// Action tag prefixed to the packed tuple, if any
    pub fn action_tag(&self) -> Option<&'static str> {
        match self {
            AttestationMessage::TransferEth { .. } => Some(TRANSFER_ETH_TAG),
            AttestationMessage::Mint { .. } => Some(MINT_TAG),
            AttestationMessage::UserIntent { .. } => None,
        }
    }

    /// Packed encoding of the message tuple
    pub fn encode(&self) -> Vec<u8> {
        let mut packed = PackedEncoder::default();
        if let Some(tag) = self.action_tag() {
            packed.string(tag);
        }

        match *self {
            AttestationMessage::TransferEth {
                to,
                amount,
                nonce,
                bridge,
            } => packed
                .address(to)
                .uint256(amount)
                .uint256(nonce)
                .address(bridge),
            AttestationMessage::Mint {
                from,
                to,
                amount,
                nonce,
                bridge,
            } => packed
                .address(from)
                .address(to)
                .uint256(amount)
                .uint256(nonce)
                .address(bridge),
            AttestationMessage::UserIntent {
                from,
                to,
                amount,
                nonce,
            } => packed
                .address(from)
                .address(to)
                .uint256(amount)
                .uint256(nonce),
        };

        packed.finish()
    }

    /// keccak256 of the packed encoding; this is what signers sign
    pub fn digest(&self) -> B256 {
        keccak256(&self.encode())
    }
}

/// Minimal `abi.encodePacked` writer for the types the bridge signs over
#[derive(Debug, Default)]
struct PackedEncoder {
    buf: Vec<u8>,
}

impl PackedEncoder {
    fn string(&mut self, value: &str) -> &mut Self {
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    fn address(&mut self, value: Address) -> &mut Self {
        self.buf.extend_from_slice(value.as_slice());
        self
    }

    fn uint256(&mut self, value: U256) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes::<32>());
        self
    }

    fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// Convert bytes to hex string with 0x prefix
pub fn bytes32_to_hex(bytes: &B256) -> String {
    format!("0x{}", hex::encode(bytes.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use alloy::sol_types::SolValue;

    const FROM: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const TO: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
    const BRIDGE: Address = address!("9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");

    #[test]
    fn test_keccak256() {
        let result = keccak256(b"hello");
        assert_eq!(
            bytes32_to_hex(&result),
            "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
        assert_eq!(result, alloy::primitives::keccak256(b"hello"));
    }

    #[test]
    fn test_transfer_eth_matches_solidity_packed() {
        let amount = U256::from(500_000_000_000_000_000u128);
        let nonce = U256::from(1u64);
        let message = AttestationMessage::TransferEth {
            to: FROM,
            amount,
            nonce,
            bridge: BRIDGE,
        };

        let expected = (TRANSFER_ETH_TAG.to_string(), FROM, amount, nonce, BRIDGE).abi_encode_packed();
        assert_eq!(message.encode(), expected);
        // 11 + 20 + 32 + 32 + 20
        assert_eq!(message.encode().len(), 115);
    }

    #[test]
    fn test_mint_matches_solidity_packed() {
        let amount = U256::from(100u64) * U256::from(10u64).pow(U256::from(18u64));
        let nonce = U256::from(1u64);
        let message = AttestationMessage::Mint {
            from: FROM,
            to: TO,
            amount,
            nonce,
            bridge: BRIDGE,
        };

        let expected = (MINT_TAG.to_string(), FROM, TO, amount, nonce, BRIDGE).abi_encode_packed();
        assert_eq!(message.encode(), expected);
        assert_eq!(message.digest(), keccak256(&expected));
    }

    #[test]
    fn test_user_intent_has_no_tag() {
        let message = AttestationMessage::UserIntent {
            from: FROM,
            to: TO,
            amount: U256::from(50u64),
            nonce: U256::from(1u64),
        };
        assert_eq!(message.action_tag(), None);
        assert_eq!(message.encode().len(), 104);
        assert_eq!(
            message.encode(),
            (FROM, TO, U256::from(50u64), U256::from(1u64)).abi_encode_packed()
        );
    }

    #[test]
    fn test_destination_binds_digest() {
        let base = AttestationMessage::Mint {
            from: FROM,
            to: TO,
            amount: U256::from(10u64),
            nonce: U256::from(7u64),
            bridge: BRIDGE,
        };
        let other_bridge = AttestationMessage::Mint {
            from: FROM,
            to: TO,
            amount: U256::from(10u64),
            nonce: U256::from(7u64),
            bridge: TO,
        };
        assert_eq!(base.digest(), base.digest());
        assert_ne!(base.digest(), other_bridge.digest());
    }
}
