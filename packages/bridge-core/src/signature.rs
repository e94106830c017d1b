//! Threshold signature policy
//!
//! A [`SignaturePolicy`] holds the fixed owner set of one bridge instance and
//! the number of distinct owner signatures a message needs. Signers are always
//! recovered from the signature itself; the claimed signer in an
//! [`Attestation`] must match the recovered one to count.

use alloy::primitives::{Address, Bytes, PrimitiveSignature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use std::collections::HashSet;
use thiserror::Error;

use crate::error::BridgeError;

/// secp256k1 group order / 2; signatures with a larger `s` are malleable
const SECP256K1N_HALF: U256 = U256::from_be_bytes(alloy::primitives::hex!(
    "7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0"
));

/// Why a single signature did not count toward the threshold
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureFault {
    #[error("malformed signature encoding")]
    Malformed,

    #[error("non-canonical signature (high s)")]
    HighS,

    #[error("signature recovers to {recovered}, claimed {claimed}")]
    SignerMismatch { claimed: Address, recovered: Address },

    #[error("{0} is not an owner")]
    NotOwner(Address),

    #[error("duplicate signer {0}")]
    Duplicate(Address),
}

/// Recover the EIP-191 signer of a 32-byte digest.
///
/// Rejects anything but a 65-byte `r ‖ s ‖ v` encoding with low `s`.
pub fn recover_signer(digest: &B256, signature: &[u8]) -> Result<Address, SignatureFault> {
    let sig = PrimitiveSignature::try_from(signature).map_err(|_| SignatureFault::Malformed)?;
    if sig.s() > SECP256K1N_HALF {
        return Err(SignatureFault::HighS);
    }
    sig.recover_address_from_msg(digest.as_slice())
        .map_err(|_| SignatureFault::Malformed)
}

/// Sign a digest as an EIP-191 personal message, returning the 65-byte encoding.
pub fn sign_digest(signer: &PrivateKeySigner, digest: &B256) -> Result<Bytes, alloy::signers::Error> {
    let signature = signer.sign_message_sync(digest.as_slice())?;
    Ok(Bytes::from(signature.as_bytes().to_vec()))
}

// ============================================================================
// Signature Sets
// ============================================================================

/// One (signer, signature) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub signer: Address,
    pub signature: Bytes,
}

/// Ordered list of attestations over one message digest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureSet {
    entries: Vec<Attestation>,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, signer: Address, signature: Bytes) {
        self.entries.push(Attestation { signer, signature });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attestation> {
        self.entries.iter()
    }

    /// Raw signatures in order, as submitted on chain
    pub fn signatures(&self) -> Vec<Bytes> {
        self.entries.iter().map(|a| a.signature.clone()).collect()
    }

    /// Build a set from raw signatures by recovering each signer.
    ///
    /// Entries that fail to recover are kept with a zero signer so the policy
    /// reports them as faults instead of silently dropping them.
    pub fn from_signatures(digest: &B256, signatures: &[Bytes]) -> Self {
        let entries = signatures
            .iter()
            .map(|signature| Attestation {
                signer: recover_signer(digest, signature).unwrap_or(Address::ZERO),
                signature: signature.clone(),
            })
            .collect();
        Self { entries }
    }
}

impl FromIterator<Attestation> for SignatureSet {
    fn from_iter<I: IntoIterator<Item = Attestation>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Result of checking a set against a policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureTally {
    /// Distinct owners with a valid signature, in set order
    pub signers: Vec<Address>,
    /// Entries that did not count, by index in the set
    pub faults: Vec<(usize, SignatureFault)>,
}

impl SignatureTally {
    pub fn count(&self) -> usize {
        self.signers.len()
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Owner set and threshold of one bridge instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePolicy {
    owners: Vec<Address>,
    required: usize,
}

impl SignaturePolicy {
    /// Create a policy; owners must be distinct, non-zero, and
    /// `1 <= required <= owners.len()`.
    pub fn new(owners: Vec<Address>, required: usize) -> Result<Self, BridgeError> {
        if owners.is_empty() {
            return Err(BridgeError::InvalidPolicy {
                reason: "owner set is empty".to_string(),
            });
        }
        if owners.iter().any(|o| o.is_zero()) {
            return Err(BridgeError::InvalidPolicy {
                reason: "zero address cannot be an owner".to_string(),
            });
        }
        let mut seen = HashSet::new();
        if let Some(dup) = owners.iter().find(|o| !seen.insert(**o)) {
            return Err(BridgeError::InvalidPolicy {
                reason: format!("duplicate owner {dup}"),
            });
        }
        if required == 0 || required > owners.len() {
            return Err(BridgeError::InvalidPolicy {
                reason: format!(
                    "required signatures must be in 1..={}, got {}",
                    owners.len(),
                    required
                ),
            });
        }
        Ok(Self { owners, required })
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }

    /// Count distinct owner signers over `digest`, recording why other entries
    /// did not count.
    pub fn tally(&self, digest: &B256, set: &SignatureSet) -> SignatureTally {
        let mut tally = SignatureTally::default();
        let mut seen = HashSet::new();

        for (index, attestation) in set.iter().enumerate() {
            let recovered = match recover_signer(digest, &attestation.signature) {
                Ok(address) => address,
                Err(fault) => {
                    tally.faults.push((index, fault));
                    continue;
                }
            };
            if recovered != attestation.signer {
                tally.faults.push((
                    index,
                    SignatureFault::SignerMismatch {
                        claimed: attestation.signer,
                        recovered,
                    },
                ));
                continue;
            }
            if !self.is_owner(&recovered) {
                tally.faults.push((index, SignatureFault::NotOwner(recovered)));
                continue;
            }
            if !seen.insert(recovered) {
                tally.faults.push((index, SignatureFault::Duplicate(recovered)));
                continue;
            }
            tally.signers.push(recovered);
        }

        tally
    }

    /// True iff at least `required` distinct owners signed `digest`
    pub fn verify(&self, digest: &B256, set: &SignatureSet) -> bool {
        self.tally(digest, set).count() >= self.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::AttestationMessage;
    use crate::testing::{dev_address, dev_signer, sign_set};

    fn policy_2_of_3() -> SignaturePolicy {
        SignaturePolicy::new(vec![dev_address(0), dev_address(1), dev_address(2)], 2).unwrap()
    }

    fn digest() -> B256 {
        AttestationMessage::TransferEth {
            to: dev_address(0),
            amount: U256::from(5u64),
            nonce: U256::from(1u64),
            bridge: dev_address(4),
        }
        .digest()
    }

    #[test]
    fn test_policy_validation() {
        assert!(SignaturePolicy::new(vec![], 1).is_err());
        assert!(SignaturePolicy::new(vec![dev_address(0)], 0).is_err());
        assert!(SignaturePolicy::new(vec![dev_address(0)], 2).is_err());
        assert!(SignaturePolicy::new(vec![dev_address(0), dev_address(0)], 1).is_err());
        assert!(SignaturePolicy::new(vec![Address::ZERO], 1).is_err());
        assert!(SignaturePolicy::new(vec![dev_address(0), dev_address(1)], 2).is_ok());
    }

    #[test]
    fn test_sign_and_recover() {
        let signer = dev_signer(1);
        let d = digest();
        let sig = sign_digest(&signer, &d).unwrap();
        assert_eq!(sig.len(), 65);
        assert_eq!(recover_signer(&d, &sig).unwrap(), signer.address());
    }

    #[test]
    fn test_threshold_met() {
        let d = digest();
        let set = sign_set(&[0, 1], &d);
        assert!(policy_2_of_3().verify(&d, &set));
    }

    #[test]
    fn test_below_threshold() {
        let d = digest();
        let set = sign_set(&[2], &d);
        let tally = policy_2_of_3().tally(&d, &set);
        assert_eq!(tally.count(), 1);
        assert!(!policy_2_of_3().verify(&d, &set));
    }

    #[test]
    fn test_duplicate_signer_counts_once() {
        let d = digest();
        let set = sign_set(&[0, 0], &d);
        let tally = policy_2_of_3().tally(&d, &set);
        assert_eq!(tally.count(), 1);
        assert_eq!(tally.faults, vec![(1, SignatureFault::Duplicate(dev_address(0)))]);
        assert!(!policy_2_of_3().verify(&d, &set));
    }

    #[test]
    fn test_non_owner_ignored() {
        let d = digest();
        // dev key 3 is not an owner
        let set = sign_set(&[0, 3], &d);
        let tally = policy_2_of_3().tally(&d, &set);
        assert_eq!(tally.signers, vec![dev_address(0)]);
        assert_eq!(tally.faults, vec![(1, SignatureFault::NotOwner(dev_address(3)))]);
    }

    #[test]
    fn test_signature_over_other_message_does_not_count() {
        let d = digest();
        let other = AttestationMessage::TransferEth {
            to: dev_address(0),
            amount: U256::from(6u64),
            nonce: U256::from(1u64),
            bridge: dev_address(4),
        }
        .digest();
        let mut set = sign_set(&[0], &d);
        let forged = sign_digest(&dev_signer(1), &other).unwrap();
        set.push(dev_address(1), forged);

        let tally = policy_2_of_3().tally(&d, &set);
        assert_eq!(tally.count(), 1);
        assert!(matches!(
            tally.faults[0],
            (1, SignatureFault::SignerMismatch { claimed, .. }) if claimed == dev_address(1)
        ));
    }

    #[test]
    fn test_malformed_signature() {
        let d = digest();
        let mut set = sign_set(&[0], &d);
        set.push(dev_address(1), Bytes::from(vec![0u8; 10]));
        let tally = policy_2_of_3().tally(&d, &set);
        assert_eq!(tally.faults, vec![(1, SignatureFault::Malformed)]);
    }

    #[test]
    fn test_high_s_rejected() {
        let d = digest();
        let sig = sign_digest(&dev_signer(0), &d).unwrap();

        // Flip to the malleable twin: s' = n - s, v toggled
        let n = U256::from_be_bytes(alloy::primitives::hex!(
            "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141"
        ));
        let s = U256::from_be_slice(&sig[32..64]);
        let mut twin = sig.to_vec();
        twin[32..64].copy_from_slice(&(n - s).to_be_bytes::<32>());
        twin[64] = if sig[64] == 27 { 28 } else { 27 };

        assert_eq!(recover_signer(&d, &twin), Err(SignatureFault::HighS));
    }

    #[test]
    fn test_from_signatures_recovers_signers() {
        let d = digest();
        let raw = sign_set(&[1, 2], &d).signatures();
        let set = SignatureSet::from_signatures(&d, &raw);
        let signers: Vec<Address> = set.iter().map(|a| a.signer).collect();
        assert_eq!(signers, vec![dev_address(1), dev_address(2)]);
        assert!(policy_2_of_3().verify(&d, &set));
    }
}
