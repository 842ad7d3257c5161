//! Address, hash, and ECDSA-recoverable signature primitives.
//!
//! The runtime is account-based and Ethereum-flavored: channel owners and
//! app parties are identified by 20-byte addresses, and every commitment is
//! authorized by a 65-byte recoverable ECDSA signature (`r || s || v`) over
//! a 32-byte digest, recovered the same way `alloy` recovers transaction
//! signers.

use alloy::primitives::keccak256;
use thiserror::Error;

pub use alloy::primitives::{Address, B256 as Hash};
pub use alloy::signers::Signature;

/// Distinguishes a channel's canonical multisig-owner identity from an
/// app-specific initiator/responder identity. The two orders are
/// independent (spec.md §4.2, design notes) and must never be conflated;
/// wrapping them in distinct types makes a mix-up a type error instead of
/// a silent bug.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelOwner(pub Address);

/// An app-level party identifier (initiator or responder of a specific
/// app instance), as opposed to a channel's canonical owner order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppParty(pub Address);

impl From<Address> for ChannelOwner {
    fn from(address: Address) -> Self {
        ChannelOwner(address)
    }
}

impl From<Address> for AppParty {
    fn from(address: Address) -> Self {
        AppParty(address)
    }
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("signature recovery failed: {0}")]
    Recovery(String),
    #[error("recovered signer {recovered} does not match expected signer {expected}")]
    SignerMismatch { recovered: Address, expected: Address },
}

/// Recover the signer address from a recoverable ECDSA signature over a
/// prehashed digest, mirroring `alloy::signers::Signature::recover_address_from_prehash`.
pub fn recover_signer(hash: &Hash, signature: &Signature) -> Result<Address, CryptoError> {
    signature
        .recover_address_from_prehash(hash)
        .map_err(|e| CryptoError::Recovery(e.to_string()))
}

/// Recover the signer and assert it matches `expected`. This is the
/// primitive both protocol roles use to validate a counterparty signature
/// (spec.md §4.4 step 9, §4.5 step 6) before trusting it.
pub fn verify_signer(
    hash: &Hash,
    signature: &Signature,
    expected: Address,
) -> Result<(), CryptoError> {
    let recovered = recover_signer(hash, signature)?;
    if recovered != expected {
        return Err(CryptoError::SignerMismatch {
            recovered,
            expected,
        });
    }
    Ok(())
}

/// Domain-separated keccak256 hash of an arbitrary byte string. Used by the
/// commitment builder to hash its canonical, length-prefixed encoding.
pub fn domain_hash(domain_tag: &[u8], bytes: &[u8]) -> Hash {
    let mut buf = Vec::with_capacity(domain_tag.len() + bytes.len());
    buf.extend_from_slice(domain_tag);
    buf.extend_from_slice(bytes);
    keccak256(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::{local::PrivateKeySigner, Signer};

    #[tokio::test]
    async fn recovers_known_signer() -> Result<(), Box<dyn std::error::Error>> {
        let signer = PrivateKeySigner::random();
        let address = signer.address();
        let hash = domain_hash(b"TEST", b"hello");
        let signature = signer.sign_hash(&hash).await?;
        let recovered = recover_signer(&hash, &signature)?;
        assert_eq!(recovered, address);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_wrong_signer() -> Result<(), Box<dyn std::error::Error>> {
        let signer = PrivateKeySigner::random();
        let other = PrivateKeySigner::random();
        let hash = domain_hash(b"TEST", b"hello");
        let signature = signer.sign_hash(&hash).await?;
        let err = verify_signer(&hash, &signature, other.address()).unwrap_err();
        assert!(matches!(err, CryptoError::SignerMismatch { .. }));
        Ok(())
    }
}
