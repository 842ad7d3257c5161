//! Commitment Builder (spec.md §4.1): canonical byte-strings representing
//! on-chain claims, and the signature aggregation over them.

use serde::Serialize;

use crate::crypto::{domain_hash, recover_signer, verify_signer, Address, CryptoError, Hash, Signature};

/// Domain tag mixed into every commitment hash, so a commitment from this
/// protocol can never collide with a digest meant for something else on
/// the same chain (spec.md §4.1 "MUST document the exact byte layout").
pub const SET_STATE_DOMAIN_TAG: &[u8] = b"INSTALL_PROTOCOL_SET_STATE_V1";
pub const CONDITIONAL_TX_DOMAIN_TAG: &[u8] = b"INSTALL_PROTOCOL_CONDITIONAL_TX_V1";

/// The exact field set hashed for a `SetStateCommitment`, in declaration
/// order, length-prefixed by `serde_json`'s own encoding of each field
/// (spec.md §4.1: "deterministic function of (multisigAddress,
/// appIdentityHash, stateHash, versionNumber, timeout, chainId)").
#[derive(Serialize)]
struct SetStateDigestInput {
    multisig_address: Address,
    app_identity_hash: Hash,
    state_hash: Hash,
    version_number: u64,
    timeout: u64,
    chain_id: u64,
}

/// A signed claim that `(appIdentityHash, stateHash, versionNumber,
/// timeout)` is the latest state (spec.md §3 `SetStateCommitment`).
#[derive(Clone, Debug)]
pub struct SetStateCommitment {
    pub multisig_address: Address,
    pub app_identity_hash: Hash,
    pub state_hash: Hash,
    pub version_number: u64,
    pub timeout: u64,
    pub chain_id: u64,
    /// Signatures in canonical channel-owner order (spec.md §3 invariant 5).
    /// `None` until that owner has signed.
    pub signatures: [Option<Signature>; 2],
}

impl SetStateCommitment {
    pub fn new(
        multisig_address: Address,
        app_identity_hash: Hash,
        state_hash: Hash,
        version_number: u64,
        timeout: u64,
        chain_id: u64,
    ) -> Self {
        Self {
            multisig_address,
            app_identity_hash,
            state_hash,
            version_number,
            timeout,
            chain_id,
            signatures: [None, None],
        }
    }

    /// The digest both parties independently compute and sign.
    pub fn hash_to_sign(&self) -> Hash {
        let input = SetStateDigestInput {
            multisig_address: self.multisig_address,
            app_identity_hash: self.app_identity_hash,
            state_hash: self.state_hash,
            version_number: self.version_number,
            timeout: self.timeout,
            chain_id: self.chain_id,
        };
        let bytes =
            crate::canonical::canonical_json_bytes(&input).expect("digest input always serializes");
        domain_hash(SET_STATE_DOMAIN_TAG, &bytes)
    }

    /// Stores `sig` at `owner_index` (0 or 1 in canonical channel-owner
    /// order), after verifying it recovers to `expected_signer`.
    pub fn add_signature(
        &mut self,
        owner_index: usize,
        sig: Signature,
        expected_signer: Address,
    ) -> Result<(), CryptoError> {
        let hash = self.hash_to_sign();
        verify_signer(&hash, &sig, expected_signer)?;
        self.signatures[owner_index] = Some(sig);
        Ok(())
    }

    /// Stores a pair of signatures, reordering into canonical channel-owner
    /// order if they were supplied the other way around (spec.md §4.1
    /// "Inputs outside that order are reordered before storage").
    pub fn add_signatures(
        &mut self,
        owners: [Address; 2],
        sig_a: Signature,
        sig_b: Signature,
    ) -> Result<(), CryptoError> {
        let hash = self.hash_to_sign();
        let signer_a = recover_signer(&hash, &sig_a)?;
        let signer_b = recover_signer(&hash, &sig_b)?;

        let (for_owner0, for_owner1) = if signer_a == owners[0] && signer_b == owners[1] {
            (sig_a, sig_b)
        } else if signer_a == owners[1] && signer_b == owners[0] {
            (sig_b, sig_a)
        } else {
            return Err(CryptoError::SignerMismatch {
                recovered: signer_a,
                expected: owners[0],
            });
        };
        self.signatures[0] = Some(for_owner0);
        self.signatures[1] = Some(for_owner1);
        Ok(())
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signatures[0].is_some() && self.signatures[1].is_some()
    }
}

/// Structurally parallel to `SetStateCommitment` for signing purposes
/// (spec.md §3 `ConditionalTransactionCommitment`). The install protocol
/// only requires the `SetStateCommitment` over the post-install free
/// balance (spec.md §4.1); this type exists for completeness of the data
/// model and for use by the uninstall/dispute path, which is out of scope.
#[derive(Clone, Debug)]
pub struct ConditionalTransactionCommitment {
    pub multisig_address: Address,
    pub app_identity_hash: Hash,
    pub interpreter_address: Address,
    pub chain_id: u64,
    pub signatures: [Option<Signature>; 2],
}

impl ConditionalTransactionCommitment {
    pub fn hash_to_sign(&self) -> Hash {
        #[derive(Serialize)]
        struct Input {
            multisig_address: Address,
            app_identity_hash: Hash,
            interpreter_address: Address,
            chain_id: u64,
        }
        let bytes = crate::canonical::canonical_json_bytes(&Input {
            multisig_address: self.multisig_address,
            app_identity_hash: self.app_identity_hash,
            interpreter_address: self.interpreter_address,
            chain_id: self.chain_id,
        })
        .expect("digest input always serializes");
        domain_hash(CONDITIONAL_TX_DOMAIN_TAG, &bytes)
    }
}
