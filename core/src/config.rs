//! Fixed protocol constants (SPEC_FULL.md §3). Unlike `daemon::config`,
//! this runtime has no file-backed configuration of its own — the chain ID,
//! timeouts, and multisig membership it needs all arrive per-call from the
//! host (spec.md §3 `InstallParams`, `SetStateCommitment`) or the embedding
//! application's own config layer. What's fixed at compile time lives here.

/// Byte length of a recoverable ECDSA signature (`r || s || v`).
pub const SIGNATURE_LEN: usize = 65;

/// Byte length of a commitment digest.
pub const HASH_LEN: usize = 32;

/// A channel's multisig always has exactly two owners (spec.md §3, §9:
/// "exactly two, this protocol does not support n-of-m beyond 2").
pub const MULTISIG_OWNERS: usize = 2;

/// Domain tag mixed into a chain-scoped hash when no protocol-specific tag
/// applies. Protocol-specific tags (`SET_STATE_DOMAIN_TAG`,
/// `CONDITIONAL_TX_DOMAIN_TAG`) live in `commitment` instead; this one
/// exists for hashes that aren't over either commitment shape.
pub const CHAIN_ID_DOMAIN_TAG: &[u8] = b"INSTALL_PROTOCOL_CHAIN_ID_V1";
