//! The error taxonomy of spec.md §7, plus the supplemental variants
//! documented in SPEC_FULL.md §2. This is what `Orchestrator::run` returns;
//! it never leaks a host's internal error type.

use thiserror::Error;

use crate::crypto::{Address, Hash};

#[derive(Debug, Error)]
pub enum InstallError {
    /// `preProtocolStateChannel` was absent. Fatal for this run.
    #[error("no pre-protocol state channel was supplied")]
    NoStateChannel,

    /// The depositing owner did not have enough free balance in `asset`.
    /// Checked locally before any signature is requested (spec.md §4.3).
    #[error("insufficient funds: party {party} needs {need} of asset {asset}, has {have}")]
    InsufficientFunds {
        party: Address,
        asset: Address,
        have: u128,
        need: u128,
    },

    /// `OP_VALIDATE` returned a rejection reason.
    #[error("host rejected install: {0}")]
    HostRejected(String),

    /// A counterparty-supplied signature did not recover to the expected
    /// signer.
    #[error("invalid counterparty signature: {0}")]
    InvalidCounterpartySignature(#[source] crate::crypto::CryptoError),

    /// `proposal.identityHash` was not found in `proposedAppInstances`.
    #[error("app {0} was not proposed in this channel")]
    AppNotProposed(Hash),

    /// `proposal.identityHash` is already installed; replaying an install
    /// must not double-debit the free balance (spec.md §8).
    #[error("app {0} is already installed")]
    AlreadyInstalled(Hash),

    /// Host-enforced deadline at `IO_SEND_AND_WAIT` elapsed.
    #[error("protocol timed out waiting for counterparty")]
    ProtocolTimeout,

    /// The host reported a failure persisting the new app instance.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    /// A non-persistence host I/O operation (send, send-and-wait) failed
    /// for a reason other than a timeout.
    #[error("host I/O failed: {0}")]
    HostIo(String),

    /// The channel references a `schemaVersion` this crate does not
    /// understand. Additive defensive check (SPEC_FULL.md §5); not named
    /// in spec.md's taxonomy but required for a complete implementation.
    #[error("channel schema version {found} is not supported (expected {expected})")]
    SchemaVersionMismatch { expected: u32, found: u32 },

    /// Typed replacement for the swallowed "no installed AppInstances"
    /// error string flagged as an Open Question in spec.md §9.
    #[error("channel has no installed app instances")]
    NoInstalledApps,
}

impl InstallError {
    /// True for errors that must never leave an observable mutation behind
    /// (spec.md §7 propagation policy, §8 "no PERSIST/IO_SEND" property).
    pub fn is_pre_signature(&self) -> bool {
        matches!(
            self,
            InstallError::NoStateChannel
                | InstallError::InsufficientFunds { .. }
                | InstallError::HostRejected(_)
                | InstallError::AppNotProposed(_)
                | InstallError::AlreadyInstalled(_)
                | InstallError::SchemaVersionMismatch { .. }
                | InstallError::NoInstalledApps
        )
    }
}
