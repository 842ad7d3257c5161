//! Middleware / Opcode Bus (spec.md §2, §6): the contract between the
//! Protocol Engine and the host. Grounded on `tck::fixtures::backend`'s
//! `FixtureBackend` trait — an `#[async_trait]` host abstraction the engine
//! (or test driver) calls into and awaits, never the other way around.

use async_trait::async_trait;
use thiserror::Error;

use crate::channel::{AppInstance, Channel};
use crate::commitment::SetStateCommitment;
use crate::crypto::{Hash, Signature};
use crate::protocol::message::{PersistAppType, ProtocolMessageData, Role};
use crate::protocol::params::InstallParams;

/// Context passed to `OP_VALIDATE` (spec.md §6).
#[derive(Clone, Debug)]
pub struct ValidateContext {
    pub params: InstallParams,
    pub pre_channel: Channel,
    pub new_app_instance: AppInstance,
    pub role: Role,
}

/// What gets persisted by `PERSIST_APP_INSTANCE` for a successful install
/// (spec.md §6). The install engine only ever builds a `CreateInstance`
/// request.
#[derive(Clone, Debug)]
pub struct PersistRequest {
    pub kind: PersistAppType,
    pub channel: Channel,
    pub app_instance: AppInstance,
    pub commitment: SetStateCommitment,
}

/// Error surface for a single middleware call. Intentionally loose
/// (`anyhow`-backed) for the general host-I/O failure case, with a
/// dedicated `Timeout` variant so the orchestrator can distinguish "the
/// host enforced its `IO_SEND_AND_WAIT` deadline" (spec.md §5, not fatal to
/// the channel) from every other failure (spec.md §7 `PersistenceFailed`/
/// `HostIo`, which are).
#[derive(Debug, Error)]
pub enum MiddlewareError {
    #[error("host-enforced timeout waiting for counterparty")]
    Timeout,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The host-side contract. One method per opcode in spec.md §6's table.
/// The engine (via the orchestrator) never touches the store or transport
/// directly — every side effect crosses this trait.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// `OP_VALIDATE`. `Ok(None)` accepts; `Ok(Some(reason))` rejects with a
    /// human-readable reason (wrapped into `InstallError::HostRejected` by
    /// the orchestrator). `Err` is reserved for the host failing to answer
    /// at all (storage down, RPC error), not for a considered rejection.
    async fn op_validate(&self, ctx: &ValidateContext) -> Result<Option<String>, MiddlewareError>;

    /// `OP_SIGN`. Signs `hash_to_sign` with whichever key the host derives
    /// for the channel's free-balance signer (spec.md §4.4 step 6: "signer
    /// derived from the free-balance key, not the multisig owner key").
    async fn op_sign(&self, hash_to_sign: Hash) -> Result<Signature, MiddlewareError>;

    /// `IO_SEND`, fire-and-forget.
    async fn io_send(&self, message: ProtocolMessageData) -> Result<(), MiddlewareError>;

    /// `IO_SEND_AND_WAIT`: send, then suspend until the counterparty's
    /// reply arrives. A host-enforced deadline expiry must surface as
    /// `MiddlewareError::Timeout`, never a generic error (spec.md §5).
    async fn io_send_and_wait(
        &self,
        message: ProtocolMessageData,
    ) -> Result<ProtocolMessageData, MiddlewareError>;

    /// `PERSIST_APP_INSTANCE`.
    async fn persist_app_instance(&self, request: PersistRequest) -> Result<(), MiddlewareError>;
}
