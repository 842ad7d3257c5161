//! Drives an `InitiatorEngine`/`ResponderEngine` to completion against a
//! `Middleware` implementation, translating opcodes into host calls and
//! host results back into `EngineInput`. Grounded on
//! `daemon::a2a::arbitration::coordinator::CoordinatorService::handle_dispute`,
//! which plays the same "validate, sign, send, persist" loop but inline
//! rather than through an explicit state machine — the engine here is what
//! makes that loop resumable instead of a single async function.

use log::{error, info, warn};

use crate::channel::Channel;
use crate::error::InstallError;
use crate::middleware::{Middleware, MiddlewareError};
use crate::protocol::engine::{EngineInput, InitiatorEngine, InstallOutcome, Opcode, ResponderEngine, Step};
use crate::protocol::message::{ProcessId, ProtocolMessageData};
use crate::protocol::params::InstallParams;

/// What an `Opcode` was about, purely to pick the right `InstallError`
/// variant when the host reports a non-timeout failure (spec.md §7:
/// `PersistenceFailed` is distinct from `HostIo`).
enum OpcodeKind {
    Validate,
    Sign,
    Send,
    SendAndWait,
    Persist,
}

fn map_middleware_err(err: MiddlewareError, kind: OpcodeKind) -> InstallError {
    match err {
        MiddlewareError::Timeout => InstallError::ProtocolTimeout,
        MiddlewareError::Other(e) => match kind {
            OpcodeKind::Persist => InstallError::PersistenceFailed(e.to_string()),
            OpcodeKind::Validate => InstallError::HostIo(e.to_string()),
            OpcodeKind::Sign | OpcodeKind::Send | OpcodeKind::SendAndWait => {
                InstallError::HostIo(e.to_string())
            }
        },
    }
}

/// Runs the install protocol end to end for one role, against one
/// `Middleware` implementation. Stateless beyond the middleware reference;
/// a fresh orchestrator (or the same one, reused) drives each run.
pub struct InstallOrchestrator<'m, M: Middleware> {
    middleware: &'m M,
}

impl<'m, M: Middleware> InstallOrchestrator<'m, M> {
    pub fn new(middleware: &'m M) -> Self {
        Self { middleware }
    }

    async fn dispatch(&self, opcode: Opcode) -> Result<EngineInput, InstallError> {
        match opcode {
            Opcode::Validate(ctx) => {
                let reason = self
                    .middleware
                    .op_validate(&ctx)
                    .await
                    .map_err(|e| map_middleware_err(e, OpcodeKind::Validate))?;
                Ok(EngineInput::Validated(reason))
            }
            Opcode::Sign(hash) => {
                let sig = self
                    .middleware
                    .op_sign(hash)
                    .await
                    .map_err(|e| map_middleware_err(e, OpcodeKind::Sign))?;
                Ok(EngineInput::Signed(sig))
            }
            Opcode::Send(message) => {
                self.middleware
                    .io_send(message)
                    .await
                    .map_err(|e| map_middleware_err(e, OpcodeKind::Send))?;
                Ok(EngineInput::Sent)
            }
            Opcode::SendAndWait(message) => {
                // A host-side reply is consumed exactly once here: the
                // `Future` this call drives resolves to a single
                // `ProtocolMessageData`, so there is no later point at
                // which a duplicate reply could re-enter the engine for
                // this run. Guarding against a duplicate wire delivery (the
                // counterparty resending because its own timer fired) is
                // the transport's job, upstream of this trait.
                let reply = self
                    .middleware
                    .io_send_and_wait(message)
                    .await
                    .map_err(|e| map_middleware_err(e, OpcodeKind::SendAndWait))?;
                Ok(EngineInput::Replied(reply))
            }
            Opcode::Persist(request) => {
                self.middleware
                    .persist_app_instance(request)
                    .await
                    .map_err(|e| map_middleware_err(e, OpcodeKind::Persist))?;
                Ok(EngineInput::Persisted)
            }
        }
    }

    /// Runs the install protocol as the proposing party (spec.md §4.4).
    pub async fn run_as_initiator(
        &self,
        process_id: ProcessId,
        params: InstallParams,
        pre_channel: Channel,
        chain_id: u64,
    ) -> Result<InstallOutcome, InstallError> {
        info!("starting install as initiator, process {:?}", process_id);
        let mut engine = InitiatorEngine::new(process_id.clone(), params, pre_channel, chain_id);
        let mut step = engine
            .advance(EngineInput::Start)
            .inspect_err(|e| log_advance_err("initiator", &process_id, e))?;
        loop {
            match step {
                Step::Done(outcome) => {
                    info!("install complete, process {:?}", process_id);
                    return Ok(outcome);
                }
                Step::Suspend(opcode) => {
                    let input = self.dispatch(opcode).await.inspect_err(|e| {
                        warn!("install as initiator failed, process {:?}: {e}", process_id)
                    })?;
                    step = engine
                        .advance(input)
                        .inspect_err(|e| log_advance_err("initiator", &process_id, e))?;
                }
            }
        }
    }

    /// Runs the install protocol as the accepting party (spec.md §4.5).
    /// `inbound` is the seq-0 message that triggered this run.
    pub async fn run_as_responder(
        &self,
        process_id: ProcessId,
        params: InstallParams,
        pre_channel: Channel,
        chain_id: u64,
        inbound: &ProtocolMessageData,
    ) -> Result<InstallOutcome, InstallError> {
        info!("starting install as responder, process {:?}", process_id);
        let mut engine = ResponderEngine::new(process_id.clone(), params, pre_channel, chain_id, inbound);
        let mut step = engine
            .advance(EngineInput::Start)
            .inspect_err(|e| log_advance_err("responder", &process_id, e))?;
        loop {
            match step {
                Step::Done(outcome) => {
                    info!("install complete, process {:?}", process_id);
                    return Ok(outcome);
                }
                Step::Suspend(opcode) => {
                    let input = self.dispatch(opcode).await.inspect_err(|e| {
                        warn!("install as responder failed, process {:?}: {e}", process_id)
                    })?;
                    step = engine
                        .advance(input)
                        .inspect_err(|e| log_advance_err("responder", &process_id, e))?;
                }
            }
        }
    }
}

/// Logs an `InstallError` raised by `Engine::advance` at a level that
/// reflects whether it happened before any signature was produced
/// (`warn!` — no observable mutation yet, safe to retry) or after
/// (`error!` — something has already happened).
fn log_advance_err(role: &str, process_id: &ProcessId, e: &InstallError) {
    if e.is_pre_signature() {
        warn!("install as {role} rejected before signing, process {:?}: {e}", process_id);
    } else {
        error!("install as {role} failed after signing, process {:?}: {e}", process_id);
    }
}
