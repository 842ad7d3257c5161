//! Protocol Engine (spec.md §4.4, §4.5, §4.6, Design Notes option (a)):
//! an explicit, suspendable state machine rather than a callback-driven
//! generator. `InitiatorEngine` and `ResponderEngine` each expose a single
//! `advance` method; the orchestrator drives it by answering whatever
//! `Opcode` it last suspended on.
//!
//! Grounded on the asymmetry between
//! `daemon::a2a::arbitration::coordinator::CoordinatorService` (builds and
//! signs an outgoing request, the initiator shape) and
//! `daemon::a2a::arbitration::juror::JurorService` (verifies an inbound
//! signed message before producing its own signed response, the responder
//! shape) — two distinct services rather than one role-parameterized type.

use log::trace;

use crate::channel::{AppInstance, Channel};
use crate::commitment::SetStateCommitment;
use crate::crypto::{verify_signer, Address, Hash, Signature};
use crate::error::InstallError;
use crate::middleware::{PersistRequest, ValidateContext};
use crate::protocol::message::{
    InstallCustomData, PersistAppType, ProcessId, ProtocolMessageData, ProtocolTag, Role,
    UNASSIGNED_SEQ_NO,
};
use crate::protocol::params::InstallParams;
use crate::transition::{check_sufficiency, compute_install_state_channel_transition};

/// An opcode the engine has suspended on, awaiting the orchestrator's
/// answer via the matching `EngineInput` variant (spec.md §6).
#[derive(Clone, Debug)]
pub enum Opcode {
    Validate(ValidateContext),
    Sign(Hash),
    Send(ProtocolMessageData),
    SendAndWait(ProtocolMessageData),
    Persist(PersistRequest),
}

/// Result of one `advance` call: either another suspension, or the engine
/// has run to completion.
#[derive(Clone, Debug)]
pub enum Step {
    Suspend(Opcode),
    Done(InstallOutcome),
}

/// The result of a completed install run (spec.md §4.4/§4.5 final step):
/// the post-install channel, the newly installed app instance, and the
/// fully countersigned commitment over the new free balance.
#[derive(Clone, Debug)]
pub struct InstallOutcome {
    pub channel: Channel,
    pub app_instance: AppInstance,
    pub commitment: SetStateCommitment,
}

/// The answer to whatever `Opcode` the engine last returned via
/// `Step::Suspend`. `Start` is only valid as the very first call.
#[derive(Clone, Debug)]
pub enum EngineInput {
    Start,
    Validated(Option<String>),
    Signed(Signature),
    Replied(ProtocolMessageData),
    Sent,
    Persisted,
}

fn build_outbound(
    process_id: &ProcessId,
    params: Option<InstallParams>,
    to: Address,
    seq: u64,
    signature: Signature,
) -> ProtocolMessageData {
    ProtocolMessageData {
        process_id: process_id.clone(),
        protocol: ProtocolTag::Install,
        params,
        to,
        seq,
        custom_data: InstallCustomData {
            signature,
            extra: serde_json::Map::new(),
        },
    }
}

fn extract_signature(message: &ProtocolMessageData) -> Signature {
    message.custom_data.signature
}

#[derive(Clone, Debug)]
enum InitiatorState {
    Init,
    AwaitingValidate {
        post_channel: Channel,
        new_app_instance: AppInstance,
        commitment: SetStateCommitment,
    },
    AwaitingSign {
        post_channel: Channel,
        new_app_instance: AppInstance,
        commitment: SetStateCommitment,
    },
    AwaitingReply {
        post_channel: Channel,
        new_app_instance: AppInstance,
        commitment: SetStateCommitment,
        my_signature: Signature,
    },
    AwaitingPersist {
        post_channel: Channel,
        new_app_instance: AppInstance,
        commitment: SetStateCommitment,
    },
    Done,
    Failed,
}

/// Drives the install protocol from the proposing party's side (spec.md
/// §4.4). Owns `params`/`pre_channel` for the lifetime of one run; never
/// reused across runs.
#[derive(Clone, Debug)]
pub struct InitiatorEngine {
    process_id: ProcessId,
    params: InstallParams,
    pre_channel: Channel,
    chain_id: u64,
    state: InitiatorState,
}

impl InitiatorEngine {
    pub fn new(process_id: ProcessId, params: InstallParams, pre_channel: Channel, chain_id: u64) -> Self {
        Self {
            process_id,
            params,
            pre_channel,
            chain_id,
            state: InitiatorState::Init,
        }
    }

    pub fn advance(&mut self, input: EngineInput) -> Result<Step, InstallError> {
        let state = std::mem::replace(&mut self.state, InitiatorState::Failed);
        match (state, input) {
            (InitiatorState::Init, EngineInput::Start) => {
                let proposal = &self.params.proposal;
                check_sufficiency(&self.pre_channel, proposal)?;
                let (post_channel, new_app_instance) =
                    compute_install_state_channel_transition(&self.pre_channel, proposal)?;

                let fb = &post_channel.free_balance;
                let state_hash = crate::canonical::canonical_hash(
                    crate::commitment::SET_STATE_DOMAIN_TAG,
                    &fb.state(),
                )
                .map_err(|e| InstallError::HostIo(e.to_string()))?;
                let commitment = SetStateCommitment::new(
                    post_channel.multisig_address,
                    fb.instance.identity_hash,
                    state_hash,
                    fb.version_number(),
                    fb.instance.state_timeout,
                    self.chain_id,
                );

                let ctx = ValidateContext {
                    params: self.params.clone(),
                    pre_channel: self.pre_channel.clone(),
                    new_app_instance: new_app_instance.clone(),
                    role: Role::Initiator,
                };
                self.state = InitiatorState::AwaitingValidate {
                    post_channel,
                    new_app_instance,
                    commitment,
                };
                Ok(Step::Suspend(Opcode::Validate(ctx)))
            }
            (
                InitiatorState::AwaitingValidate {
                    post_channel,
                    new_app_instance,
                    commitment,
                },
                EngineInput::Validated(None),
            ) => {
                let hash = commitment.hash_to_sign();
                self.state = InitiatorState::AwaitingSign {
                    post_channel,
                    new_app_instance,
                    commitment,
                };
                Ok(Step::Suspend(Opcode::Sign(hash)))
            }
            (InitiatorState::AwaitingValidate { .. }, EngineInput::Validated(Some(reason))) => {
                self.state = InitiatorState::Failed;
                Err(InstallError::HostRejected(reason))
            }
            (
                InitiatorState::AwaitingSign {
                    post_channel,
                    new_app_instance,
                    commitment,
                },
                EngineInput::Signed(my_signature),
            ) => {
                // spec.md §4.4 step 7 gives the literal wire example for this
                // message as `seq=1`; §6's general prose ("may be omitted
                // after seq 0") describes later messages in the exchange, not
                // this first one. The numbered step wins.
                let outbound = build_outbound(
                    &self.process_id,
                    Some(self.params.clone()),
                    self.params.responder_identifier,
                    1,
                    my_signature,
                );
                trace!("initiator sending seq 1 for process {:?}", self.process_id);
                self.state = InitiatorState::AwaitingReply {
                    post_channel,
                    new_app_instance,
                    commitment,
                    my_signature,
                };
                Ok(Step::Suspend(Opcode::SendAndWait(outbound)))
            }
            (
                InitiatorState::AwaitingReply {
                    post_channel,
                    new_app_instance,
                    mut commitment,
                    my_signature,
                },
                EngineInput::Replied(reply),
            ) => {
                let their_signature = extract_signature(&reply);
                verify_signer(
                    &commitment.hash_to_sign(),
                    &their_signature,
                    self.params.responder_identifier,
                )
                .map_err(InstallError::InvalidCounterpartySignature)?;

                let owners = [
                    post_channel.multisig_owners[0].0,
                    post_channel.multisig_owners[1].0,
                ];
                commitment
                    .add_signatures(owners, my_signature, their_signature)
                    .map_err(InstallError::InvalidCounterpartySignature)?;

                let persist = PersistRequest {
                    kind: PersistAppType::CreateInstance,
                    channel: post_channel.clone(),
                    app_instance: new_app_instance.clone(),
                    commitment: commitment.clone(),
                };
                self.state = InitiatorState::AwaitingPersist {
                    post_channel,
                    new_app_instance,
                    commitment,
                };
                Ok(Step::Suspend(Opcode::Persist(persist)))
            }
            (
                InitiatorState::AwaitingPersist {
                    post_channel,
                    new_app_instance,
                    commitment,
                },
                EngineInput::Persisted,
            ) => {
                self.state = InitiatorState::Done;
                Ok(Step::Done(InstallOutcome {
                    channel: post_channel,
                    app_instance: new_app_instance,
                    commitment,
                }))
            }
            (state, input) => {
                self.state = state;
                Err(InstallError::HostIo(format!(
                    "initiator engine received unexpected input {input:?} in current state"
                )))
            }
        }
    }
}

#[derive(Clone, Debug)]
enum ResponderState {
    Init,
    AwaitingValidate {
        post_channel: Channel,
        new_app_instance: AppInstance,
        commitment: SetStateCommitment,
    },
    AwaitingSign {
        post_channel: Channel,
        new_app_instance: AppInstance,
        commitment: SetStateCommitment,
    },
    AwaitingPersist {
        post_channel: Channel,
        new_app_instance: AppInstance,
        commitment: SetStateCommitment,
        my_signature: Signature,
    },
    AwaitingSend {
        outcome: InstallOutcome,
    },
    Done,
    Failed,
}

/// Drives the install protocol from the accepting party's side (spec.md
/// §4.5): verify the initiator's signature before producing its own,
/// persist before replying. The inbound seq-0 message (and therefore the
/// initiator's signature) is supplied at construction, since it is what
/// triggers this engine's run in the first place.
#[derive(Clone, Debug)]
pub struct ResponderEngine {
    process_id: ProcessId,
    params: InstallParams,
    pre_channel: Channel,
    chain_id: u64,
    initiator_signature: Signature,
    state: ResponderState,
}

impl ResponderEngine {
    pub fn new(
        process_id: ProcessId,
        params: InstallParams,
        pre_channel: Channel,
        chain_id: u64,
        inbound: &ProtocolMessageData,
    ) -> Self {
        Self {
            process_id,
            params,
            pre_channel,
            chain_id,
            initiator_signature: extract_signature(inbound),
            state: ResponderState::Init,
        }
    }

    pub fn advance(&mut self, input: EngineInput) -> Result<Step, InstallError> {
        let state = std::mem::replace(&mut self.state, ResponderState::Failed);
        match (state, input) {
            (ResponderState::Init, EngineInput::Start) => {
                let proposal = &self.params.proposal;
                check_sufficiency(&self.pre_channel, proposal)?;
                let (post_channel, new_app_instance) =
                    compute_install_state_channel_transition(&self.pre_channel, proposal)?;

                let fb = &post_channel.free_balance;
                let state_hash = crate::canonical::canonical_hash(
                    crate::commitment::SET_STATE_DOMAIN_TAG,
                    &fb.state(),
                )
                .map_err(|e| InstallError::HostIo(e.to_string()))?;
                let commitment = SetStateCommitment::new(
                    post_channel.multisig_address,
                    fb.instance.identity_hash,
                    state_hash,
                    fb.version_number(),
                    fb.instance.state_timeout,
                    self.chain_id,
                );

                let ctx = ValidateContext {
                    params: self.params.clone(),
                    pre_channel: self.pre_channel.clone(),
                    new_app_instance: new_app_instance.clone(),
                    role: Role::Responder,
                };
                self.state = ResponderState::AwaitingValidate {
                    post_channel,
                    new_app_instance,
                    commitment,
                };
                Ok(Step::Suspend(Opcode::Validate(ctx)))
            }
            (
                ResponderState::AwaitingValidate {
                    post_channel,
                    new_app_instance,
                    commitment,
                },
                EngineInput::Validated(None),
            ) => {
                // spec.md §4.5 step 6: verify the initiator's signature
                // before this party ever signs anything itself.
                verify_signer(
                    &commitment.hash_to_sign(),
                    &self.initiator_signature,
                    self.params.initiator_identifier,
                )
                .map_err(InstallError::InvalidCounterpartySignature)?;

                let hash = commitment.hash_to_sign();
                self.state = ResponderState::AwaitingSign {
                    post_channel,
                    new_app_instance,
                    commitment,
                };
                Ok(Step::Suspend(Opcode::Sign(hash)))
            }
            (ResponderState::AwaitingValidate { .. }, EngineInput::Validated(Some(reason))) => {
                self.state = ResponderState::Failed;
                Err(InstallError::HostRejected(reason))
            }
            (
                ResponderState::AwaitingSign {
                    post_channel,
                    new_app_instance,
                    mut commitment,
                },
                EngineInput::Signed(my_signature),
            ) => {
                let owners = [
                    post_channel.multisig_owners[0].0,
                    post_channel.multisig_owners[1].0,
                ];
                commitment
                    .add_signatures(owners, self.initiator_signature, my_signature)
                    .map_err(InstallError::InvalidCounterpartySignature)?;

                let persist = PersistRequest {
                    kind: PersistAppType::CreateInstance,
                    channel: post_channel.clone(),
                    app_instance: new_app_instance.clone(),
                    commitment: commitment.clone(),
                };
                self.state = ResponderState::AwaitingPersist {
                    post_channel,
                    new_app_instance,
                    commitment,
                    my_signature,
                };
                Ok(Step::Suspend(Opcode::Persist(persist)))
            }
            (
                ResponderState::AwaitingPersist {
                    post_channel,
                    new_app_instance,
                    commitment,
                    my_signature,
                },
                EngineInput::Persisted,
            ) => {
                let outbound = build_outbound(
                    &self.process_id,
                    None,
                    self.params.initiator_identifier,
                    UNASSIGNED_SEQ_NO,
                    my_signature,
                );
                let outcome = InstallOutcome {
                    channel: post_channel,
                    app_instance: new_app_instance,
                    commitment,
                };
                self.state = ResponderState::AwaitingSend { outcome };
                Ok(Step::Suspend(Opcode::Send(outbound)))
            }
            (ResponderState::AwaitingSend { outcome }, EngineInput::Sent) => {
                self.state = ResponderState::Done;
                Ok(Step::Done(outcome))
            }
            (state, input) => {
                self.state = state;
                Err(InstallError::HostIo(format!(
                    "responder engine received unexpected input {input:?} in current state"
                )))
            }
        }
    }
}
