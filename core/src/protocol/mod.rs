//! The Install Protocol itself: wire messages, parameters, and the
//! suspendable engine that drives a single run to completion.

pub mod engine;
pub mod message;
pub mod params;

pub use engine::{EngineInput, InitiatorEngine, InstallOutcome, Opcode, ResponderEngine, Step};
pub use message::{PersistAppType, ProcessId, ProtocolMessageData, ProtocolTag, Role};
pub use params::InstallParams;
