//! Core types and protocol engine for the two-party Install Protocol of a
//! generalized state-channel runtime: turning a proposed `AppInstance` into
//! an installed one by debiting the channel's free balance and collecting
//! both owners' signatures over the resulting state, entirely off-chain.
//!
//! `channel` holds the data model (`Channel`, `FreeBalance`, `AppInstance`);
//! `transition` is the pure state-channel algebra; `commitment` builds and
//! signs the on-chain-shaped claims; `protocol` is the wire format and the
//! suspendable engine that drives one install to completion; `middleware`
//! is the host contract the engine suspends against; `orchestrator` drives
//! the engine/middleware loop end to end.

pub mod canonical;
pub mod channel;
pub mod commitment;
pub mod config;
pub mod crypto;
pub mod error;
pub mod middleware;
pub mod orchestrator;
pub mod protocol;
pub mod transition;

pub use channel::Channel;
pub use error::InstallError;
pub use middleware::Middleware;
pub use orchestrator::InstallOrchestrator;
pub use protocol::{InstallOutcome, InstallParams};
