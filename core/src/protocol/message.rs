//! spec.md §6 `ProtocolMessageData` wire format and the supporting enums.
//! Transport encoding is JSON; binary fields are `0x`-prefixed lowercase
//! hex, matching `alloy`'s own `Display`/`FromStr` for `Signature`/hashes.

use serde::{Deserialize, Serialize};

use crate::crypto::{Address, Signature};

/// Sentinel for `ProtocolMessageData.seq` meaning "no sequence number has
/// been assigned yet" (spec.md §6).
pub const UNASSIGNED_SEQ_NO: u64 = u64::MAX;

/// spec.md §6 `ProtocolRoles`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    pub fn other(self) -> Role {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }
}

/// Protocol tag carried on the wire (spec.md §6). Only `Install` is
/// implemented by this crate; the others are named so `customData` decode
/// logic can reject cross-protocol confusion, per the Design Notes
/// ("check the protocol tag before projecting fields").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolTag {
    Install,
    Update,
    Uninstall,
    TakeAction,
    Propose,
}

/// Opaque identifier correlating the messages of a single protocol run
/// across both parties (spec.md §6 `processID`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub String);

/// The install protocol's `customData` payload: a signature over the
/// commitment's `hashToSign()`. `extra` preserves any unrecognized fields
/// verbatim so a future protocol extension round-trips through an older
/// build instead of silently dropping data (Design Notes:
/// "Unknown fields MUST round-trip").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstallCustomData {
    pub signature: Signature,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// spec.md §6 `ProtocolMessageData`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolMessageData {
    pub process_id: ProcessId,
    pub protocol: ProtocolTag,
    /// Present on the first message of a run, `None` after (spec.md §6:
    /// "may be omitted after seq 0").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<super::params::InstallParams>,
    pub to: Address,
    pub seq: u64,
    pub custom_data: InstallCustomData,
}

/// spec.md §6 `PersistAppType`. The install engine only ever emits
/// `CreateInstance`; the others are named for completeness of the type
/// (used by the out-of-scope update/uninstall/propose protocols).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistAppType {
    CreateInstance,
    UpdateInstance,
    RemoveInstance,
    Reject,
}
