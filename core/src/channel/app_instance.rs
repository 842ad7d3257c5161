use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash;
use crate::crypto::{Address, Hash};

/// spec.md §3 `AppInstance.outcomeType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeType {
    TwoPartyFixedOutcome,
    SingleAssetTwoPartyCoinTransfer,
    MultiAssetMultiPartyCoinTransfer,
    RefundOutcomeType,
}

/// App definition address plus the state/action/outcome encodings used to
/// interpret `latest_state`/`latest_action`. The encodings themselves are
/// app-specific and out of scope here (spec.md §1 Non-goals); we only carry
/// the address and opaque encoding tags that identify them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInterface {
    pub app_definition_address: Address,
    pub state_encoding: String,
    pub action_encoding: Option<String>,
}

/// spec.md §3 `AppInstance`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInstance {
    pub identity_hash: Hash,
    pub initiator_identifier: Address,
    pub responder_identifier: Address,
    pub app_interface: AppInterface,
    pub default_timeout: u64,
    pub latest_state: serde_json::Value,
    pub latest_version_number: u64,
    pub latest_action: Option<serde_json::Value>,
    pub state_timeout: u64,
    pub outcome_type: OutcomeType,
    pub initiator_deposit: u128,
    pub responder_deposit: u128,
    pub initiator_deposit_asset_id: Address,
    pub responder_deposit_asset_id: Address,
}

/// The immutable fields that determine an app instance's `identityHash`.
/// Kept as a separate type so hashing never accidentally picks up a
/// mutable field (`latest_state`, `latest_version_number`, ...).
#[derive(Serialize)]
struct IdentitySeed<'a> {
    initiator_identifier: Address,
    responder_identifier: Address,
    app_definition_address: Address,
    default_timeout: u64,
    sequence_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    _marker: Option<&'a ()>,
}

const APP_IDENTITY_DOMAIN: &[u8] = b"INSTALL_PROTOCOL_APP_IDENTITY_V1";

/// Deterministic content address for an app instance, per spec.md §3:
/// "derived from initiator/responder identifiers, app definition address,
/// default timeout, and sequence number".
pub fn compute_identity_hash(
    initiator_identifier: Address,
    responder_identifier: Address,
    app_definition_address: Address,
    default_timeout: u64,
    sequence_number: u64,
) -> Hash {
    let seed = IdentitySeed {
        initiator_identifier,
        responder_identifier,
        app_definition_address,
        default_timeout,
        sequence_number,
        _marker: None,
    };
    canonical_hash(APP_IDENTITY_DOMAIN, &seed).expect("IdentitySeed always serializes")
}

impl AppInstance {
    /// Recomputes the identity hash from this instance's immutable fields
    /// and `sequence_number`, and checks it against `self.identity_hash`.
    pub fn verify_identity_hash(&self, sequence_number: u64) -> bool {
        let expected = compute_identity_hash(
            self.initiator_identifier,
            self.responder_identifier,
            self.app_interface.app_definition_address,
            self.default_timeout,
            sequence_number,
        );
        expected == self.identity_hash
    }
}
