use serde::{Deserialize, Serialize};

use crate::channel::AppInstance;
use crate::crypto::{Address, Hash};
use crate::error::InstallError;

/// spec.md §3 `ProtocolParams.Install`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallParams {
    pub initiator_identifier: Address,
    pub responder_identifier: Address,
    pub multisig_address: Address,
    pub proposal: AppInstance,
    pub app_identity_hash: Hash,
}

impl InstallParams {
    /// Constructs and checks `appIdentityHash == proposal.identityHash`
    /// (spec.md §3).
    pub fn new(
        initiator_identifier: Address,
        responder_identifier: Address,
        multisig_address: Address,
        proposal: AppInstance,
    ) -> Result<Self, InstallError> {
        let app_identity_hash = proposal.identity_hash;
        let params = Self {
            initiator_identifier,
            responder_identifier,
            multisig_address,
            proposal,
            app_identity_hash,
        };
        params.check_consistent()?;
        Ok(params)
    }

    pub fn check_consistent(&self) -> Result<(), InstallError> {
        if self.app_identity_hash != self.proposal.identity_hash {
            return Err(InstallError::AppNotProposed(self.app_identity_hash));
        }
        Ok(())
    }
}
