use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::app_instance::{AppInstance, OutcomeType};
use super::transfer_map::TokenIndexedCoinTransferMap;
use crate::crypto::Address;
use crate::error::InstallError;

/// The concrete shape of `AppInstance.latestState` for the distinguished
/// free-balance app instance (spec.md §3 `FreeBalance`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeBalanceState {
    balances: IndexMap<Address, IndexMap<Address, u128>>,
}

impl FreeBalanceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, asset: Address, owner: Address) -> u128 {
        self.balances
            .get(&asset)
            .and_then(|per_owner| per_owner.get(&owner))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_balance(&mut self, asset: Address, owner: Address, amount: u128) {
        self.balances.entry(asset).or_default().insert(owner, amount);
    }

    /// Applies `decrement` to this state, subtracting each entry from the
    /// corresponding owner's balance. Returns `InsufficientFunds` rather
    /// than panicking on underflow — callers are expected to have already
    /// run the sufficiency check (spec.md §4.3), but this makes the
    /// function safe to call on its own.
    pub fn apply_decrement(
        &self,
        decrement: &TokenIndexedCoinTransferMap,
    ) -> Result<Self, InstallError> {
        let mut next = self.clone();
        for asset in decrement.assets() {
            for (owner, amount) in decrement.owners_for(asset) {
                let have = next.balance_of(asset, owner);
                if have < amount {
                    return Err(InstallError::InsufficientFunds {
                        party: owner,
                        asset,
                        have,
                        need: amount,
                    });
                }
                next.set_balance(asset, owner, have - amount);
            }
        }
        Ok(next)
    }

    pub fn total(&self, asset: Address) -> u128 {
        self.balances
            .get(&asset)
            .map(|per_owner| per_owner.values().sum())
            .unwrap_or(0)
    }
}

/// Wraps the distinguished free-balance `AppInstance`, exposing typed
/// accessors over its JSON-encoded `latestState`. Never uninstalled during
/// a channel's life (spec.md §3).
#[derive(Clone, Debug, PartialEq)]
pub struct FreeBalance {
    pub instance: AppInstance,
}

impl FreeBalance {
    pub fn state(&self) -> FreeBalanceState {
        serde_json::from_value(self.instance.latest_state.clone())
            .expect("free balance latest_state is always a FreeBalanceState")
    }

    pub fn version_number(&self) -> u64 {
        self.instance.latest_version_number
    }

    pub fn balance_of(&self, asset: Address, owner: Address) -> u128 {
        self.state().balance_of(asset, owner)
    }

    /// Returns a new `FreeBalance` with `decrement` applied and the version
    /// number incremented by exactly 1 (spec.md §3 invariant 1).
    pub fn with_decrement(
        &self,
        decrement: &TokenIndexedCoinTransferMap,
    ) -> Result<Self, InstallError> {
        let next_state = self.state().apply_decrement(decrement)?;
        let mut instance = self.instance.clone();
        instance.latest_state =
            serde_json::to_value(&next_state).expect("FreeBalanceState always serializes");
        instance.latest_version_number += 1;
        Ok(FreeBalance { instance })
    }

    pub fn outcome_type(&self) -> OutcomeType {
        self.instance.outcome_type
    }
}
