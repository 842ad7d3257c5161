use indexmap::IndexMap;

use crate::crypto::Address;

/// `TokenIndexedCoinTransferMap` (spec.md §3): `{tokenAddress -> {address -> amount}}`,
/// used to describe atomic deltas applied to the free balance. Insertion
/// order is preserved (via `IndexMap`) purely for deterministic test
/// output; it carries no protocol meaning — lookups are always keyed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenIndexedCoinTransferMap {
    entries: IndexMap<Address, IndexMap<Address, u128>>,
}

impl TokenIndexedCoinTransferMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to `owner`'s entry under `asset`, creating either
    /// level of the map as needed. Used to build up a per-asset decrement
    /// map one deposit at a time (spec.md §4.2 step 3).
    pub fn credit(&mut self, asset: Address, owner: Address, amount: u128) {
        let per_owner = self.entries.entry(asset).or_default();
        *per_owner.entry(owner).or_insert(0) += amount;
    }

    pub fn get(&self, asset: Address, owner: Address) -> u128 {
        self.entries
            .get(&asset)
            .and_then(|per_owner| per_owner.get(&owner))
            .copied()
            .unwrap_or(0)
    }

    pub fn assets(&self) -> impl Iterator<Item = Address> + '_ {
        self.entries.keys().copied()
    }

    pub fn owners_for(&self, asset: Address) -> impl Iterator<Item = (Address, u128)> + '_ {
        self.entries
            .get(&asset)
            .into_iter()
            .flat_map(|per_owner| per_owner.iter().map(|(owner, amount)| (*owner, *amount)))
    }
}
