//! State Channel Algebra (spec.md §4.2, §4.3):
//! `computeInstallStateChannelTransition` and the sufficiency check.

use log::debug;

use crate::channel::{AppInstance, Channel, TokenIndexedCoinTransferMap};
use crate::error::InstallError;

/// spec.md §4.3: checked once per deposit side, since the two deposits may
/// be denominated in different assets. Returns the first insufficiency
/// found; both sides are still checked (neither short-circuits the other's
/// bookkeeping — the caller sees whichever side actually fails).
pub fn check_sufficiency(pre_channel: &Channel, proposal: &AppInstance) -> Result<(), InstallError> {
    let fb = &pre_channel.free_balance;

    let initiator_signer = proposal.initiator_identifier;
    let have = fb.balance_of(proposal.initiator_deposit_asset_id, initiator_signer);
    if have < proposal.initiator_deposit {
        return Err(InstallError::InsufficientFunds {
            party: initiator_signer,
            asset: proposal.initiator_deposit_asset_id,
            have,
            need: proposal.initiator_deposit,
        });
    }

    let responder_signer = proposal.responder_identifier;
    // Same-asset, same-owner deposits (both sides deposit from the same
    // free-balance entry) are checked against the *remaining* balance
    // after the initiator's deduction, since a single entry cannot be
    // debited twice independently.
    let already_reserved = if proposal.initiator_deposit_asset_id
        == proposal.responder_deposit_asset_id
        && initiator_signer == responder_signer
    {
        proposal.initiator_deposit
    } else {
        0
    };
    let have = fb
        .balance_of(proposal.responder_deposit_asset_id, responder_signer)
        .saturating_sub(already_reserved);
    if have < proposal.responder_deposit {
        return Err(InstallError::InsufficientFunds {
            party: responder_signer,
            asset: proposal.responder_deposit_asset_id,
            have,
            need: proposal.responder_deposit,
        });
    }

    Ok(())
}

/// spec.md §4.2: builds the `TokenIndexedCoinTransferMap` decrement for
/// `proposal` against `pre_channel`'s canonical owner order.
fn build_decrement(pre_channel: &Channel, proposal: &AppInstance) -> TokenIndexedCoinTransferMap {
    let mut decrement = TokenIndexedCoinTransferMap::new();
    let owners = [
        pre_channel.multisig_owners[0].0,
        pre_channel.multisig_owners[1].0,
    ];
    let app_initiator = proposal.initiator_identifier;
    let app_responder = proposal.responder_identifier;

    if proposal.initiator_deposit_asset_id != proposal.responder_deposit_asset_id {
        // Different assets: two independent entries, each crediting the
        // app-order signer under its own asset.
        decrement.credit(
            proposal.initiator_deposit_asset_id,
            app_initiator,
            proposal.initiator_deposit,
        );
        decrement.credit(
            proposal.responder_deposit_asset_id,
            app_responder,
            proposal.responder_deposit,
        );
    } else {
        // Same asset: a single entry keyed by that asset, with both channel
        // owners listed. Tie-break on whether the app's initiator aligns
        // with multisigOwners[0], so a single-key mapping never overwrites
        // one owner's deposit with the other's.
        let asset = proposal.initiator_deposit_asset_id;
        if app_initiator == owners[0] {
            decrement.credit(asset, owners[0], proposal.initiator_deposit);
            decrement.credit(asset, owners[1], proposal.responder_deposit);
        } else {
            decrement.credit(asset, owners[0], proposal.responder_deposit);
            decrement.credit(asset, owners[1], proposal.initiator_deposit);
        }
    }

    decrement
}

/// spec.md §3: re-derives `proposal`'s content address from its immutable
/// fields and the sequence number this channel assigned it when it was
/// proposed (`monotonic_num_proposed_apps`, bumped once per proposal — see
/// `Channel`), and checks it against `proposal.identity_hash`. Catches a
/// proposal whose claimed identity does not match its own content before
/// any balance or signature work is attempted.
fn verify_proposal_identity(pre_channel: &Channel, proposal: &AppInstance) -> Result<(), InstallError> {
    if !proposal.verify_identity_hash(pre_channel.monotonic_num_proposed_apps) {
        return Err(InstallError::AppNotProposed(proposal.identity_hash));
    }
    Ok(())
}

/// spec.md §4.2 `computeInstallStateChannelTransition`: a pure function
/// `(preChannel, proposal) -> postChannel`. Total on valid inputs.
pub fn compute_install_state_channel_transition(
    pre_channel: &Channel,
    proposal: &AppInstance,
) -> Result<(Channel, AppInstance), InstallError> {
    verify_proposal_identity(pre_channel, proposal)?;
    let decrement = build_decrement(pre_channel, proposal);
    debug!(
        "computing install transition for app {:?} against channel {:?} ({} apps installed so far)",
        proposal.identity_hash, pre_channel.multisig_address, pre_channel.num_installed_apps()
    );
    pre_channel.install_app(proposal, &decrement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{AppInterface, FreeBalance, FreeBalanceState, OutcomeType, SUPPORTED_SCHEMA_VERSION};
    use crate::crypto::{Address, ChannelOwner, Hash};
    use indexmap::IndexMap;

    fn addr(b: u8) -> Address {
        Address::from([b; 20])
    }

    fn free_balance(entries: &[(Address, Address, u128)]) -> FreeBalance {
        let mut state = FreeBalanceState::new();
        for (asset, owner, amount) in entries {
            state.set_balance(*asset, *owner, *amount);
        }
        FreeBalance {
            instance: AppInstance {
                identity_hash: Hash::ZERO,
                initiator_identifier: addr(0xA),
                responder_identifier: addr(0xB),
                app_interface: AppInterface {
                    app_definition_address: addr(0xFF),
                    state_encoding: "free-balance-v1".into(),
                    action_encoding: None,
                },
                default_timeout: 0,
                latest_state: serde_json::to_value(&state).unwrap(),
                latest_version_number: 0,
                latest_action: None,
                state_timeout: 0,
                outcome_type: OutcomeType::MultiAssetMultiPartyCoinTransfer,
                initiator_deposit: 0,
                responder_deposit: 0,
                initiator_deposit_asset_id: addr(0),
                responder_deposit_asset_id: addr(0),
            },
        }
    }

    fn channel_with(fb: FreeBalance, proposal: &AppInstance) -> Channel {
        let mut proposed = IndexMap::new();
        proposed.insert(proposal.identity_hash, proposal.clone());
        Channel {
            multisig_address: addr(0xEE),
            multisig_owners: [ChannelOwner(addr(0xA)), ChannelOwner(addr(0xB))],
            free_balance: fb,
            app_instances: IndexMap::new(),
            proposed_app_instances: proposed,
            monotonic_num_proposed_apps: 1,
            schema_version: SUPPORTED_SCHEMA_VERSION,
        }
    }

    fn proposal(
        initiator: Address,
        responder: Address,
        initiator_deposit: u128,
        responder_deposit: u128,
        initiator_asset: Address,
        responder_asset: Address,
    ) -> AppInstance {
        AppInstance {
            identity_hash: crate::channel::compute_identity_hash(initiator, responder, addr(2), 10, 1),
            initiator_identifier: initiator,
            responder_identifier: responder,
            app_interface: AppInterface {
                app_definition_address: addr(2),
                state_encoding: "app-v1".into(),
                action_encoding: None,
            },
            default_timeout: 10,
            latest_state: serde_json::json!({}),
            latest_version_number: 0,
            latest_action: None,
            state_timeout: 10,
            outcome_type: OutcomeType::TwoPartyFixedOutcome,
            initiator_deposit,
            responder_deposit,
            initiator_deposit_asset_id: initiator_asset,
            responder_deposit_asset_id: responder_asset,
        }
    }

    // S1 — distinct assets.
    #[test]
    fn s1_distinct_assets() {
        let fb = free_balance(&[(addr(10), addr(0xA), 100), (addr(20), addr(0xB), 50)]);
        let p = proposal(addr(0xA), addr(0xB), 30, 20, addr(10), addr(20));
        let channel = channel_with(fb, &p);

        let (post, _installed) = compute_install_state_channel_transition(&channel, &p).unwrap();
        assert_eq!(post.free_balance.balance_of(addr(10), addr(0xA)), 70);
        assert_eq!(post.free_balance.balance_of(addr(20), addr(0xB)), 30);
        assert_eq!(post.free_balance.version_number(), 1);
    }

    // S2 — same asset, app order matches channel order.
    #[test]
    fn s2_same_asset_matching_order() {
        let fb = free_balance(&[(addr(10), addr(0xA), 100), (addr(10), addr(0xB), 100)]);
        let p = proposal(addr(0xA), addr(0xB), 30, 40, addr(10), addr(10));
        let channel = channel_with(fb, &p);

        let (post, _) = compute_install_state_channel_transition(&channel, &p).unwrap();
        assert_eq!(post.free_balance.balance_of(addr(10), addr(0xA)), 70);
        assert_eq!(post.free_balance.balance_of(addr(10), addr(0xB)), 60);
    }

    // S3 — same asset, app order reversed: tie-break normalizes to the
    // same result as S2.
    #[test]
    fn s3_same_asset_reversed_order() {
        let fb = free_balance(&[(addr(10), addr(0xA), 100), (addr(10), addr(0xB), 100)]);
        let p = proposal(addr(0xB), addr(0xA), 40, 30, addr(10), addr(10));
        let channel = channel_with(fb, &p);

        let (post, _) = compute_install_state_channel_transition(&channel, &p).unwrap();
        assert_eq!(post.free_balance.balance_of(addr(10), addr(0xA)), 70);
        assert_eq!(post.free_balance.balance_of(addr(10), addr(0xB)), 60);
    }

    // S4 — insufficient funds, caught before any transition is attempted.
    #[test]
    fn s4_insufficient_funds() {
        let fb = free_balance(&[(addr(10), addr(0xA), 10)]);
        let p = proposal(addr(0xA), addr(0xB), 30, 0, addr(10), addr(10));
        let channel = channel_with(fb, &p);

        let err = check_sufficiency(&channel, &p).unwrap_err();
        match err {
            InstallError::InsufficientFunds {
                party,
                asset,
                have,
                need,
            } => {
                assert_eq!(party, addr(0xA));
                assert_eq!(asset, addr(10));
                assert_eq!(have, 10);
                assert_eq!(need, 30);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[test]
    fn zero_deposit_on_one_side_still_completes() {
        let fb = free_balance(&[(addr(10), addr(0xA), 100), (addr(20), addr(0xB), 50)]);
        let p = proposal(addr(0xA), addr(0xB), 0, 20, addr(10), addr(20));
        let channel = channel_with(fb, &p);

        let (post, _) = compute_install_state_channel_transition(&channel, &p).unwrap();
        assert_eq!(post.free_balance.balance_of(addr(10), addr(0xA)), 100);
        assert_eq!(post.free_balance.version_number(), 1);
    }

    #[test]
    fn deposit_equal_to_entire_balance_succeeds_and_hits_zero() {
        let fb = free_balance(&[(addr(10), addr(0xA), 30)]);
        let p = proposal(addr(0xA), addr(0xB), 30, 0, addr(10), addr(10));
        let channel = channel_with(fb, &p);

        let (post, _) = compute_install_state_channel_transition(&channel, &p).unwrap();
        assert_eq!(post.free_balance.balance_of(addr(10), addr(0xA)), 0);
    }
}
