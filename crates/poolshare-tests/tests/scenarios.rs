//! End-to-end vault scenarios.
//!
//! Each test wires a vault with an in-memory token and walks one documented
//! payout history from initialization to final balances.

use poolshare_core::constants::SCALE;
use poolshare_core::crypto::KeyPair;
use poolshare_core::error::{SignatureError, TransferError, VaultError};
use poolshare_core::event::VaultEvent;
use poolshare_tests::helpers::*;

// ---------------------------------------------------------------------------
// Scenario 1: evenly divisible deposit
// ---------------------------------------------------------------------------

#[test]
fn even_split_pays_exact_shares() {
    let (a, b, c) = (addr(0xa1), addr(0xb2), addr(0xc3));
    let v = vault(&[(a, 100), (b, 200), (c, 300)]);
    assert_eq!(v.total_weight(), 600);

    let delta = v.deposit(&depositor(), 600).unwrap();
    assert_eq!(delta, SCALE, "accumulator advances by exactly 1.0");

    assert_eq!(v.claim(&a, &a).unwrap(), 100);
    assert_eq!(v.claim(&b, &b).unwrap(), 200);
    assert_eq!(v.claim(&c, &c).unwrap(), 300);

    assert_eq!(paid_to(&v, &[a, b, c]), 600);
    assert_eq!(v.token().vault_balance(), 0, "no dust left behind");
}

// ---------------------------------------------------------------------------
// Scenario 2: indivisible deposit leaves bounded dust
// ---------------------------------------------------------------------------

#[test]
fn indivisible_deposit_leaves_one_unit_of_dust() {
    let (a, b, c) = (addr(0xa1), addr(0xb2), addr(0xc3));
    let v = vault(&[(a, 1), (b, 1), (c, 1)]);

    let delta = v.deposit(&depositor(), 10).unwrap();
    assert_eq!(delta, 10 * SCALE / 3);

    let paid: u128 = [a, b, c].iter().map(|p| v.claim(p, p).unwrap()).sum();
    assert_eq!(paid, 9);
    assert_eq!(v.token().vault_balance(), 1, "exactly one unit unclaimable");

    // Claiming again pays nothing; the dust stays put.
    for p in [a, b, c] {
        assert_eq!(v.claim(&p, &p).unwrap(), 0);
    }
    assert_eq!(v.token().vault_balance(), 1);
}

// ---------------------------------------------------------------------------
// Scenario 3: weight changes apply retroactively to unclaimed accrual
// ---------------------------------------------------------------------------

#[test]
fn weight_change_applies_to_whole_unclaimed_delta() {
    let a = addr(0xa1);
    let v = vault(&[(a, 100)]);

    let d = v.deposit(&depositor(), 1_000).unwrap();
    assert_eq!(v.pending(&a).unwrap(), 1_000);

    v.set_weights(&governor(), &[a], &[50]).unwrap();
    let owed = v.claim(&a, &a).unwrap();

    assert_eq!(owed, 50 * d / SCALE);
    assert_eq!(owed, 500);
    assert_ne!(owed, 100 * d / SCALE);
}

#[test]
fn weight_increase_also_applies_retroactively() {
    let (a, b) = (addr(0xa1), addr(0xb2));
    let v = vault(&[(a, 1), (b, 1)]);
    v.deposit(&depositor(), 100).unwrap();

    v.set_weights(&governor(), &[a], &[3]).unwrap();
    // a's unclaimed 50 is re-read at weight 3, so the ledger now owes more
    // than it holds.
    assert_eq!(v.pending(&a).unwrap(), 150);
    assert_eq!(v.claim(&b, &b).unwrap(), 50);
    assert_eq!(
        v.claim(&a, &a),
        Err(VaultError::Transfer(TransferError::InsufficientBalance { have: 50, need: 150 }))
    );
    assert_eq!(v.pending(&a).unwrap(), 150, "failed claim left the checkpoint alone");
}

// ---------------------------------------------------------------------------
// Scenario 4: a relayed claim cannot be replayed
// ---------------------------------------------------------------------------

#[test]
fn relayed_claim_consumes_nonce_and_blocks_replay() {
    let kp = KeyPair::generate();
    let recipient = addr(0x77);
    let v = vault(&[(kp.address(), 10), (addr(0xb2), 10)]);
    v.deposit(&depositor(), 200).unwrap();

    let req = signed_request(&v, &kp, recipient, NOW + 3_600);
    assert_eq!(v.nonce_of(&kp.address()), 0);

    assert_eq!(v.claim_with_signature(&relayer(), &req).unwrap(), 100);
    assert_eq!(v.nonce_of(&kp.address()), 1);
    assert_eq!(v.token().balance_of(&recipient), 100);
    assert_eq!(v.checkpoint_of(&kp.address()), v.acc_per_weight());

    v.deposit(&depositor(), 200).unwrap();
    let replay = v.claim_with_signature(&relayer(), &req);
    assert!(
        matches!(replay, Err(VaultError::BadSignature(SignatureError::SignerMismatch { .. }))),
        "replayed signature must not recover the beneficiary: {replay:?}"
    );
    assert_eq!(v.nonce_of(&kp.address()), 1);
    assert_eq!(v.pending(&kp.address()).unwrap(), 100, "replay paid nothing");

    let fresh = signed_request(&v, &kp, recipient, NOW + 3_600);
    assert_eq!(v.claim_with_signature(&relayer(), &fresh).unwrap(), 100);
    assert_eq!(v.nonce_of(&kp.address()), 2);
}

#[test]
fn relayed_claim_event_records_relayer_and_nonce() {
    let kp = KeyPair::generate();
    let v = vault(&[(kp.address(), 1)]);
    v.deposit(&depositor(), 5).unwrap();
    v.events().take();

    let req = signed_request(&v, &kp, addr(0x77), NOW + 10);
    v.claim_with_signature(&relayer(), &req).unwrap();

    assert_eq!(
        v.events().take(),
        vec![VaultEvent::Claimed {
            beneficiary: kp.address(),
            recipient: addr(0x77),
            amount: 5,
            relayer: Some(relayer()),
            nonce: Some(0),
        }]
    );
}

// ---------------------------------------------------------------------------
// Scenario 5: pause blocks value flow but not governance
// ---------------------------------------------------------------------------

#[test]
fn paused_vault_rejects_deposit_but_accepts_weight_changes() {
    let a = addr(0xa1);
    let v = vault(&[(a, 1)]);

    v.pause(&guardian()).unwrap();
    assert!(v.is_paused());
    assert_eq!(v.deposit(&depositor(), 100), Err(VaultError::Paused));
    assert_eq!(v.token().vault_balance(), 0);

    v.set_weights(&governor(), &[a, addr(0xb2)], &[2, 2]).unwrap();
    assert_eq!(v.total_weight(), 4);

    v.unpause(&guardian()).unwrap();
    v.deposit(&depositor(), 100).unwrap();
    assert_eq!(v.claim(&a, &a).unwrap(), 50);
}

#[test]
fn paused_vault_rejects_relayed_claims() {
    let kp = KeyPair::generate();
    let v = vault(&[(kp.address(), 1)]);
    v.deposit(&depositor(), 5).unwrap();
    let req = signed_request(&v, &kp, kp.address(), NOW + 10);

    v.pause(&guardian()).unwrap();
    assert_eq!(v.claim_with_signature(&relayer(), &req), Err(VaultError::Paused));
    assert_eq!(v.nonce_of(&kp.address()), 0, "paused claim consumed no nonce");

    v.unpause(&guardian()).unwrap();
    assert_eq!(v.claim_with_signature(&relayer(), &req).unwrap(), 5);
}

// ---------------------------------------------------------------------------
// Longer histories
// ---------------------------------------------------------------------------

#[test]
fn late_joiner_only_shares_later_deposits() {
    let (a, b) = (addr(0xa1), addr(0xb2));
    let v = vault(&[(a, 1)]);
    v.deposit(&depositor(), 100).unwrap();

    v.set_weights(&governor(), &[b], &[1]).unwrap();
    v.deposit(&depositor(), 100).unwrap();

    assert_eq!(v.claim(&b, &b).unwrap(), 50);
    assert_eq!(v.claim(&a, &a).unwrap(), 150);
    assert_eq!(v.token().vault_balance(), 0);
}

#[test]
fn removed_participant_accrues_nothing_further() {
    let (a, b) = (addr(0xa1), addr(0xb2));
    let v = vault(&[(a, 1), (b, 1)]);
    v.deposit(&depositor(), 100).unwrap();
    v.claim(&a, &a).unwrap();

    v.set_weights(&governor(), &[a], &[0]).unwrap();
    v.deposit(&depositor(), 100).unwrap();

    assert_eq!(v.claim(&a, &a).unwrap(), 0);
    assert_eq!(v.claim(&b, &b).unwrap(), 150);
}

#[test]
fn snapshot_survives_binary_roundtrip_mid_history() {
    let (a, b) = (addr(0xa1), addr(0xb2));
    let v = vault(&[(a, 2), (b, 3)]);
    v.deposit(&depositor(), 500).unwrap();
    v.claim(&a, &a).unwrap();

    let bytes = v.snapshot().to_bytes().unwrap();
    let snap = poolshare_ledger::VaultSnapshot::from_bytes(&bytes).unwrap();
    assert_eq!(snap, v.snapshot());
    assert_eq!(snap.checkpoints.get(&a), Some(&v.acc_per_weight()));
    assert!(snap.checkpoints.get(&b).is_none());
}
