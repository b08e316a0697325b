//! Claim store lifecycle tests

mod common;

use shutter_mint::storage::{ClaimStore, EditionUpdate, NewClaim, StoreError};
use shutter_mint::types::{ClaimStatus, EditionStatus, VerificationStatus};

fn open_store() -> (tempfile::TempDir, ClaimStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ClaimStore::new(dir.path()).unwrap();
    (dir, store)
}

fn new_claim(id: &str) -> NewClaim {
    NewClaim {
        claim_id: id.to_string(),
        cid: format!("Qm{}", id),
        metadata_cid: None,
        device_id: Some("rpi-01".to_string()),
        camera_id: Some("imx477".to_string()),
        image_hash: Some("deadbeef".to_string()),
        signature: None,
        device_address: Some(common::DEVICE_ADDRESS.to_string()),
    }
}

#[test]
fn create_and_get_claim() {
    let (_dir, mut store) = open_store();

    let claim = store.create_claim(new_claim("c1")).unwrap();
    assert_eq!(claim.status, ClaimStatus::Pending);
    assert_eq!(claim.cid, "Qmc1");
    assert!(claim.token_id.is_none());

    let fetched = store.get_claim("c1").unwrap();
    assert_eq!(fetched.claim_id, "c1");
    assert_eq!(fetched.device_id.as_deref(), Some("rpi-01"));
}

#[test]
fn duplicate_claim_id_is_rejected_without_mutation() {
    let (_dir, mut store) = open_store();

    store.create_claim(new_claim("c1")).unwrap();

    let mut dup = new_claim("c1");
    dup.cid = "QmOther".to_string();
    match store.create_claim(dup) {
        Err(StoreError::ClaimExists(id)) => assert_eq!(id, "c1"),
        other => panic!("expected ClaimExists, got {:?}", other.map(|c| c.claim_id)),
    }

    // Original row untouched
    assert_eq!(store.get_claim("c1").unwrap().cid, "Qmc1");
}

#[test]
fn missing_claim_is_not_found() {
    let (_dir, store) = open_store();
    assert!(matches!(
        store.get_claim("nope"),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn status_update_writes_token_and_tx() {
    let (_dir, mut store) = open_store();
    store.create_claim(new_claim("c1")).unwrap();

    let claim = store
        .update_claim_status("c1", ClaimStatus::Open, Some(42), Some("0xmint"))
        .unwrap();
    assert_eq!(claim.status, ClaimStatus::Open);
    assert_eq!(claim.token_id, Some(42));
    assert_eq!(claim.tx_hash.as_deref(), Some("0xmint"));

    // Omitted fields persist through later updates
    let claim = store
        .update_claim_status("c1", ClaimStatus::Claimed, None, None)
        .unwrap();
    assert_eq!(claim.token_id, Some(42));
    assert_eq!(claim.tx_hash.as_deref(), Some("0xmint"));
}

#[test]
fn oversized_token_id_is_rejected_not_wrapped() {
    let (_dir, mut store) = open_store();
    store.create_claim(new_claim("c1")).unwrap();

    // Past i64::MAX the id cannot round-trip through SQLite
    assert!(matches!(
        store.update_claim_status("c1", ClaimStatus::Open, Some(u64::MAX), None),
        Err(StoreError::InvalidData(_))
    ));
    let claim = store.get_claim("c1").unwrap();
    assert_eq!(claim.status, ClaimStatus::Pending);
    assert!(claim.token_id.is_none());

    assert!(matches!(
        store.upsert_proof_status("c1", Some(u64::MAX), None, None),
        Err(StoreError::InvalidData(_))
    ));

    // The boundary value itself is storable
    let claim = store
        .update_claim_status("c1", ClaimStatus::Open, Some(i64::MAX as u64), None)
        .unwrap();
    assert_eq!(claim.token_id, Some(i64::MAX as u64));
}

#[test]
fn status_regression_is_applied() {
    let (_dir, mut store) = open_store();
    store.create_claim(new_claim("c1")).unwrap();
    store
        .update_claim_status("c1", ClaimStatus::Open, Some(1), None)
        .unwrap();

    // Trusted path: a backwards move is honored
    let claim = store
        .update_claim_status("c1", ClaimStatus::Pending, None, None)
        .unwrap();
    assert_eq!(claim.status, ClaimStatus::Pending);
}

#[test]
fn submit_edition_requires_open_claim_with_token() {
    let (_dir, mut store) = open_store();
    store.create_claim(new_claim("c1")).unwrap();

    // Pending claim: rejected
    assert!(matches!(
        store.submit_edition("c1", common::USER_WALLET),
        Err(StoreError::StateConflict(_))
    ));

    // Open but unminted: rejected
    store
        .update_claim_status("c1", ClaimStatus::Open, None, None)
        .unwrap();
    assert!(matches!(
        store.submit_edition("c1", common::USER_WALLET),
        Err(StoreError::StateConflict(_))
    ));

    // Open and minted: accepted, claim advances
    store
        .update_claim_status("c1", ClaimStatus::Open, Some(7), None)
        .unwrap();
    let request = store.submit_edition("c1", common::USER_WALLET).unwrap();
    assert_eq!(request.status, EditionStatus::Pending);
    assert_eq!(request.wallet_address, common::USER_WALLET);

    let claim = store.get_claim("c1").unwrap();
    assert_eq!(claim.status, ClaimStatus::Claimed);
    assert_eq!(claim.recipient_address.as_deref(), Some(common::USER_WALLET));

    // Claimed now: second submission rejected
    assert!(matches!(
        store.submit_edition("c1", common::OWNER_WALLET),
        Err(StoreError::StateConflict(_))
    ));
}

#[test]
fn pending_editions_joins_minted_parents_in_fifo_order() {
    let (_dir, mut store) = open_store();

    for id in ["c1", "c2"] {
        store.create_claim(new_claim(id)).unwrap();
        store
            .update_claim_status(id, ClaimStatus::Open, Some(1), None)
            .unwrap();
    }
    store.submit_edition("c1", common::USER_WALLET).unwrap();
    store.submit_edition("c2", common::OWNER_WALLET).unwrap();

    let pending = store.pending_editions(10).unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].claim_id, "c1");
    assert_eq!(pending[1].claim_id, "c2");
    assert_eq!(pending[0].original_token_id, 1);

    let limited = store.pending_editions(1).unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn completed_edition_advances_parent_claim() {
    let (_dir, mut store) = open_store();
    store.create_claim(new_claim("c1")).unwrap();
    store
        .update_claim_status("c1", ClaimStatus::Open, Some(7), None)
        .unwrap();
    let request = store.submit_edition("c1", common::USER_WALLET).unwrap();
    let request_id = request.id.unwrap();

    let updated = store
        .update_edition_request(
            request_id,
            EditionUpdate {
                status: Some(EditionStatus::Completed),
                tx_hash: Some("0xedition".to_string()),
                token_id: Some(8),
                error_message: None,
            },
        )
        .unwrap();
    assert_eq!(updated.status, EditionStatus::Completed);
    assert_eq!(updated.token_id, Some(8));

    assert_eq!(store.get_claim("c1").unwrap().status, ClaimStatus::Completed);

    // Completed requests no longer show up as pending
    assert!(store.pending_editions(10).unwrap().is_empty());
}

#[test]
fn failed_edition_keeps_claim_claimed() {
    let (_dir, mut store) = open_store();
    store.create_claim(new_claim("c1")).unwrap();
    store
        .update_claim_status("c1", ClaimStatus::Open, Some(7), None)
        .unwrap();
    let request = store.submit_edition("c1", common::USER_WALLET).unwrap();

    let updated = store
        .update_edition_request(
            request.id.unwrap(),
            EditionUpdate {
                status: Some(EditionStatus::Failed),
                error_message: Some("gateway down".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.status, EditionStatus::Failed);
    assert_eq!(updated.error_message.as_deref(), Some("gateway down"));

    assert_eq!(store.get_claim("c1").unwrap().status, ClaimStatus::Claimed);
}

#[test]
fn proof_upsert_keeps_one_row_per_claim() {
    let (_dir, mut store) = open_store();
    store.create_claim(new_claim("c1")).unwrap();

    let proof = store
        .save_proof_payload("c1", Some(7), "0xproof", "6a6f75726e616c")
        .unwrap();
    assert_eq!(proof.verification_status, VerificationStatus::Pending);

    // Status-only update with None leaves status alone
    let proof = store.upsert_proof_status("c1", None, None, None).unwrap();
    assert_eq!(proof.verification_status, VerificationStatus::Pending);
    assert_eq!(proof.token_id, Some(7));
    assert_eq!(proof.zk_proof.as_deref(), Some("0xproof"));

    let proof = store
        .upsert_proof_status("c1", Some(7), Some(VerificationStatus::Verified), Some("0xsub"))
        .unwrap();
    assert_eq!(proof.verification_status, VerificationStatus::Verified);
    assert_eq!(proof.proof_tx_hash.as_deref(), Some("0xsub"));

    assert_eq!(store.count_proof_rows("c1").unwrap(), 1);
}

#[test]
fn device_cache_write_through() {
    let (_dir, mut store) = open_store();

    assert!(store.get_device(common::DEVICE_ADDRESS).unwrap().is_none());

    store
        .upsert_device(&shutter_mint::storage::DeviceRecord {
            device_address: common::DEVICE_ADDRESS.to_string(),
            device_id: Some("rpi-01".to_string()),
            camera_id: None,
            registered: true,
            active: false,
            registration_tx: Some("0xreg".to_string()),
            activation_tx: None,
            updated_at: 0,
        })
        .unwrap();

    store
        .upsert_device(&shutter_mint::storage::DeviceRecord {
            device_address: common::DEVICE_ADDRESS.to_string(),
            device_id: None,
            camera_id: None,
            registered: true,
            active: true,
            registration_tx: None,
            activation_tx: Some("0xact".to_string()),
            updated_at: 0,
        })
        .unwrap();

    let device = store.get_device(common::DEVICE_ADDRESS).unwrap().unwrap();
    assert!(device.active);
    // COALESCE keeps earlier fields
    assert_eq!(device.device_id.as_deref(), Some("rpi-01"));
    assert_eq!(device.registration_tx.as_deref(), Some("0xreg"));
    assert_eq!(device.activation_tx.as_deref(), Some("0xact"));
}
