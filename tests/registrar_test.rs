//! Device registrar tests

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::Mutex;

use shutter_mint::device::DeviceRegistrar;
use shutter_mint::providers::DeviceRegistration;
use shutter_mint::storage::ClaimStore;
use shutter_mint::types::DeviceState;

use common::MockLedger;

fn registration() -> DeviceRegistration {
    DeviceRegistration {
        device_address: common::DEVICE_ADDRESS.to_string(),
        public_key: "04abcd".to_string(),
        device_id: "rpi-01".to_string(),
        camera_id: "imx477".to_string(),
        model: Some("Raspberry Pi 4".to_string()),
        firmware_version: None,
    }
}

fn setup(ledger: Arc<MockLedger>) -> (tempfile::TempDir, DeviceRegistrar, Arc<Mutex<ClaimStore>>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Mutex::new(ClaimStore::new(dir.path()).unwrap()));
    let registrar = DeviceRegistrar::new(ledger, store.clone(), registration());
    (dir, registrar, store)
}

#[tokio::test]
async fn unregistered_device_gets_registered_and_active() {
    let ledger = Arc::new(MockLedger::new());
    let (_dir, registrar, store) = setup(ledger.clone());

    assert_eq!(registrar.state().await.unwrap(), DeviceState::NotRegistered);
    assert!(!registrar.is_active().await.unwrap());

    let state = registrar.ensure_registered().await.unwrap();
    assert_eq!(state, DeviceState::RegisteredActive);
    assert!(registrar.is_active().await.unwrap());

    // Cache written through
    let store = store.lock().await;
    let cached = store.get_device(common::DEVICE_ADDRESS).unwrap().unwrap();
    assert!(cached.registered);
    assert!(cached.active);
    assert!(cached.registration_tx.is_some());
}

#[tokio::test]
async fn inactive_device_is_activated() {
    let ledger = Arc::new(MockLedger::new());
    ledger.registered.store(true, Ordering::SeqCst);
    let (_dir, registrar, store) = setup(ledger.clone());

    assert_eq!(
        registrar.state().await.unwrap(),
        DeviceState::RegisteredInactive
    );

    let state = registrar.ensure_registered().await.unwrap();
    assert_eq!(state, DeviceState::RegisteredActive);

    let store = store.lock().await;
    let cached = store.get_device(common::DEVICE_ADDRESS).unwrap().unwrap();
    assert!(cached.activation_tx.is_some());
}

#[tokio::test]
async fn active_device_is_a_noop() {
    let ledger = Arc::new(MockLedger::new());
    ledger.registered.store(true, Ordering::SeqCst);
    ledger.active.store(true, Ordering::SeqCst);
    let (_dir, registrar, _store) = setup(ledger);

    let state = registrar.ensure_registered().await.unwrap();
    assert_eq!(state, DeviceState::RegisteredActive);
}

#[tokio::test]
async fn lost_registration_race_falls_through_to_activation() {
    let ledger = Arc::new(MockLedger::new());
    ledger.register_races.store(true, Ordering::SeqCst);
    let (_dir, registrar, _store) = setup(ledger.clone());

    // register_device reverts "already registered" but leaves the device
    // inactive; the registrar must recover by activating
    let state = registrar.ensure_registered().await.unwrap();
    assert_eq!(state, DeviceState::RegisteredActive);
    assert!(ledger.active.load(Ordering::SeqCst));
}
