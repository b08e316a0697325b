//! Device registration against the ledger
//!
//! Registration has three observable states: not registered, registered
//! but inactive, and registered and active. Activity checks always hit
//! the ledger; the local device table is a write-through cache that never
//! answers authorization questions.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::providers::{DeviceRegistration, Ledger, LedgerError};
use crate::storage::{ClaimStore, DeviceRecord, StoreError};
use crate::types::DeviceState;

/// Registration errors
#[derive(Debug, thiserror::Error)]
pub enum RegistrarError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Ensures the capture device is registered and active before minting
pub struct DeviceRegistrar {
    ledger: Arc<dyn Ledger>,
    store: Arc<Mutex<ClaimStore>>,
    registration: DeviceRegistration,
}

impl DeviceRegistrar {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        store: Arc<Mutex<ClaimStore>>,
        registration: DeviceRegistration,
    ) -> Self {
        Self {
            ledger,
            store,
            registration,
        }
    }

    /// Whether the device is currently active, straight from the ledger
    pub async fn is_active(&self) -> Result<bool, RegistrarError> {
        Ok(self
            .ledger
            .is_device_active(&self.registration.device_address)
            .await?)
    }

    /// Current registration state from the ledger
    pub async fn state(&self) -> Result<DeviceState, RegistrarError> {
        let addr = &self.registration.device_address;
        if !self.ledger.is_device_registered(addr).await? {
            return Ok(DeviceState::NotRegistered);
        }
        if self.ledger.is_device_active(addr).await? {
            Ok(DeviceState::RegisteredActive)
        } else {
            Ok(DeviceState::RegisteredInactive)
        }
    }

    /// Drive the device to registered-and-active, idempotently
    ///
    /// Already active is a no-op. Registered-but-inactive gets an
    /// activation transaction. Unregistered devices are registered, which
    /// activates atomically; an "already registered" revert means another
    /// path won the race, so we fall through to the activation check.
    pub async fn ensure_registered(&self) -> Result<DeviceState, RegistrarError> {
        let addr = &self.registration.device_address;

        match self.state().await? {
            DeviceState::RegisteredActive => {
                log::debug!("Device {} already active", addr);
                self.cache(true, true, None, None).await?;
                Ok(DeviceState::RegisteredActive)
            }
            DeviceState::RegisteredInactive => {
                let receipt = self.ledger.activate_device(addr).await?;
                log::info!("✓ Device {} activated ({})", addr, receipt.tx_hash);
                self.cache(true, true, None, Some(&receipt.tx_hash)).await?;
                Ok(DeviceState::RegisteredActive)
            }
            DeviceState::NotRegistered => {
                match self.ledger.register_device(&self.registration).await {
                    Ok(receipt) => {
                        log::info!("✓ Device {} registered ({})", addr, receipt.tx_hash);
                        self.cache(true, true, Some(&receipt.tx_hash), None).await?;
                        Ok(DeviceState::RegisteredActive)
                    }
                    Err(e) if e.is_already_registered() => {
                        // Lost a benign race; check whether activation is
                        // still needed.
                        log::warn!("Device {} registered concurrently elsewhere", addr);
                        if self.ledger.is_device_active(addr).await? {
                            self.cache(true, true, None, None).await?;
                            Ok(DeviceState::RegisteredActive)
                        } else {
                            let receipt = self.ledger.activate_device(addr).await?;
                            log::info!("✓ Device {} activated ({})", addr, receipt.tx_hash);
                            self.cache(true, true, None, Some(&receipt.tx_hash)).await?;
                            Ok(DeviceState::RegisteredActive)
                        }
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    async fn cache(
        &self,
        registered: bool,
        active: bool,
        registration_tx: Option<&str>,
        activation_tx: Option<&str>,
    ) -> Result<(), RegistrarError> {
        let mut store = self.store.lock().await;
        store.upsert_device(&DeviceRecord {
            device_address: self.registration.device_address.clone(),
            device_id: Some(self.registration.device_id.clone()),
            camera_id: Some(self.registration.camera_id.clone()),
            registered,
            active,
            registration_tx: registration_tx.map(str::to_string),
            activation_tx: activation_tx.map(str::to_string),
            updated_at: 0,
        })?;
        Ok(())
    }
}
