//! Capture-to-claim orchestration
//!
//! Drives the happy path after a capture: upload the asset, register a
//! claim, mint the original to the owner wallet, open the claim, and kick
//! off the proof pipeline in the background. The returned claim URL is
//! what the device renders as a QR code.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, Semaphore};

use crate::coordinator::handlers::{CreateClaimRequest, UpdateClaimStatusRequest};
use crate::device::client::{ClientError, CoordinatorClient};
use crate::device::proofs::ProofPipeline;
use crate::providers::{AssetStore, Ledger, LedgerError, Prover, ProviderError};
use crate::storage::ClaimStore;
use crate::types::{generate_claim_id, ClaimStatus};

/// Orchestration errors
#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("Upload error: {0}")]
    Upload(#[from] ProviderError),

    #[error("Coordinator error: {0}")]
    Coordinator(#[from] ClientError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Mint confirmed without a token id (tx {0})")]
    MissingTokenId(String),
}

/// Outcome of a successful capture mint
#[derive(Debug, Clone)]
pub struct MintOutcome {
    pub claim_id: String,
    pub claim_url: String,
    pub token_id: u64,
    pub tx_hash: String,
    pub cid: String,
}

/// Identity the orchestrator stamps onto every claim
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub camera_id: String,
    pub device_address: String,
    pub owner_wallet: String,
}

/// Turns captured assets into open, minted claims
pub struct MintOrchestrator {
    storage: Arc<dyn AssetStore>,
    ledger: Arc<dyn Ledger>,
    prover: Arc<dyn Prover>,
    coordinator: CoordinatorClient,
    store: Arc<Mutex<ClaimStore>>,
    identity: DeviceIdentity,
    /// Bounds concurrent proof pipelines across captures
    proof_permits: Arc<Semaphore>,
}

impl MintOrchestrator {
    pub fn new(
        storage: Arc<dyn AssetStore>,
        ledger: Arc<dyn Ledger>,
        prover: Arc<dyn Prover>,
        coordinator: CoordinatorClient,
        store: Arc<Mutex<ClaimStore>>,
        identity: DeviceIdentity,
        max_proof_tasks: usize,
    ) -> Self {
        Self {
            storage,
            ledger,
            prover,
            coordinator,
            store,
            identity,
            proof_permits: Arc::new(Semaphore::new(max_proof_tasks)),
        }
    }

    /// Process one captured asset end to end
    ///
    /// The original is always minted to the configured owner wallet; the
    /// end user receives an edition later via the claim flow. Proof work
    /// happens in a spawned task so the next capture is not blocked.
    pub async fn process_capture(
        &self,
        filename: &str,
        bytes: &[u8],
        signature: Option<String>,
    ) -> Result<MintOutcome, MintError> {
        let image_hash = hex::encode(Sha256::digest(bytes));
        log::info!(
            "Processing capture {} ({} bytes, sha256 {})",
            filename,
            bytes.len(),
            &image_hash[..12]
        );

        let cid = self.storage.upload(filename, bytes).await?;
        log::info!("✓ Asset uploaded: {}", cid);

        let claim_id = generate_claim_id();
        let created = self
            .coordinator
            .create_claim(&CreateClaimRequest {
                cid: cid.clone(),
                claim_id: Some(claim_id.clone()),
                metadata_cid: None,
                device_id: Some(self.identity.device_id.clone()),
                camera_id: Some(self.identity.camera_id.clone()),
                image_hash: Some(image_hash),
                signature,
                device_address: Some(self.identity.device_address.clone()),
            })
            .await?;
        log::info!("✓ Claim {} registered: {}", claim_id, created.claim_url);

        let metadata_url = self.coordinator.metadata_url(&claim_id);
        let receipt = self
            .ledger
            .mint_original(&self.identity.owner_wallet, &metadata_url)
            .await?;
        let token_id = receipt
            .token_id
            .ok_or_else(|| MintError::MissingTokenId(receipt.tx_hash.clone()))?;
        log::info!(
            "✓ Original minted for claim {}: token {} ({})",
            claim_id,
            token_id,
            receipt.tx_hash
        );

        self.coordinator
            .update_claim_status(&UpdateClaimStatusRequest {
                claim_id: claim_id.clone(),
                status: ClaimStatus::Open,
                token_id: Some(token_id),
                tx_hash: Some(receipt.tx_hash.clone()),
            })
            .await?;

        self.spawn_proof_pipeline(claim_id.clone(), token_id);

        Ok(MintOutcome {
            claim_id,
            claim_url: created.claim_url,
            token_id,
            tx_hash: receipt.tx_hash,
            cid,
        })
    }

    /// Run the proof pipeline in the background, bounded by the permit pool
    fn spawn_proof_pipeline(&self, claim_id: String, token_id: u64) {
        let pipeline = ProofPipeline::new(
            Arc::clone(&self.prover),
            Arc::clone(&self.ledger),
            Arc::clone(&self.store),
            self.coordinator.clone(),
        );
        let permits = Arc::clone(&self.proof_permits);

        tokio::spawn(async move {
            let _permit = match permits.acquire().await {
                Ok(p) => p,
                // Closed semaphore means shutdown
                Err(_) => return,
            };
            if let Err(e) = pipeline.run(&claim_id, token_id).await {
                log::error!("Proof pipeline failed for claim {}: {}", claim_id, e);
            }
        });
    }
}
