//! Proof generation and on-chain verification
//!
//! Runs after an original mint, concurrently with further captures. The
//! device's local proof table is authoritative; the coordinator gets
//! best-effort mirrors so the public status endpoint can show proof
//! progress, and a failed mirror never fails the pipeline.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::coordinator::handlers::UpdateProofStatusRequest;
use crate::device::client::CoordinatorClient;
use crate::providers::{decode_journal, Ledger, LedgerError, ProofBundle, Prover, ProviderError};
use crate::storage::{ClaimStore, StoreError};
use crate::types::VerificationStatus;

/// Proof pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    #[error("Prover error: {0}")]
    Prover(#[from] ProviderError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Generates, persists, and submits a single claim's proof
pub struct ProofPipeline {
    prover: Arc<dyn Prover>,
    ledger: Arc<dyn Ledger>,
    store: Arc<Mutex<ClaimStore>>,
    coordinator: CoordinatorClient,
}

impl ProofPipeline {
    pub fn new(
        prover: Arc<dyn Prover>,
        ledger: Arc<dyn Ledger>,
        store: Arc<Mutex<ClaimStore>>,
        coordinator: CoordinatorClient,
    ) -> Self {
        Self {
            prover,
            ledger,
            store,
            coordinator,
        }
    }

    /// Run the full pipeline: generate, persist, submit
    pub async fn run(&self, claim_id: &str, token_id: u64) -> Result<VerificationStatus, ProofError> {
        let bundle = self.generate(claim_id, token_id).await?;
        self.submit(claim_id, token_id, &bundle).await
    }

    /// Generate the proof and persist the payload locally
    pub async fn generate(&self, claim_id: &str, token_id: u64) -> Result<ProofBundle, ProofError> {
        let metadata_url = self.coordinator.metadata_url(claim_id);
        log::info!("Generating proof for claim {} ({})", claim_id, metadata_url);

        let bundle = self.prover.generate(&metadata_url).await?;

        // Journal decode is audit logging only; the encoded form is what
        // gets stored and submitted.
        match decode_journal(&bundle.journal_data) {
            Ok(journal) => log::info!(
                "✓ Proof journal for claim {}: notary={} url={} query_hash={}",
                claim_id,
                journal.notary_key_fingerprint,
                journal.url,
                journal.query_hash
            ),
            Err(e) => log::warn!("Proof journal for claim {} undecodable: {}", claim_id, e),
        }

        {
            let mut store = self.store.lock().await;
            store.save_proof_payload(
                claim_id,
                Some(token_id),
                &bundle.zk_proof,
                &bundle.journal_data,
            )?;
        }

        self.mirror(claim_id, token_id, VerificationStatus::Pending, None)
            .await;

        Ok(bundle)
    }

    /// Submit the proof for on-chain verification
    ///
    /// The gas estimate is advisory; an estimation failure is logged and
    /// submission proceeds. The proof counts as verified only when the
    /// receipt reports success.
    pub async fn submit(
        &self,
        claim_id: &str,
        token_id: u64,
        bundle: &ProofBundle,
    ) -> Result<VerificationStatus, ProofError> {
        match self.ledger.estimate_proof_gas(token_id, bundle).await {
            Ok(gas) => log::debug!("Proof gas estimate for claim {}: {}", claim_id, gas),
            Err(e) => log::warn!("Proof gas estimate failed for claim {}: {}", claim_id, e),
        }

        let (status, tx_hash) = match self.ledger.submit_proof(token_id, bundle).await {
            Ok(receipt) if receipt.success => {
                log::info!("✓ Proof verified for claim {} ({})", claim_id, receipt.tx_hash);
                (VerificationStatus::Verified, Some(receipt.tx_hash))
            }
            Ok(receipt) => {
                log::error!(
                    "Proof submission for claim {} landed but did not verify ({})",
                    claim_id,
                    receipt.tx_hash
                );
                (VerificationStatus::Failed, Some(receipt.tx_hash))
            }
            Err(e) => {
                log::error!("Proof submission failed for claim {}: {}", claim_id, e);
                (VerificationStatus::Failed, None)
            }
        };

        {
            let mut store = self.store.lock().await;
            store.upsert_proof_status(claim_id, Some(token_id), Some(status), tx_hash.as_deref())?;
        }

        self.mirror(claim_id, token_id, status, tx_hash).await;

        Ok(status)
    }

    /// Best-effort status mirror to the coordinator
    async fn mirror(
        &self,
        claim_id: &str,
        token_id: u64,
        status: VerificationStatus,
        proof_tx_hash: Option<String>,
    ) {
        let req = UpdateProofStatusRequest {
            claim_id: claim_id.to_string(),
            token_id: Some(token_id),
            verification_status: Some(status),
            proof_tx_hash,
        };
        if let Err(e) = self.coordinator.update_proof_status(&req).await {
            log::warn!(
                "Could not mirror proof status for claim {} to coordinator: {}",
                claim_id,
                e
            );
        }
    }
}
