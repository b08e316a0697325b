//! Background edition minting
//!
//! Polls the coordinator for pending edition requests and mints each one
//! to its recipient. Processing is at-least-once: an in-memory in-flight
//! set stops duplicate work within one process, the request-id
//! idempotency key stops double-mints across restarts.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::coordinator::handlers::UpdateEditionRequest;
use crate::device::client::CoordinatorClient;
use crate::providers::Ledger;
use crate::storage::PendingEdition;
use crate::types::{is_valid_wallet_address, EditionStatus};

/// Outcome of one processed request, for logging and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditionOutcome {
    Completed { token_id: Option<u64> },
    Failed { reason: String },
    Skipped,
}

/// Polls for and mints pending editions
pub struct EditionProcessor {
    ledger: Arc<dyn Ledger>,
    coordinator: CoordinatorClient,
    poll_interval: Duration,
    batch_size: u32,
    /// Request ids currently being worked; a request re-fetched while its
    /// first attempt is still running must not be minted twice
    in_flight: HashSet<i64>,
}

impl EditionProcessor {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        coordinator: CoordinatorClient,
        poll_interval: Duration,
        batch_size: u32,
    ) -> Self {
        Self {
            ledger,
            coordinator,
            poll_interval,
            batch_size,
            in_flight: HashSet::new(),
        }
    }

    /// Poll forever; one tick fetches and drains a batch
    ///
    /// Ticks never overlap: a long batch delays the next poll rather than
    /// piling up.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!(
            "Edition processor polling every {}s (batch {})",
            self.poll_interval.as_secs(),
            self.batch_size
        );

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One poll cycle
    pub async fn tick(&mut self) {
        let pending = match self.coordinator.pending_editions(self.batch_size).await {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Could not fetch pending editions: {}", e);
                return;
            }
        };

        if pending.is_empty() {
            return;
        }
        log::debug!("{} pending edition request(s)", pending.len());

        for request in pending {
            let outcome = self.process_one(&request).await;
            match &outcome {
                EditionOutcome::Completed { token_id } => log::info!(
                    "✓ Edition request {} completed (token {:?})",
                    request.request_id,
                    token_id
                ),
                EditionOutcome::Failed { reason } => log::error!(
                    "Edition request {} failed: {}",
                    request.request_id,
                    reason
                ),
                EditionOutcome::Skipped => {}
            }
        }
    }

    /// Reserve a request id for processing; false when already in flight
    pub fn mark_in_flight(&mut self, request_id: i64) -> bool {
        self.in_flight.insert(request_id)
    }

    /// Process a single pending request
    pub async fn process_one(&mut self, request: &PendingEdition) -> EditionOutcome {
        if !self.mark_in_flight(request.request_id) {
            log::debug!("Edition request {} already in flight", request.request_id);
            return EditionOutcome::Skipped;
        }

        let outcome = self.mint(request).await;

        // Always release, even after a failure, so a retried request can
        // be picked up on a later tick.
        self.in_flight.remove(&request.request_id);
        outcome
    }

    async fn mint(&self, request: &PendingEdition) -> EditionOutcome {
        if !is_valid_wallet_address(&request.wallet_address) {
            return self
                .fail(
                    request.request_id,
                    format!("invalid recipient wallet: {}", request.wallet_address),
                )
                .await;
        }

        // Mark processing before touching the ledger. Best-effort: a
        // failed mark still proceeds, the idempotency key covers the
        // resulting re-fetch window.
        let mark = UpdateEditionRequest {
            request_id: request.request_id,
            status: Some(EditionStatus::Processing),
            tx_hash: None,
            token_id: None,
            error_message: None,
        };
        if let Err(e) = self.coordinator.update_edition(&mark).await {
            log::warn!(
                "Could not mark edition request {} processing: {}",
                request.request_id,
                e
            );
        }

        let idempotency_key = format!("edition-{}", request.request_id);
        match self
            .ledger
            .mint_edition(
                &request.wallet_address,
                request.original_token_id,
                &idempotency_key,
            )
            .await
        {
            Ok(receipt) if receipt.success => {
                let update = UpdateEditionRequest {
                    request_id: request.request_id,
                    status: Some(EditionStatus::Completed),
                    tx_hash: Some(receipt.tx_hash),
                    token_id: receipt.token_id,
                    error_message: None,
                };
                if let Err(e) = self.coordinator.update_edition(&update).await {
                    // The mint landed; the completion report gets another
                    // chance when the coordinator is reachable again and
                    // the idempotency key absorbs the re-mint attempt.
                    log::error!(
                        "Edition request {} minted but completion report failed: {}",
                        request.request_id,
                        e
                    );
                }
                EditionOutcome::Completed {
                    token_id: update.token_id,
                }
            }
            Ok(receipt) => {
                self.fail(
                    request.request_id,
                    format!("mint transaction {} did not succeed", receipt.tx_hash),
                )
                .await
            }
            Err(e) => self.fail(request.request_id, e.to_string()).await,
        }
    }

    async fn fail(&self, request_id: i64, reason: String) -> EditionOutcome {
        let update = UpdateEditionRequest {
            request_id,
            status: Some(EditionStatus::Failed),
            tx_hash: None,
            token_id: None,
            error_message: Some(reason.clone()),
        };
        if let Err(e) = self.coordinator.update_edition(&update).await {
            log::warn!(
                "Could not report failure for edition request {}: {}",
                request_id,
                e
            );
        }
        EditionOutcome::Failed { reason }
    }
}
