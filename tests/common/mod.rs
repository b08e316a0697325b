//! Shared test harness: mock providers and an in-process coordinator

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::Mutex;

use shutter_mint::coordinator::{build_router, AppState};
use shutter_mint::providers::{
    AssetStore, DeviceRegistration, Ledger, LedgerError, ProofBundle, Prover, ProviderError,
    TxReceipt,
};
use shutter_mint::storage::ClaimStore;

pub const OWNER_WALLET: &str = "0x1111111111111111111111111111111111111111";
pub const USER_WALLET: &str = "0x2222222222222222222222222222222222222222";
pub const DEVICE_ADDRESS: &str = "0x3333333333333333333333333333333333333333";

/// Start a coordinator on an ephemeral port backed by a store in `dir`
pub async fn spawn_coordinator(dir: &std::path::Path) -> String {
    let store = ClaimStore::new(dir).unwrap();
    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        public_base_url: "http://claims.test".to_string(),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Scriptable in-memory ledger
#[derive(Default)]
pub struct MockLedger {
    pub next_token: AtomicU64,
    pub registered: AtomicBool,
    pub active: AtomicBool,
    /// All mint_original receipts handed out: (to, metadata_url)
    pub originals: StdMutex<Vec<(String, String)>>,
    /// All mint_edition calls: (to, original_token_id, idempotency_key)
    pub editions: StdMutex<Vec<(String, u64, String)>>,
    /// Proof submissions: token ids
    pub proofs: StdMutex<Vec<u64>>,
    /// When set, mint_edition fails with a Service error
    pub fail_editions: AtomicBool,
    /// When set, submit_proof returns a success=false receipt
    pub proof_receipt_fails: AtomicBool,
    /// When set, register_device reverts with "already registered"
    pub register_races: AtomicBool,
    /// When set, estimate_proof_gas errors
    pub fail_gas_estimate: AtomicBool,
}

impl MockLedger {
    pub fn new() -> Self {
        let ledger = Self::default();
        ledger.next_token.store(100, Ordering::SeqCst);
        ledger
    }

    fn take_token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::SeqCst)
    }

    fn receipt(&self, token_id: Option<u64>) -> TxReceipt {
        TxReceipt {
            tx_hash: format!("0xtx{:08x}", self.next_token.load(Ordering::SeqCst)),
            token_id,
            success: true,
            gas_used: Some(21000),
        }
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn mint_original(&self, to: &str, metadata_url: &str) -> Result<TxReceipt, LedgerError> {
        self.originals
            .lock()
            .unwrap()
            .push((to.to_string(), metadata_url.to_string()));
        let token = self.take_token();
        Ok(self.receipt(Some(token)))
    }

    async fn mint_edition(
        &self,
        to: &str,
        original_token_id: u64,
        idempotency_key: &str,
    ) -> Result<TxReceipt, LedgerError> {
        if self.fail_editions.load(Ordering::SeqCst) {
            return Err(LedgerError::Service("edition mint unavailable".to_string()));
        }
        self.editions.lock().unwrap().push((
            to.to_string(),
            original_token_id,
            idempotency_key.to_string(),
        ));
        let token = self.take_token();
        Ok(self.receipt(Some(token)))
    }

    async fn is_device_registered(&self, _device_address: &str) -> Result<bool, LedgerError> {
        Ok(self.registered.load(Ordering::SeqCst))
    }

    async fn is_device_active(&self, _device_address: &str) -> Result<bool, LedgerError> {
        Ok(self.active.load(Ordering::SeqCst))
    }

    async fn register_device(
        &self,
        _registration: &DeviceRegistration,
    ) -> Result<TxReceipt, LedgerError> {
        if self.register_races.load(Ordering::SeqCst) {
            // Simulates another registrant winning between check and write
            self.registered.store(true, Ordering::SeqCst);
            return Err(LedgerError::Revert {
                reason: Some("Device already registered".to_string()),
                data: None,
            });
        }
        self.registered.store(true, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
        Ok(self.receipt(None))
    }

    async fn activate_device(&self, _device_address: &str) -> Result<TxReceipt, LedgerError> {
        self.active.store(true, Ordering::SeqCst);
        Ok(self.receipt(None))
    }

    async fn estimate_proof_gas(
        &self,
        _token_id: u64,
        _proof: &ProofBundle,
    ) -> Result<u64, LedgerError> {
        if self.fail_gas_estimate.load(Ordering::SeqCst) {
            return Err(LedgerError::Service("estimator offline".to_string()));
        }
        Ok(500_000)
    }

    async fn submit_proof(
        &self,
        token_id: u64,
        _proof: &ProofBundle,
    ) -> Result<TxReceipt, LedgerError> {
        self.proofs.lock().unwrap().push(token_id);
        let mut receipt = self.receipt(None);
        if self.proof_receipt_fails.load(Ordering::SeqCst) {
            receipt.success = false;
        }
        Ok(receipt)
    }
}

/// Asset store that fabricates deterministic CIDs
#[derive(Default)]
pub struct MockAssetStore {
    pub uploads: StdMutex<Vec<(String, usize)>>,
}

#[async_trait]
impl AssetStore for MockAssetStore {
    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, ProviderError> {
        self.uploads
            .lock()
            .unwrap()
            .push((filename.to_string(), bytes.len()));
        Ok(format!("Qm{}", filename.replace('.', "")))
    }
}

/// Prover handing back a fixed bundle with a decodable journal
#[derive(Default)]
pub struct MockProver {
    /// When set, the journal is garbage hex (tests the log-only decode path)
    pub garbage_journal: AtomicBool,
}

#[async_trait]
impl Prover for MockProver {
    async fn generate(&self, metadata_url: &str) -> Result<ProofBundle, ProviderError> {
        let journal_data = if self.garbage_journal.load(Ordering::SeqCst) {
            hex::encode(b"not json at all")
        } else {
            let journal = serde_json::json!({
                "notary_key_fingerprint": "sha256:testkey",
                "method": "GET",
                "url": metadata_url,
                "timestamp": 1700000000,
                "query_hash": "0xabcd",
                "payload": {"attested": true}
            });
            hex::encode(serde_json::to_vec(&journal).unwrap())
        };

        Ok(ProofBundle {
            zk_proof: "0xproofbytes".to_string(),
            journal_data,
        })
    }
}
