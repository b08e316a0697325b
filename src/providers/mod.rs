//! External collaborators behind trait seams
//!
//! The ledger, the asset storage service, and the proving service are
//! independent deployments. The device-side components only ever see these
//! traits; the reqwest-backed gateway clients live alongside them and tests
//! substitute mocks.

pub mod http_prover;
pub mod http_store;
pub mod rpc_ledger;

pub use http_prover::HttpProver;
pub use http_store::HttpAssetStore;
pub use rpc_ledger::RpcLedger;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type shared by the provider gateways
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Ledger errors, including decoded contract rejections
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ledger service error: {0}")]
    Service(String),

    /// Contract rejection, decoded to a symbolic reason when the ABI is
    /// known, otherwise carried as opaque data
    #[error("Transaction reverted: {}", reason.as_deref().unwrap_or("unknown reason"))]
    Revert {
        reason: Option<String>,
        data: Option<String>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LedgerError {
    /// True when a registration attempt lost a benign race with another
    /// registrant
    pub fn is_already_registered(&self) -> bool {
        match self {
            LedgerError::Revert {
                reason: Some(reason),
                ..
            } => reason.to_lowercase().contains("already registered"),
            _ => false,
        }
    }
}

/// Receipt of a confirmed ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    /// Token id minted by the transaction, if any
    pub token_id: Option<u64>,
    /// Whether the receipt reports success
    pub success: bool,
    pub gas_used: Option<u64>,
}

/// Registration payload for a signing device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub device_address: String,
    pub public_key: String,
    pub device_id: String,
    pub camera_id: String,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
}

/// Proof bundle returned by the proving service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofBundle {
    /// Compressed proof payload
    pub zk_proof: String,
    /// Hex-encoded journal (decoded for audit logging, stored verbatim)
    pub journal_data: String,
}

/// Decoded proof journal, logged for audit after generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofJournal {
    /// Notary key fingerprint
    pub notary_key_fingerprint: String,
    pub method: String,
    pub url: String,
    pub timestamp: i64,
    /// Hash over the attested query set
    pub query_hash: String,
    /// Extracted response payload
    pub payload: serde_json::Value,
}

/// The blockchain ledger, treated as an opaque confirmed-transaction
/// interface
///
/// Every mutating call blocks until the transaction confirms; a single
/// device wallet therefore has at most one in-flight transaction.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Mint the original token for a claim
    async fn mint_original(
        &self,
        to: &str,
        metadata_url: &str,
    ) -> Result<TxReceipt, LedgerError>;

    /// Mint an edition against an original token
    ///
    /// `idempotency_key` lets the gateway dedupe retries of the same
    /// request after a crash, so re-processing cannot double-mint.
    async fn mint_edition(
        &self,
        to: &str,
        original_token_id: u64,
        idempotency_key: &str,
    ) -> Result<TxReceipt, LedgerError>;

    /// Whether the device is registered on the ledger
    async fn is_device_registered(&self, device_address: &str) -> Result<bool, LedgerError>;

    /// Whether the device is registered and active
    async fn is_device_active(&self, device_address: &str) -> Result<bool, LedgerError>;

    /// Register a device (sets active atomically on success)
    async fn register_device(
        &self,
        registration: &DeviceRegistration,
    ) -> Result<TxReceipt, LedgerError>;

    /// Activate an already-registered device
    async fn activate_device(&self, device_address: &str) -> Result<TxReceipt, LedgerError>;

    /// Estimate gas for a proof-verification submission
    async fn estimate_proof_gas(
        &self,
        token_id: u64,
        proof: &ProofBundle,
    ) -> Result<u64, LedgerError>;

    /// Submit the proof-verification transaction and await confirmation
    async fn submit_proof(
        &self,
        token_id: u64,
        proof: &ProofBundle,
    ) -> Result<TxReceipt, LedgerError>;
}

/// Content-addressed asset storage (external pinning service)
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload an asset, returning its content identifier
    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, ProviderError>;
}

/// External proving service
#[async_trait]
pub trait Prover: Send + Sync {
    /// Generate a proof attesting the document at `metadata_url`
    async fn generate(&self, metadata_url: &str) -> Result<ProofBundle, ProviderError>;
}

/// Decode a hex-encoded journal into its audit form
///
/// Decode failures are the caller's to log; the encoded journal is stored
/// either way.
pub fn decode_journal(journal_data: &str) -> Result<ProofJournal, ProviderError> {
    let bytes = hex::decode(journal_data.trim_start_matches("0x"))
        .map_err(|e| ProviderError::InvalidResponse(format!("journal is not hex: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ProviderError::InvalidResponse(format!("journal is not JSON: {}", e)))
}
