//! Persistent record types for the claim store

use serde::{Deserialize, Serialize};

use crate::types::{ClaimStatus, EditionStatus, VerificationStatus};

/// A claim binding a captured asset's storage pointer to an eventual
/// on-chain token
///
/// Owned by the coordinator; token fields are written by the device
/// backend, the recipient address by the end user. Rows are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Globally unique claim identifier
    pub claim_id: String,

    /// Storage pointer for the captured asset
    pub cid: String,

    /// Storage pointer for the metadata document (if pinned separately)
    pub metadata_cid: Option<String>,

    /// Device provenance
    pub device_id: Option<String>,
    pub camera_id: Option<String>,
    pub image_hash: Option<String>,
    pub signature: Option<String>,
    pub device_address: Option<String>,

    /// Current lifecycle status
    pub status: ClaimStatus,

    /// Wallet submitted by the end user (set on claim submission)
    pub recipient_address: Option<String>,

    /// Token id of the minted original
    pub token_id: Option<u64>,

    /// Transaction hash of the original mint
    pub tx_hash: Option<String>,

    /// Unix timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields accepted when creating a claim
///
/// Everything beyond the id and asset pointer is optional device
/// provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaim {
    pub claim_id: String,
    pub cid: String,
    pub metadata_cid: Option<String>,
    pub device_id: Option<String>,
    pub camera_id: Option<String>,
    pub image_hash: Option<String>,
    pub signature: Option<String>,
    pub device_address: Option<String>,
}

/// A request to mint an edition against an already-minted original
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditionRequest {
    /// Database ID (None if not yet inserted)
    pub id: Option<i64>,

    /// Claim the edition is requested against
    pub claim_id: String,

    /// Recipient wallet for the edition
    pub wallet_address: String,

    pub status: EditionStatus,

    /// Transaction hash of the edition mint (set on completion)
    pub tx_hash: Option<String>,

    /// Token id of the minted edition (set on completion)
    pub token_id: Option<u64>,

    /// Failure reason (set when status is Failed)
    pub error_message: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

/// A pending edition request joined to its (open) parent claim
///
/// What the edition processor consumes: the join guarantees the parent is
/// open with a minted original, guarding against orphaned requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEdition {
    pub request_id: i64,
    pub claim_id: String,
    pub wallet_address: String,
    pub original_token_id: u64,
}

/// Cryptographic proof state for a claim, 1:1 by claim_id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofRecord {
    pub claim_id: String,
    pub token_id: Option<u64>,

    /// Compressed proof payload (hex/base64, provider-defined)
    pub zk_proof: Option<String>,

    /// Encoded journal returned alongside the proof
    pub journal_data: Option<String>,

    /// Transaction hash of the verification submission
    pub proof_tx_hash: Option<String>,

    pub verification_status: VerificationStatus,

    pub created_at: i64,
    pub updated_at: i64,
}

/// Advisory cache of a device's registration state
///
/// The ledger is the source of truth; this row only records what was last
/// observed or written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_address: String,
    pub device_id: Option<String>,
    pub camera_id: Option<String>,
    pub registered: bool,
    pub active: bool,
    pub registration_tx: Option<String>,
    pub activation_tx: Option<String>,
    pub updated_at: i64,
}

/// Partial update applied to an edition request
///
/// Only populated fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditionUpdate {
    pub status: Option<EditionStatus>,
    pub tx_hash: Option<String>,
    pub token_id: Option<u64>,
    pub error_message: Option<String>,
}
