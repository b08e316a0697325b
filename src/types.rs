//! Shared types for shutter-mint
//!
//! Status enums for the claim lifecycle plus validation helpers used by
//! both the coordinator and the device-side services.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Lifecycle status of a claim
///
/// Advances monotonically: pending → open → claimed → completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    /// Claim created, original token not yet minted
    Pending,
    /// Original token minted (token_id set), editions may be requested
    Open,
    /// A recipient wallet has been submitted
    Claimed,
    /// Edition minted to the recipient
    Completed,
}

impl ClaimStatus {
    /// Position in the lifecycle, used to detect regressions
    pub fn rank(&self) -> u8 {
        match self {
            ClaimStatus::Pending => 0,
            ClaimStatus::Open => 1,
            ClaimStatus::Claimed => 2,
            ClaimStatus::Completed => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Open => "open",
            ClaimStatus::Claimed => "claimed",
            ClaimStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ClaimStatus::Pending),
            "open" => Some(ClaimStatus::Open),
            "claimed" => Some(ClaimStatus::Claimed),
            "completed" => Some(ClaimStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an edition request
///
/// Terminal once Completed or Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditionStatus {
    /// Queued, not yet picked up by the processor
    Pending,
    /// Picked up by the edition processor
    Processing,
    /// Edition minted
    Completed,
    /// Mint failed (error_message set)
    Failed,
}

impl EditionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EditionStatus::Completed | EditionStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EditionStatus::Pending => "pending",
            EditionStatus::Processing => "processing",
            EditionStatus::Completed => "completed",
            EditionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(EditionStatus::Pending),
            "processing" => Some(EditionStatus::Processing),
            "completed" => Some(EditionStatus::Completed),
            "failed" => Some(EditionStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for EditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verification status of a claim's proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Proof generated, not yet anchored on the ledger
    Pending,
    /// Verification transaction confirmed successfully
    Verified,
    /// Generation or verification failed
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(VerificationStatus::Pending),
            "verified" => Some(VerificationStatus::Verified),
            "failed" => Some(VerificationStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration state of a signing device on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    NotRegistered,
    RegisteredInactive,
    RegisteredActive,
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceState::NotRegistered => write!(f, "not_registered"),
            DeviceState::RegisteredInactive => write!(f, "registered_inactive"),
            DeviceState::RegisteredActive => write!(f, "registered_active"),
        }
    }
}

fn wallet_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^0x[0-9a-fA-F]{40}$").unwrap())
}

/// Check that a wallet address is a 0x-prefixed 20-byte hex string
pub fn is_valid_wallet_address(address: &str) -> bool {
    wallet_regex().is_match(address)
}

/// Generate a fresh claim identifier (32 hex chars)
pub fn generate_claim_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}
