//! shutter-mint: claim coordination for camera-attested NFT captures
//!
//! Two services share this crate. The claim coordinator is a public HTTP
//! API owning the claim lifecycle (pending → open → claimed → completed).
//! The device backend runs next to the capture hardware: it uploads
//! assets, mints originals, polls for edition requests, and drives proof
//! generation and verification. Each service keeps its own SQLite
//! database; the coordinator's is the authoritative claim record.

pub mod config;
pub mod coordinator;
pub mod device;
pub mod providers;
pub mod storage;
pub mod types;
