//! Storage layer
//!
//! SQLite persistence for the claim lifecycle. Both services open their
//! own database; the schema is shared, the files are not.

pub mod claim_store;
pub mod models;

pub use claim_store::{ClaimStore, StoreError};
pub use models::{
    ClaimRecord, DeviceRecord, EditionRequest, EditionUpdate, NewClaim, PendingEdition,
    ProofRecord,
};
