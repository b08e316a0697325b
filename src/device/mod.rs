//! Device-side backend
//!
//! Everything that runs next to the camera: registration, the mint
//! orchestrator, the edition poller, and proof pipelines. Talks to the
//! coordinator over HTTP and to the provider gateways through the trait
//! seams; keeps its own local database.

pub mod client;
pub mod editions;
pub mod orchestrator;
pub mod proofs;
pub mod registrar;

pub use client::{ClientError, CoordinatorClient};
pub use editions::{EditionOutcome, EditionProcessor};
pub use orchestrator::{DeviceIdentity, MintOrchestrator, MintOutcome};
pub use proofs::ProofPipeline;
pub use registrar::DeviceRegistrar;
