//! Claim coordinator HTTP service
//!
//! The public face of the system: phones hit it from QR codes, the device
//! backend hits it over the trusted paths. All state lives in its own
//! SQLite file; it never talks to the ledger or storage gateways itself.

pub mod error;
pub mod handlers;
pub mod metadata;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::config::CoordinatorConfig;
use crate::storage::{ClaimStore, StoreError};

pub use error::ApiError;
pub use handlers::AppState;

/// Build the coordinator router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/claims", post(handlers::create_claim))
        .route("/api/claims/check", get(handlers::check_claim))
        .route("/api/claims/{claim_id}/submit", post(handlers::submit_claim))
        .route("/api/claims/status", post(handlers::update_claim_status))
        .route("/api/editions/pending", get(handlers::pending_editions))
        .route("/api/editions/update", post(handlers::update_edition))
        .route("/api/proofs/status", post(handlers::update_proof_status))
        .route("/api/metadata/{claim_id}", get(handlers::claim_metadata))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Open the store and serve the coordinator API until shutdown
pub async fn run_server(config: &CoordinatorConfig) -> Result<(), CoordinatorError> {
    let store = ClaimStore::new(&config.data_dir)?;
    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        public_base_url: config.public_base_url.clone(),
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    log::info!("✓ Coordinator listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Coordinator service errors
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
