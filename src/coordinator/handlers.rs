//! Request handlers for the coordinator API

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::coordinator::error::ApiError;
use crate::coordinator::metadata::{build_metadata, MetadataDocument};
use crate::storage::{ClaimStore, EditionUpdate, NewClaim, PendingEdition};
use crate::types::{
    generate_claim_id, is_valid_wallet_address, ClaimStatus, EditionStatus, VerificationStatus,
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<ClaimStore>>,
    /// Base URL advertised in claim links (what ends up in the QR code)
    pub public_base_url: String,
}

// ============================================================================
// Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateClaimRequest {
    pub cid: String,
    /// Caller-supplied id; generated when absent
    pub claim_id: Option<String>,
    pub metadata_cid: Option<String>,
    pub device_id: Option<String>,
    pub camera_id: Option<String>,
    pub image_hash: Option<String>,
    pub signature: Option<String>,
    pub device_address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateClaimResponse {
    pub claim_id: String,
    pub claim_url: String,
    pub status: ClaimStatus,
}

/// POST /api/claims
pub async fn create_claim(
    State(state): State<AppState>,
    Json(req): Json<CreateClaimRequest>,
) -> Result<Json<CreateClaimResponse>, ApiError> {
    if req.cid.is_empty() {
        return Err(ApiError::Validation("cid must not be empty".to_string()));
    }

    let claim_id = req.claim_id.unwrap_or_else(generate_claim_id);

    let mut store = state.store.lock().await;
    let claim = store.create_claim(NewClaim {
        claim_id,
        cid: req.cid,
        metadata_cid: req.metadata_cid,
        device_id: req.device_id,
        camera_id: req.camera_id,
        image_hash: req.image_hash,
        signature: req.signature,
        device_address: req.device_address,
    })?;

    let claim_url = format!(
        "{}/claim/{}",
        state.public_base_url.trim_end_matches('/'),
        claim.claim_id
    );

    log::info!("✓ Claim {} registered", claim.claim_id);

    Ok(Json(CreateClaimResponse {
        claim_id: claim.claim_id,
        claim_url,
        status: claim.status,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckClaimQuery {
    pub claim_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckClaimResponse {
    pub claim_id: String,
    pub status: ClaimStatus,
    pub recipient_address: Option<String>,
    pub token_id: Option<u64>,
    pub cid: String,
    pub created_at: i64,
}

/// GET /api/claims/check?claim_id=...
pub async fn check_claim(
    State(state): State<AppState>,
    Query(query): Query<CheckClaimQuery>,
) -> Result<Json<CheckClaimResponse>, ApiError> {
    let store = state.store.lock().await;
    let claim = store.get_claim(&query.claim_id)?;

    Ok(Json(CheckClaimResponse {
        claim_id: claim.claim_id,
        status: claim.status,
        recipient_address: claim.recipient_address,
        token_id: claim.token_id,
        cid: claim.cid,
        created_at: claim.created_at,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitClaimRequest {
    pub wallet_address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitClaimResponse {
    pub request_id: i64,
    pub claim_id: String,
    pub status: EditionStatus,
}

/// POST /api/claims/{claim_id}/submit
///
/// The end user hands over a wallet; the claim must be open with a minted
/// original. Address format is checked before touching the store.
pub async fn submit_claim(
    State(state): State<AppState>,
    Path(claim_id): Path<String>,
    Json(req): Json<SubmitClaimRequest>,
) -> Result<Json<SubmitClaimResponse>, ApiError> {
    if !is_valid_wallet_address(&req.wallet_address) {
        return Err(ApiError::Validation(format!(
            "invalid wallet address: {}",
            req.wallet_address
        )));
    }

    let mut store = state.store.lock().await;
    let request = store.submit_edition(&claim_id, &req.wallet_address)?;

    let request_id = request
        .id
        .ok_or_else(|| ApiError::Internal("edition request missing id".to_string()))?;

    Ok(Json(SubmitClaimResponse {
        request_id,
        claim_id: request.claim_id,
        status: request.status,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateClaimStatusRequest {
    pub claim_id: String,
    pub status: ClaimStatus,
    pub token_id: Option<u64>,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateClaimStatusResponse {
    pub claim_id: String,
    pub status: ClaimStatus,
    pub token_id: Option<u64>,
}

/// POST /api/claims/status (trusted device-backend path)
pub async fn update_claim_status(
    State(state): State<AppState>,
    Json(req): Json<UpdateClaimStatusRequest>,
) -> Result<Json<UpdateClaimStatusResponse>, ApiError> {
    let mut store = state.store.lock().await;
    let claim = store.update_claim_status(
        &req.claim_id,
        req.status,
        req.token_id,
        req.tx_hash.as_deref(),
    )?;

    Ok(Json(UpdateClaimStatusResponse {
        claim_id: claim.claim_id,
        status: claim.status,
        token_id: claim.token_id,
    }))
}

// ============================================================================
// Editions
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingEditionsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingEditionsResponse {
    pub editions: Vec<PendingEdition>,
}

/// GET /api/editions/pending?limit=N
pub async fn pending_editions(
    State(state): State<AppState>,
    Query(query): Query<PendingEditionsQuery>,
) -> Result<Json<PendingEditionsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(10).min(100);

    let store = state.store.lock().await;
    let editions = store.pending_editions(limit)?;

    Ok(Json(PendingEditionsResponse { editions }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEditionRequest {
    pub request_id: i64,
    pub status: Option<EditionStatus>,
    pub tx_hash: Option<String>,
    pub token_id: Option<u64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEditionResponse {
    pub request_id: i64,
    pub claim_id: String,
    pub status: EditionStatus,
}

/// POST /api/editions/update (trusted device-backend path)
pub async fn update_edition(
    State(state): State<AppState>,
    Json(req): Json<UpdateEditionRequest>,
) -> Result<Json<UpdateEditionResponse>, ApiError> {
    let mut store = state.store.lock().await;
    let request = store.update_edition_request(
        req.request_id,
        EditionUpdate {
            status: req.status,
            tx_hash: req.tx_hash,
            token_id: req.token_id,
            error_message: req.error_message,
        },
    )?;

    Ok(Json(UpdateEditionResponse {
        request_id: req.request_id,
        claim_id: request.claim_id,
        status: request.status,
    }))
}

// ============================================================================
// Proofs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProofStatusRequest {
    pub claim_id: String,
    pub token_id: Option<u64>,
    pub verification_status: Option<VerificationStatus>,
    pub proof_tx_hash: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProofStatusResponse {
    pub claim_id: String,
    pub verification_status: VerificationStatus,
}

/// POST /api/proofs/status (trusted device-backend path, upsert)
pub async fn update_proof_status(
    State(state): State<AppState>,
    Json(req): Json<UpdateProofStatusRequest>,
) -> Result<Json<UpdateProofStatusResponse>, ApiError> {
    let mut store = state.store.lock().await;
    let proof = store.upsert_proof_status(
        &req.claim_id,
        req.token_id,
        req.verification_status,
        req.proof_tx_hash.as_deref(),
    )?;

    Ok(Json(UpdateProofStatusResponse {
        claim_id: proof.claim_id,
        verification_status: proof.verification_status,
    }))
}

// ============================================================================
// Metadata / health
// ============================================================================

/// GET /api/metadata/{claim_id}
pub async fn claim_metadata(
    State(state): State<AppState>,
    Path(claim_id): Path<String>,
) -> Result<Json<MetadataDocument>, ApiError> {
    let store = state.store.lock().await;
    let claim = store.get_claim(&claim_id)?;

    Ok(Json(build_metadata(&claim)))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "shutter-mint-coordinator",
    })
}
