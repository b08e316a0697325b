//! HTTP client for the claim coordinator
//!
//! The device backend never touches the coordinator's database; every
//! interaction goes over this client. Error bodies are surfaced verbatim
//! so operators can see the coordinator's `code` field in the logs.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::coordinator::handlers::{
    CheckClaimResponse, CreateClaimRequest, CreateClaimResponse, PendingEditionsResponse,
    UpdateClaimStatusRequest, UpdateClaimStatusResponse, UpdateEditionRequest,
    UpdateEditionResponse, UpdateProofStatusRequest, UpdateProofStatusResponse,
};
use crate::storage::PendingEdition;

/// Coordinator client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Coordinator rejected request ({status}): {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Client for the coordinator API
#[derive(Clone)]
pub struct CoordinatorClient {
    base_url: String,
    client: reqwest::Client,
}

impl CoordinatorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Public metadata URL for a claim, as served by the coordinator
    pub fn metadata_url(&self, claim_id: &str) -> String {
        format!("{}/api/metadata/{}", self.base_url, claim_id)
    }

    /// Register a freshly captured asset as a pending claim
    pub async fn create_claim(
        &self,
        req: &CreateClaimRequest,
    ) -> Result<CreateClaimResponse, ClientError> {
        self.post("/api/claims", req).await
    }

    /// Look up a claim's current status
    pub async fn check_claim(&self, claim_id: &str) -> Result<CheckClaimResponse, ClientError> {
        let url = format!("{}/api/claims/check?claim_id={}", self.base_url, claim_id);
        let resp = self.client.get(&url).send().await?;
        Self::read(resp).await
    }

    /// Overwrite a claim's status (trusted path)
    pub async fn update_claim_status(
        &self,
        req: &UpdateClaimStatusRequest,
    ) -> Result<UpdateClaimStatusResponse, ClientError> {
        self.post("/api/claims/status", req).await
    }

    /// Fetch the next batch of pending edition requests
    pub async fn pending_editions(&self, limit: u32) -> Result<Vec<PendingEdition>, ClientError> {
        let url = format!("{}/api/editions/pending?limit={}", self.base_url, limit);
        let resp = self.client.get(&url).send().await?;
        let body: PendingEditionsResponse = Self::read(resp).await?;
        Ok(body.editions)
    }

    /// Report the outcome of an edition request
    pub async fn update_edition(
        &self,
        req: &UpdateEditionRequest,
    ) -> Result<UpdateEditionResponse, ClientError> {
        self.post("/api/editions/update", req).await
    }

    /// Mirror a proof's verification status to the coordinator
    pub async fn update_proof_status(
        &self,
        req: &UpdateProofStatusRequest,
    ) -> Result<UpdateProofStatusResponse, ClientError> {
        self.post("/api/proofs/status", req).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.post(&url).json(body).send().await?;
        Self::read(resp).await
    }

    async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Rejected { status, body });
        }
        Ok(resp.json().await?)
    }
}
