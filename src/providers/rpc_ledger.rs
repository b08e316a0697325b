//! Ledger gateway client
//!
//! Talks to the wallet gateway service that holds the device signing key,
//! builds the contract calls, and waits for confirmation before
//! responding. Errors come back with a symbolic revert reason when the
//! gateway could decode one, otherwise as opaque data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{DeviceRegistration, Ledger, LedgerError, ProofBundle, TxReceipt};

/// Gateway wire response for transaction endpoints
#[derive(Debug, Deserialize)]
struct TxResponse {
    success: bool,
    #[serde(rename = "txHash")]
    tx_hash: Option<String>,
    #[serde(rename = "tokenId")]
    token_id: Option<u64>,
    #[serde(rename = "gasUsed")]
    gas_used: Option<u64>,
    error: Option<String>,
    #[serde(rename = "revertReason")]
    revert_reason: Option<String>,
    #[serde(rename = "revertData")]
    revert_data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceStatusResponse {
    registered: bool,
    active: bool,
}

#[derive(Debug, Deserialize)]
struct GasResponse {
    gas: u64,
}

#[derive(Debug, Serialize)]
struct MintOriginalRequest<'a> {
    to: &'a str,
    #[serde(rename = "metadataUrl")]
    metadata_url: &'a str,
}

#[derive(Debug, Serialize)]
struct MintEditionRequest<'a> {
    to: &'a str,
    #[serde(rename = "originalTokenId")]
    original_token_id: u64,
    #[serde(rename = "idempotencyKey")]
    idempotency_key: &'a str,
}

#[derive(Debug, Serialize)]
struct SubmitProofRequest<'a> {
    #[serde(rename = "tokenId")]
    token_id: u64,
    #[serde(rename = "zkProof")]
    zk_proof: &'a str,
    #[serde(rename = "journalData")]
    journal_data: &'a str,
}

/// Reqwest-backed ledger gateway client
pub struct RpcLedger {
    base_url: String,
    client: reqwest::Client,
}

impl RpcLedger {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a gateway transaction response into a receipt or error
    ///
    /// Never echoes raw transaction payloads into the error text, only
    /// hashes and symbolic reasons.
    fn into_receipt(resp: TxResponse) -> Result<TxReceipt, LedgerError> {
        if resp.revert_reason.is_some() || resp.revert_data.is_some() {
            return Err(LedgerError::Revert {
                reason: resp.revert_reason,
                data: resp.revert_data,
            });
        }
        if !resp.success {
            return Err(LedgerError::Service(
                resp.error.unwrap_or_else(|| "transaction failed".to_string()),
            ));
        }
        let tx_hash = resp
            .tx_hash
            .ok_or_else(|| LedgerError::InvalidResponse("missing txHash".to_string()))?;
        Ok(TxReceipt {
            tx_hash,
            token_id: resp.token_id,
            success: true,
            gas_used: resp.gas_used,
        })
    }

    async fn post_tx<B: Serialize>(&self, path: &str, body: &B) -> Result<TxReceipt, LedgerError> {
        let resp: TxResponse = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        Self::into_receipt(resp)
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn mint_original(
        &self,
        to: &str,
        metadata_url: &str,
    ) -> Result<TxReceipt, LedgerError> {
        log::info!("Minting original to {}", to);
        self.post_tx("/mint", &MintOriginalRequest { to, metadata_url })
            .await
    }

    async fn mint_edition(
        &self,
        to: &str,
        original_token_id: u64,
        idempotency_key: &str,
    ) -> Result<TxReceipt, LedgerError> {
        log::info!(
            "Minting edition of token {} to {} (key={})",
            original_token_id,
            to,
            idempotency_key
        );
        self.post_tx(
            "/mint-edition",
            &MintEditionRequest {
                to,
                original_token_id,
                idempotency_key,
            },
        )
        .await
    }

    async fn is_device_registered(&self, device_address: &str) -> Result<bool, LedgerError> {
        let status: DeviceStatusResponse = self
            .client
            .get(self.url(&format!("/device/{}/status", device_address)))
            .send()
            .await?
            .json()
            .await?;
        Ok(status.registered)
    }

    async fn is_device_active(&self, device_address: &str) -> Result<bool, LedgerError> {
        let status: DeviceStatusResponse = self
            .client
            .get(self.url(&format!("/device/{}/status", device_address)))
            .send()
            .await?
            .json()
            .await?;
        Ok(status.registered && status.active)
    }

    async fn register_device(
        &self,
        registration: &DeviceRegistration,
    ) -> Result<TxReceipt, LedgerError> {
        log::info!("Registering device {}", registration.device_address);
        self.post_tx("/device/register", registration).await
    }

    async fn activate_device(&self, device_address: &str) -> Result<TxReceipt, LedgerError> {
        log::info!("Activating device {}", device_address);
        self.post_tx(
            "/device/activate",
            &serde_json::json!({ "deviceAddress": device_address }),
        )
        .await
    }

    async fn estimate_proof_gas(
        &self,
        token_id: u64,
        proof: &ProofBundle,
    ) -> Result<u64, LedgerError> {
        let resp: GasResponse = self
            .client
            .post(self.url("/proof/estimate-gas"))
            .json(&SubmitProofRequest {
                token_id,
                zk_proof: &proof.zk_proof,
                journal_data: &proof.journal_data,
            })
            .send()
            .await?
            .json()
            .await?;
        Ok(resp.gas)
    }

    async fn submit_proof(
        &self,
        token_id: u64,
        proof: &ProofBundle,
    ) -> Result<TxReceipt, LedgerError> {
        log::info!("Submitting proof for token {}", token_id);
        self.post_tx(
            "/proof/submit",
            &SubmitProofRequest {
                token_id,
                zk_proof: &proof.zk_proof,
                journal_data: &proof.journal_data,
            },
        )
        .await
    }
}
