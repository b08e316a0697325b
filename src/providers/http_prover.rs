//! Proving service client
//!
//! Asks the external prover to attest the claim's metadata document and
//! returns the compressed proof plus the encoded journal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ProofBundle, Prover, ProviderError};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    url: &'a str,
    method: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    success: bool,
    #[serde(rename = "zkProof")]
    zk_proof: Option<String>,
    #[serde(rename = "journalData")]
    journal_data: Option<String>,
    error: Option<String>,
}

/// Reqwest-backed proving service client
pub struct HttpProver {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProver {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Prover for HttpProver {
    async fn generate(&self, metadata_url: &str) -> Result<ProofBundle, ProviderError> {
        log::info!("Requesting proof for {}", metadata_url);

        let resp: GenerateResponse = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&GenerateRequest {
                url: metadata_url,
                method: "GET",
            })
            .send()
            .await?
            .json()
            .await?;

        if !resp.success {
            return Err(ProviderError::Service(
                resp.error
                    .unwrap_or_else(|| "proof generation failed".to_string()),
            ));
        }

        match (resp.zk_proof, resp.journal_data) {
            (Some(zk_proof), Some(journal_data)) => Ok(ProofBundle {
                zk_proof,
                journal_data,
            }),
            _ => Err(ProviderError::InvalidResponse(
                "missing proof or journal".to_string(),
            )),
        }
    }
}
