//! Asset storage gateway client
//!
//! Uploads captured assets to the pinning service and returns the content
//! identifier. Uploads are retried up to 3 times with linear backoff;
//! every other provider call in the system is single-shot.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{AssetStore, ProviderError};

const UPLOAD_ATTEMPTS: u32 = 3;
const BACKOFF_STEP: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: bool,
    cid: Option<String>,
    error: Option<String>,
}

/// Reqwest-backed storage gateway client
pub struct HttpAssetStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAssetStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn upload_once(&self, filename: &str, bytes: &[u8]) -> Result<String, ProviderError> {
        let resp: UploadResponse = self
            .client
            .post(format!("{}/upload", self.base_url))
            .query(&[("filename", filename)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await?
            .json()
            .await?;

        if !resp.success {
            return Err(ProviderError::Service(
                resp.error.unwrap_or_else(|| "upload failed".to_string()),
            ));
        }
        resp.cid
            .ok_or_else(|| ProviderError::InvalidResponse("missing cid".to_string()))
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<String, ProviderError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.upload_once(filename, bytes).await {
                Ok(cid) => {
                    log::info!("✓ Uploaded {} ({} bytes) -> {}", filename, bytes.len(), cid);
                    return Ok(cid);
                }
                Err(e) if attempt < UPLOAD_ATTEMPTS => {
                    log::warn!(
                        "Upload attempt {}/{} for {} failed: {}",
                        attempt,
                        UPLOAD_ATTEMPTS,
                        filename,
                        e
                    );
                    // Linear backoff: 2s, 4s
                    tokio::time::sleep(BACKOFF_STEP * attempt).await;
                }
                Err(e) => {
                    log::error!("Upload of {} failed after {} attempts", filename, attempt);
                    return Err(e);
                }
            }
        }
    }
}
