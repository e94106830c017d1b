//! Remote signing service client
//!
//! `POST {url}/sign` with `{"digest": "0x…"}` returns `{"signature": "0x…"}`.
//! The returned signature must recover to the configured validator address;
//! anything else is treated as a signer fault.

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::ValidatorSigner;
use crate::error::RelayError;

#[derive(Debug, Serialize)]
struct SignRequest {
    digest: String,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    signature: String,
}

#[derive(Debug, Clone)]
pub struct RemoteSigner {
    address: Address,
    url: String,
    client: reqwest::Client,
}

impl RemoteSigner {
    pub fn new(address: Address, url: impl Into<String>, timeout: Duration) -> eyre::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            address,
            url: url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn map_http_error(error: reqwest::Error) -> RelayError {
    if error.is_timeout() {
        RelayError::Signer(format!("timeout: {error}"))
    } else if error.is_connect() {
        RelayError::Signer(format!("connection failed: {error}"))
    } else {
        RelayError::Signer(error.to_string())
    }
}

#[async_trait]
impl ValidatorSigner for RemoteSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_digest(&self, digest: B256) -> Result<Bytes, RelayError> {
        let request = SignRequest {
            digest: format!("0x{}", hex::encode(digest.as_slice())),
        };

        let response = self
            .client
            .post(format!("{}/sign", self.url))
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?
            .error_for_status()
            .map_err(map_http_error)?
            .json::<SignResponse>()
            .await
            .map_err(map_http_error)?;

        let raw = response
            .signature
            .strip_prefix("0x")
            .unwrap_or(&response.signature);
        let signature = Bytes::from(
            hex::decode(raw).map_err(|e| RelayError::Signer(format!("invalid signature hex: {e}")))?,
        );

        let recovered = bridge_core::recover_signer(&digest, &signature)
            .map_err(|e| RelayError::Signer(format!("invalid signature from {}: {e}", self.url)))?;
        if recovered != self.address {
            return Err(RelayError::Signer(format!(
                "remote signer {} returned a signature by {recovered}, expected {}",
                self.url, self.address
            )));
        }

        debug!(signer = %self.address, url = %self.url, "Remote signature received");
        Ok(signature)
    }
}
