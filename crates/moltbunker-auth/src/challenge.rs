//! Exec challenge handshake.
//!
//! Before an exec WebSocket is opened the caller fetches a one-time nonce
//! from `GET {base}/exec/challenge?container_id=...` and signs it with the
//! wallet key. The nonce and signature travel on the upgrade URL.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header;
use serde::Deserialize;
use tracing::debug;

use crate::error::AuthError;
use crate::wallet::{MessageSigner, WalletSigner};

/// Challenge endpoint response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Challenge {
    #[serde(default)]
    pub nonce: Option<String>,
    /// Older servers send the text to sign as `message`.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl Challenge {
    /// The text to sign: `nonce`, falling back to `message`.
    pub fn text(&self) -> Option<&str> {
        self.nonce
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.message.as_deref().filter(|m| !m.is_empty()))
    }
}

/// A nonce together with its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedChallenge {
    pub nonce: String,
    pub signature: String,
}

/// Fetches and signs exec challenges.
pub struct ChallengeSigner {
    http: reqwest::Client,
    base_url: String,
    signer: Arc<dyn MessageSigner>,
}

impl ChallengeSigner {
    /// `timeout` bounds the whole challenge request.
    pub fn new(
        base_url: impl Into<String>,
        signer: Arc<dyn MessageSigner>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AuthError::from)?;
        Ok(Self::with_client(http, base_url, signer))
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        signer: Arc<dyn MessageSigner>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            signer,
        }
    }

    pub fn address(&self) -> &str {
        self.signer.address()
    }

    /// Request a challenge for `container_id`.
    pub async fn fetch(
        &self,
        container_id: &str,
        bearer_token: &str,
    ) -> Result<Challenge, AuthError> {
        let url = format!("{}/exec/challenge", self.base_url);
        debug!("Fetching exec challenge for {}", container_id);

        let response = self
            .http
            .get(&url)
            .query(&[("container_id", container_id)])
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::ChallengeFetch {
                status: Some(status.as_u16()),
                message: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        let body = response.text().await?;
        let challenge =
            serde_json::from_str::<Challenge>(&body).map_err(|e| AuthError::ChallengeFetch {
                status: Some(status.as_u16()),
                message: format!("invalid challenge body: {}", e),
            })?;
        if challenge.text().is_none() {
            return Err(missing_text(Some(status.as_u16())));
        }
        Ok(challenge)
    }

    /// Fetch a challenge and sign its nonce.
    pub async fn obtain_and_sign(
        &self,
        container_id: &str,
        bearer_token: &str,
    ) -> Result<SignedChallenge, AuthError> {
        let challenge = self.fetch(container_id, bearer_token).await?;
        let nonce = challenge.text().ok_or_else(|| missing_text(None))?.to_string();
        let signature = self.signer.sign_message(nonce.as_bytes())?;
        Ok(SignedChallenge { nonce, signature })
    }
}

fn missing_text(status: Option<u16>) -> AuthError {
    AuthError::ChallengeFetch {
        status,
        message: "challenge response has no nonce or message field".to_string(),
    }
}

/// One-shot challenge signing.
///
/// The private key is parsed before any network traffic, so a bad key
/// fails without contacting the server.
pub async fn obtain_and_sign(
    base_url: &str,
    container_id: &str,
    bearer_token: &str,
    private_key: &str,
    timeout: Duration,
) -> Result<SignedChallenge, AuthError> {
    let signer = WalletSigner::from_hex(private_key)?;
    ChallengeSigner::new(base_url, Arc::new(signer), timeout)?
        .obtain_and_sign(container_id, bearer_token)
        .await
}

#[cfg(test)]
#[path = "challenge_tests.rs"]
mod tests;
