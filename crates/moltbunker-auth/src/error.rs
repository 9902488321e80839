//! Authentication errors.

use thiserror::Error;

/// Authentication and signing errors.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Private key is empty, not hex, or not a valid secp256k1 scalar.
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// No usable credentials were supplied.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Challenge request failed at the network or HTTP level.
    #[error("Challenge fetch failed: {message}")]
    ChallengeFetch { status: Option<u16>, message: String },

    /// Server refused the presented credentials.
    #[error("Credentials rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// ECDSA signing failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Signature could not be parsed or recovered.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

impl AuthError {
    /// HTTP status that caused the failure, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::ChallengeFetch { status, .. } => *status,
            AuthError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::ChallengeFetch {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}
