//! Request authentication strategies.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use moltbunker_config::{AuthConfig, ENV_API_KEY, ENV_PRIVATE_KEY, ENV_WALLET_ADDRESS};
use tracing::debug;

use crate::error::AuthError;
use crate::wallet::{MessageSigner, WalletSigner};

/// Produces the headers that authenticate one API request.
pub trait AuthStrategy: Send + Sync {
    /// Headers to attach. Wallet strategies sign `message`, or a
    /// timestamped default when `None`.
    fn auth_headers(&self, message: Option<&str>) -> Result<Vec<(String, String)>, AuthError>;

    /// Short display form of the caller identity.
    fn identifier(&self) -> String;

    /// `"api_key"` or `"wallet"`.
    fn auth_type(&self) -> &'static str;

    /// Bearer token usable for WebSocket upgrades, if this strategy has one.
    fn bearer_token(&self) -> Option<&str> {
        None
    }
}

/// Static API key sent as a bearer token.
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: String,
}

impl ApiKeyAuth {
    pub fn new(api_key: impl Into<String>) -> Result<Self, AuthError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(AuthError::MissingCredentials(
                "API key cannot be empty".to_string(),
            ));
        }
        Ok(Self { api_key })
    }
}

impl AuthStrategy for ApiKeyAuth {
    fn auth_headers(&self, _message: Option<&str>) -> Result<Vec<(String, String)>, AuthError> {
        Ok(vec![(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        )])
    }

    fn identifier(&self) -> String {
        let visible = if self.api_key.chars().count() > 20 { 20 } else { 8 };
        let prefix: String = self.api_key.chars().take(visible).collect();
        format!("{}...", prefix)
    }

    fn auth_type(&self) -> &'static str {
        "api_key"
    }

    fn bearer_token(&self) -> Option<&str> {
        Some(&self.api_key)
    }
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("api_key", &self.identifier())
            .finish()
    }
}

/// Wallet signature over a per-request message.
#[derive(Clone)]
pub struct WalletAuth {
    signer: Arc<dyn MessageSigner>,
    address: String,
}

impl WalletAuth {
    /// Build from a hex private key. `wallet_address` overrides the derived address.
    pub fn new(private_key: &str, wallet_address: Option<String>) -> Result<Self, AuthError> {
        let signer = WalletSigner::from_hex(private_key)?;
        Ok(Self::with_signer(Arc::new(signer), wallet_address))
    }

    pub fn with_signer(signer: Arc<dyn MessageSigner>, wallet_address: Option<String>) -> Self {
        let address = wallet_address
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| signer.address().to_string());
        Self { signer, address }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn signer(&self) -> Arc<dyn MessageSigner> {
        Arc::clone(&self.signer)
    }

    fn default_message() -> String {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        format!("moltbunker-auth:{}", ts)
    }
}

impl AuthStrategy for WalletAuth {
    fn auth_headers(&self, message: Option<&str>) -> Result<Vec<(String, String)>, AuthError> {
        let message = message
            .map(str::to_string)
            .unwrap_or_else(Self::default_message);
        let signature = self.signer.sign_message(message.as_bytes())?;
        Ok(vec![
            ("X-Wallet-Address".to_string(), self.address.clone()),
            ("X-Wallet-Signature".to_string(), signature),
            ("X-Wallet-Message".to_string(), message),
        ])
    }

    fn identifier(&self) -> String {
        self.address.clone()
    }

    fn auth_type(&self) -> &'static str {
        "wallet"
    }
}

impl std::fmt::Debug for WalletAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletAuth")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Pick a strategy from `MOLTBUNKER_*` environment variables.
pub fn auth_from_env() -> Result<Box<dyn AuthStrategy>, AuthError> {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
    let config = AuthConfig {
        api_key: var(ENV_API_KEY),
        private_key: var(ENV_PRIVATE_KEY),
        wallet_address: var(ENV_WALLET_ADDRESS),
    };
    auth_from_config(&config)
}

/// Pick a strategy from configured credentials. An API key wins over a wallet.
pub fn auth_from_config(config: &AuthConfig) -> Result<Box<dyn AuthStrategy>, AuthError> {
    if let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
        debug!("Using API key authentication");
        return Ok(Box::new(ApiKeyAuth::new(api_key)?));
    }
    if let Some(private_key) = config.private_key.as_deref().filter(|k| !k.is_empty()) {
        debug!("Using wallet authentication");
        return Ok(Box::new(WalletAuth::new(
            private_key,
            config.wallet_address.clone(),
        )?));
    }
    Err(AuthError::MissingCredentials(format!(
        "set {} or {}",
        ENV_API_KEY, ENV_PRIVATE_KEY
    )))
}
