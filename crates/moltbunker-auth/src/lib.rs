//! # Moltbunker Auth
//!
//! Authentication for the Moltbunker SDK.
//!
//! - [`WalletSigner`] - secp256k1 key, EIP-55 address, personal-message signatures
//! - [`AuthStrategy`] - request headers for API key or wallet callers
//! - [`ChallengeSigner`] - one-time exec challenge fetch + signature
//!
//! ```rust,ignore
//! let signer = WalletSigner::from_hex("ac0974...")?;
//! let challenges = ChallengeSigner::new("https://api.moltbunker.com/v1", Arc::new(signer), timeout)?;
//! let signed = challenges.obtain_and_sign("mb-abc123", "wt_token").await?;
//! ```

mod challenge;
mod error;
mod strategy;
mod wallet;

pub use challenge::{Challenge, ChallengeSigner, SignedChallenge, obtain_and_sign};
pub use error::AuthError;
pub use strategy::{ApiKeyAuth, AuthStrategy, WalletAuth, auth_from_config, auth_from_env};
pub use wallet::{
    MessageSigner, WalletSigner, hash_personal_message, normalize_private_key, recover_address,
};
