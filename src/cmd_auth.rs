//! Credential subcommands.

use anyhow::Context;
use moltbunker_auth::{MessageSigner, WalletSigner, auth_from_config};
use moltbunker_config::ClientConfig;

/// Print the wallet address and a personal-message signature.
pub(crate) fn sign(config: &ClientConfig, message: &str) -> anyhow::Result<()> {
    let private_key = config
        .auth
        .private_key
        .as_deref()
        .context("no private key configured (set MOLTBUNKER_PRIVATE_KEY)")?;
    let signer = WalletSigner::from_hex(private_key)?;
    let signature = signer.sign_message(message.as_bytes())?;

    println!("address:   {}", signer.address());
    println!("signature: {}", signature);
    Ok(())
}

/// Print the active auth strategy.
pub(crate) fn whoami(config: &ClientConfig) -> anyhow::Result<()> {
    let auth = auth_from_config(&config.auth)?;
    println!("{} {}", auth.auth_type(), auth.identifier());
    Ok(())
}
