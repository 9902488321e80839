//! secp256k1 wallet signing.
//!
//! Signatures follow the Ethereum personal-message convention: the message
//! is prefixed with `"\x19Ethereum Signed Message:\n" + len`, hashed with
//! Keccak-256, and signed. The output is `0x` followed by `r || s || v`
//! hex-encoded, with `v` in `{27, 28}`.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

use crate::error::AuthError;

const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";
const SIGNATURE_LEN: usize = 65;

/// Produces wallet signatures over arbitrary messages.
pub trait MessageSigner: Send + Sync {
    /// EIP-55 checksummed address of the signing key.
    fn address(&self) -> &str;

    /// Sign `message` and return the `0x`-prefixed hex signature.
    fn sign_message(&self, message: &[u8]) -> Result<String, AuthError>;
}

/// Wallet backed by an in-memory secp256k1 private key.
#[derive(Clone)]
pub struct WalletSigner {
    key: SigningKey,
    address: String,
}

impl WalletSigner {
    /// Parse a hex private key, with or without the `0x` prefix.
    pub fn from_hex(private_key: &str) -> Result<Self, AuthError> {
        let normalized = normalize_private_key(private_key)?;
        let bytes = hex::decode(&normalized[2..])
            .map_err(|e| AuthError::InvalidKey(format!("not hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(AuthError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(&bytes)
            .map_err(|_| AuthError::InvalidKey("not a valid secp256k1 scalar".to_string()))?;
        let address = address_of(key.verifying_key());
        Ok(Self { key, address })
    }
}

impl MessageSigner for WalletSigner {
    fn address(&self) -> &str {
        &self.address
    }

    fn sign_message(&self, message: &[u8]) -> Result<String, AuthError> {
        let digest = hash_personal_message(message);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        let mut out = Vec::with_capacity(SIGNATURE_LEN);
        out.extend_from_slice(&signature.to_bytes());
        out.push(27 + recovery_id.to_byte());
        Ok(format!("0x{}", hex::encode(out)))
    }
}

impl fmt::Debug for WalletSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Trim and ensure the `0x` prefix. Empty keys are rejected.
pub fn normalize_private_key(private_key: &str) -> Result<String, AuthError> {
    let trimmed = private_key.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(AuthError::InvalidKey(
            "private key cannot be empty".to_string(),
        ));
    }
    Ok(format!("0x{}", digits))
}

/// Keccak-256 of the personal-message encoding of `message`.
pub fn hash_personal_message(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Recover the checksummed signer address from a personal-message signature.
///
/// Accepts `v` as either `{27, 28}` or `{0, 1}`.
pub fn recover_address(message: &[u8], signature: &str) -> Result<String, AuthError> {
    let hex_part = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(hex_part).map_err(|e| AuthError::InvalidSignature(e.to_string()))?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(AuthError::InvalidSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LEN,
            bytes.len()
        )));
    }

    let sig = Signature::from_slice(&bytes[..64])
        .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;
    let v = bytes[64];
    let recovery_id = RecoveryId::from_byte(if v >= 27 { v - 27 } else { v })
        .ok_or_else(|| AuthError::InvalidSignature(format!("bad recovery byte {}", v)))?;

    let digest = hash_personal_message(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
        .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;
    Ok(address_of(&key))
}

fn address_of(key: &VerifyingKey) -> String {
    let point = key.as_affine().to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    to_checksum_address(&hash[12..])
}

/// EIP-55 mixed-case encoding of a 20-byte address.
fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[path = "wallet_tests.rs"]
mod tests;
