//! Session token codec: authenticated encryption of the identity claim.
//!
//! Tokens are `base64url(nonce || ciphertext)` where the ciphertext is the
//! serialized [`Claim`] sealed with `ChaCha20-Poly1305`. The key is derived
//! from the administrative secret, so tokens minted by one deployment never
//! decrypt under another secret.

use anyhow::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::auth::claim::Claim;

const NONCE_LEN: usize = 12;

// AAD = "session-claim:v1"; bump on claim layout changes.
const CLAIM_AAD: &[u8] = b"session-claim:v1";

/// The token could not be decrypted: malformed, tampered with, or sealed
/// under a different key. Callers treat this as "not authenticated".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidToken;

impl fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid session token")
    }
}

impl std::error::Error for InvalidToken {}

/// Derives the 32-byte cipher key from the administrative secret.
#[must_use]
pub fn derive_key(secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}

/// Seals `claim` into an opaque token.
///
/// # Errors
/// Returns an error if serialization or encryption fails.
pub fn encrypt_claim(key: &[u8; 32], claim: &Claim) -> Result<String> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let plaintext = serde_json::to_vec(claim)?;
    let payload = Payload {
        msg: &plaintext,
        aad: CLAIM_AAD,
    };

    let ciphertext = cipher
        .encrypt(nonce, payload)
        .map_err(|e| anyhow::anyhow!("Encryption failure: {e}"))?;

    let mut token = Vec::with_capacity(nonce_bytes.len() + ciphertext.len());
    token.extend_from_slice(&nonce_bytes);
    token.extend_from_slice(&ciphertext);

    Ok(URL_SAFE_NO_PAD.encode(token))
}

/// Opens a token back into its claim.
///
/// # Errors
/// Returns [`InvalidToken`] when the token is malformed, was sealed under
/// a different key, or fails authentication. Never panics on hostile
/// input.
pub fn decrypt_claim(key: &[u8; 32], token: &str) -> Result<Claim, InvalidToken> {
    let data = URL_SAFE_NO_PAD.decode(token).map_err(|_| InvalidToken)?;
    if data.len() < NONCE_LEN {
        return Err(InvalidToken);
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let payload = Payload {
        msg: ciphertext,
        aad: CLAIM_AAD,
    };

    let plaintext = cipher.decrypt(nonce, payload).map_err(|_| InvalidToken)?;
    serde_json::from_slice(&plaintext).map_err(|_| InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user_claim() -> Claim {
        Claim::User {
            user_id: Uuid::new_v4(),
            dom_name: "alice".to_string(),
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_encrypt_decrypt_roundtrip() {
        let key = derive_key("secret");
        let claim = user_claim();

        let token = encrypt_claim(&key, &claim).unwrap();
        let decrypted = decrypt_claim(&key, &token).unwrap();
        assert_eq!(decrypted, claim);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_decrypt_fails_wrong_key() {
        let claim = user_claim();
        let token = encrypt_claim(&derive_key("secret"), &claim).unwrap();

        let result = decrypt_claim(&derive_key("other"), &token);
        assert_eq!(result, Err(InvalidToken));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_decrypt_fails_tampered_ciphertext() {
        let key = derive_key("secret");
        let token = encrypt_claim(&key, &user_claim()).unwrap();

        let mut raw = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let len = raw.len();
        if let Some(byte) = raw.get_mut(len - 1) {
            *byte ^= 0xFF;
        }
        let tampered = URL_SAFE_NO_PAD.encode(raw);

        assert_eq!(decrypt_claim(&key, &tampered), Err(InvalidToken));
    }

    #[test]
    fn test_decrypt_fails_malformed() {
        let key = derive_key("secret");
        assert_eq!(decrypt_claim(&key, ""), Err(InvalidToken));
        assert_eq!(decrypt_claim(&key, "%%%not-base64%%%"), Err(InvalidToken));
        // Valid base64 but shorter than a nonce.
        assert_eq!(decrypt_claim(&key, "AAAA"), Err(InvalidToken));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_key_derivation_stable() {
        assert_eq!(derive_key("secret"), derive_key("secret"));
        assert_ne!(derive_key("secret"), derive_key("other"));
    }
}
