//! Encrypted registration payload codec.
//!
//! Everything needed to finish creating an account (name, email, password
//! hash) travels inside the verification link itself, encrypted with
//! AES-256-GCM. A fresh 96-bit nonce is generated per token and prepended to
//! the ciphertext before base64url encoding, so encoding the same payload
//! twice yields different tokens. The AEAD tag doubles as the integrity
//! check: a token that decrypts is a token we produced.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationPayload {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl RegistrationPayload {
    /// A payload missing any field cannot be turned into an account.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.email.is_empty() && !self.password_hash.is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token is not valid base64")]
    InvalidEncoding,
    #[error("token is too short to hold a nonce and ciphertext")]
    Truncated,
    /// Authentication failed: the token was modified, truncated mid-cipher,
    /// or produced under a different key.
    #[error("token failed authentication")]
    Tampered,
    #[error("token contents are not a registration payload")]
    Malformed,
}

#[derive(Clone)]
pub struct PayloadCodec {
    cipher: Aes256Gcm,
}

impl PayloadCodec {
    /// Derive the AEAD key from the application secret. Rotating the secret
    /// invalidates every outstanding token.
    pub fn new(secret_key: &str) -> Self {
        let key = Sha256::digest(secret_key.as_bytes());
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    pub fn encode(&self, payload: &RegistrationPayload) -> anyhow::Result<String> {
        let plaintext = serde_json::to_vec(payload)?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng().fill(&mut nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_ref())
            .map_err(|_| anyhow::anyhow!("AES-GCM encryption failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    pub fn decode(&self, token: &str) -> Result<RegistrationPayload, DecodeError> {
        let sealed = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| DecodeError::InvalidEncoding)?;
        if sealed.len() <= NONCE_LEN {
            return Err(DecodeError::Truncated);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| DecodeError::Tampered)?;
        serde_json::from_slice(&plaintext).map_err(|_| DecodeError::Malformed)
    }
}
