use std::fmt::{self, Debug};

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm,
    Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use thiserror::Error;

use crate::Secret;

/// Version marker prepended to every token so the key or algorithm can be rotated later
/// without guessing which scheme produced a stored value.
const TOKEN_PREFIX: &str = "v1:";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, Error)]
pub enum CipherError {
    #[error("Encryption key must be exactly {KEY_LEN} bytes")]
    InvalidKeyLength,
    #[error("Ciphertext is malformed: {0}")]
    MalformedToken(String),
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed. The token was tampered with or encrypted under a different key")]
    DecryptionFailed,
}

/// Field-level encryption for sensitive values (verification document numbers).
///
/// AES-256-GCM with a random 96-bit nonce per value. Tokens are `v1:` followed by the
/// base64-encoded nonce-and-ciphertext blob, so a stored token is self-contained apart from
/// the key.
#[derive(Clone)]
pub struct FieldCipher {
    key: Secret<[u8; KEY_LEN]>,
}

impl Debug for FieldCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldCipher({:?})", self.key)
    }
}

impl FieldCipher {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key: Secret::new(key) }
    }

    pub fn from_slice(key: &[u8]) -> Result<Self, CipherError> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| CipherError::InvalidKeyLength)?;
        Ok(Self::new(key))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let cipher = Aes256Gcm::new_from_slice(self.key.reveal()).map_err(|_| CipherError::InvalidKeyLength)?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;
        let mut blob = nonce_bytes.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(format!("{TOKEN_PREFIX}{}", BASE64.encode(blob)))
    }

    pub fn decrypt(&self, token: &str) -> Result<String, CipherError> {
        let encoded = token
            .strip_prefix(TOKEN_PREFIX)
            .ok_or_else(|| CipherError::MalformedToken("missing version prefix".to_string()))?;
        let blob = BASE64
            .decode(encoded)
            .map_err(|e| CipherError::MalformedToken(e.to_string()))?;
        if blob.len() <= NONCE_LEN {
            return Err(CipherError::MalformedToken("token too short".to_string()));
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new_from_slice(self.key.reveal()).map_err(|_| CipherError::InvalidKeyLength)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)?;
        String::from_utf8(plaintext).map_err(|e| CipherError::MalformedToken(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cipher() -> FieldCipher {
        FieldCipher::new([7u8; 32])
    }

    #[test]
    fn round_trip() {
        let token = cipher().encrypt("12.345.678/0001-95").unwrap();
        assert!(token.starts_with("v1:"));
        assert_eq!(cipher().decrypt(&token).unwrap(), "12.345.678/0001-95");
    }

    #[test]
    fn tokens_are_randomised() {
        let a = cipher().encrypt("same value").unwrap();
        let b = cipher().encrypt("same value").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tampering_is_detected() {
        let token = cipher().encrypt("original").unwrap();
        let mut blob = BASE64.decode(token.strip_prefix("v1:").unwrap()).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        let tampered = format!("v1:{}", BASE64.encode(blob));
        assert!(matches!(cipher().decrypt(&tampered), Err(CipherError::DecryptionFailed)));
    }

    #[test]
    fn wrong_key_fails() {
        let token = cipher().encrypt("secret").unwrap();
        let other = FieldCipher::new([9u8; 32]);
        assert!(matches!(other.decrypt(&token), Err(CipherError::DecryptionFailed)));
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(matches!(cipher().decrypt("no prefix"), Err(CipherError::MalformedToken(_))));
        assert!(matches!(cipher().decrypt("v1:!!!"), Err(CipherError::MalformedToken(_))));
        assert!(matches!(cipher().decrypt("v1:AAAA"), Err(CipherError::MalformedToken(_))));
    }

    #[test]
    fn key_length_is_enforced() {
        assert!(matches!(FieldCipher::from_slice(&[1u8; 16]), Err(CipherError::InvalidKeyLength)));
        assert!(FieldCipher::from_slice(&[1u8; 32]).is_ok());
    }
}
