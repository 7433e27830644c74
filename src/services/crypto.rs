//! Small cryptographic helpers shared by the account, two-factor and
//! integration flows.
//!
//! - [`SecretBox`]: AES-256-GCM encryption of secrets at rest
//! - [`sha256_hex`]: one-way digests for backup codes
//! - [`sign`] / [`verify_signature`]: HMAC-SHA256 over short payloads
//! - [`constant_time_eq`]: comparison for caller-supplied secrets

use aes_gcm::{Aes256Gcm, KeyInit, Nonce, aead::Aead};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key material")]
    InvalidKey,

    #[error("encryption failed")]
    Encrypt,

    /// Bad base64, truncated input, wrong key or tampered ciphertext.
    #[error("decryption failed")]
    Decrypt,
}

impl From<CryptoError> for crate::error::AppError {
    fn from(err: CryptoError) -> Self {
        crate::error::AppError::Internal(err.to_string())
    }
}

/// Authenticated encryption for secrets stored in the database.
///
/// # Format
///
/// `base64(nonce || ciphertext)` where the nonce is 12 fresh random bytes
/// per call. The 32-byte key is the SHA-256 of the configured key material,
/// so any passphrase length works.
#[derive(Clone)]
pub struct SecretBox {
    cipher: Aes256Gcm,
}

impl SecretBox {
    pub fn new(key_material: &str) -> Result<Self, CryptoError> {
        let key = Sha256::digest(key_material.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend(ciphertext);
        Ok(STANDARD.encode(combined))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        let combined = STANDARD.decode(encoded).map_err(|_| CryptoError::Decrypt)?;
        if combined.len() < NONCE_LEN {
            return Err(CryptoError::Decrypt);
        }
        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
    }
}

/// Lower-case hex SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Hex HMAC-SHA256 of `payload` under `secret`.
pub fn sign(secret: &str, payload: &str) -> String {
    // HMAC accepts keys of any length, new_from_slice cannot fail here.
    let mut mac = match <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Check a hex signature produced by [`sign`], in constant time.
pub fn verify_signature(secret: &str, payload: &str, signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).is_ok()
}

/// Comparison whose running time does not depend on where the inputs
/// first differ. Slices of different lengths are unequal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
