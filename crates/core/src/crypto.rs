//! AES-256-GCM encryption utilities shared by the vault and the audit trail.
//!
//! Values are stored in the format `ENC[AES256-GCM,data:<b64>,iv:<b64>,tag:<b64>]`.
//! Decrypted values are returned as [`SecretString`] to prevent accidental
//! logging, and [`MasterKey`] zeroizes its bytes on drop.

use std::fmt;
use std::sync::LazyLock;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use regex::Regex;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub use secrecy::{ExposeSecret, SecretString};

static ENC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ENC\[AES256-GCM,data:([A-Za-z0-9+/=]+),iv:([A-Za-z0-9+/=]+),tag:([A-Za-z0-9+/=]+)\]$")
        .expect("ENC regex is valid")
});

/// A 32-byte AES-256 master key, zeroized on drop. Raw bytes never leave
/// this module; all operations go through the free functions below.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; 32]);

impl MasterKey {
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Errors from master-key parsing and AEAD operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid master key: {0}")]
    InvalidKey(String),

    #[error("invalid encrypted value: {0}")]
    InvalidFormat(String),

    #[error("decryption failed (wrong key or corrupted data)")]
    DecryptionFailed,

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}

/// Parse a 32-byte master key from 64 hex characters or base64. Absence or
/// malformed input at startup is fatal (spec §6: `vault_master_key` absence
/// is a fatal error) — callers should propagate this error up to process
/// exit rather than falling back to an unencrypted mode.
pub fn parse_master_key(raw: &str) -> Result<MasterKey, CryptoError> {
    let trimmed = raw.trim();
    if trimmed.len() == 64 {
        if let Ok(bytes) = hex::decode(trimmed) {
            if bytes.len() == 32 {
                let mut key = [0u8; 32];
                key.copy_from_slice(&bytes);
                return Ok(MasterKey(key));
            }
        }
    }
    if let Ok(bytes) = B64.decode(trimmed) {
        if bytes.len() == 32 {
            let mut key = [0u8; 32];
            key.copy_from_slice(&bytes);
            return Ok(MasterKey(key));
        }
    }
    Err(CryptoError::InvalidKey(
        "must be 32 bytes encoded as 64 hex chars or base64".to_owned(),
    ))
}

/// Returns `true` if `value` looks like an `ENC[AES256-GCM,...]` envelope.
#[must_use]
pub fn is_encrypted(value: &str) -> bool {
    ENC_RE.is_match(value.trim())
}

/// Decrypt an `ENC[...]` envelope. Non-envelope input passes through
/// unchanged, so data written before encryption was enabled upgrades
/// transparently.
pub fn decrypt_value(value: &str, master_key: &MasterKey) -> Result<SecretString, CryptoError> {
    let trimmed = value.trim();
    let Some(caps) = ENC_RE.captures(trimmed) else {
        return Ok(SecretString::new(value.to_owned()));
    };

    let data = B64
        .decode(&caps[1])
        .map_err(|e| CryptoError::InvalidFormat(format!("invalid base64 in data: {e}")))?;
    let iv = B64
        .decode(&caps[2])
        .map_err(|e| CryptoError::InvalidFormat(format!("invalid base64 in iv: {e}")))?;
    let tag = B64
        .decode(&caps[3])
        .map_err(|e| CryptoError::InvalidFormat(format!("invalid base64 in tag: {e}")))?;

    if iv.len() != 12 {
        return Err(CryptoError::InvalidFormat(format!(
            "IV must be 12 bytes, got {}",
            iv.len()
        )));
    }
    if tag.len() != 16 {
        return Err(CryptoError::InvalidFormat(format!(
            "tag must be 16 bytes, got {}",
            tag.len()
        )));
    }

    let mut ciphertext = data;
    ciphertext.extend_from_slice(&tag);

    let cipher = Aes256Gcm::new_from_slice(master_key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(format!("invalid AES key: {e}")))?;
    let nonce = Nonce::from_slice(&iv);

    let plaintext = cipher
        .decrypt(nonce, ciphertext.as_ref())
        .map_err(|_| CryptoError::DecryptionFailed)?;

    let s = String::from_utf8(plaintext)
        .map_err(|e| CryptoError::InvalidFormat(format!("decrypted value is not UTF-8: {e}")))?;

    Ok(SecretString::new(s))
}

/// Encrypt a plaintext string into an `ENC[AES256-GCM,...]` envelope.
pub fn encrypt_value(plaintext: &str, master_key: &MasterKey) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(master_key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(format!("invalid AES key: {e}")))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let (data, tag) = ciphertext.split_at(ciphertext.len() - 16);

    Ok(format!(
        "ENC[AES256-GCM,data:{},iv:{},tag:{}]",
        B64.encode(data),
        B64.encode(nonce.as_slice()),
        B64.encode(tag),
    ))
}

/// JSON-aware encryption helper used by the vault to seal credential bytes
/// and by the audit trail to seal action payloads before storage.
pub struct PayloadEncryptor {
    key: MasterKey,
}

impl PayloadEncryptor {
    #[must_use]
    pub fn new(key: MasterKey) -> Self {
        Self { key }
    }

    pub fn encrypt_json(&self, value: &serde_json::Value) -> Result<String, CryptoError> {
        let plain = serde_json::to_string(value)
            .map_err(|e| CryptoError::EncryptionFailed(format!("JSON serialization failed: {e}")))?;
        encrypt_value(&plain, &self.key)
    }

    pub fn decrypt_json(&self, value: &str) -> Result<serde_json::Value, CryptoError> {
        let plain = decrypt_value(value, &self.key)?;
        serde_json::from_str(plain.expose_secret())
            .map_err(|e| CryptoError::InvalidFormat(format!("JSON parse failed: {e}")))
    }

    pub fn encrypt_str(&self, value: &str) -> Result<String, CryptoError> {
        encrypt_value(value, &self.key)
    }

    pub fn decrypt_str(&self, value: &str) -> Result<String, CryptoError> {
        Ok(decrypt_value(value, &self.key)?.expose_secret().clone())
    }
}

impl fmt::Debug for PayloadEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PayloadEncryptor([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> MasterKey {
        parse_master_key(&"42".repeat(32)).unwrap()
    }

    #[test]
    fn roundtrip_encrypt_decrypt() {
        let key = test_key();
        let plaintext = "my-secret-value";
        let encrypted = encrypt_value(plaintext, &key).unwrap();
        assert!(encrypted.starts_with("ENC[AES256-GCM,"));
        let decrypted = decrypt_value(&encrypted, &key).unwrap();
        assert_eq!(decrypted.expose_secret(), plaintext);
    }

    #[test]
    fn non_envelope_passes_through() {
        let key = test_key();
        let decrypted = decrypt_value("plain-value", &key).unwrap();
        assert_eq!(decrypted.expose_secret(), "plain-value");
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let key = test_key();
        let other = parse_master_key(&"24".repeat(32)).unwrap();
        let encrypted = encrypt_value("secret", &key).unwrap();
        let result = decrypt_value(&encrypted, &other);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn parses_hex_and_base64_keys() {
        assert!(parse_master_key(&"ab".repeat(32)).is_ok());
        let b64 = B64.encode([7u8; 32]);
        assert!(parse_master_key(&b64).is_ok());
    }

    #[test]
    fn rejects_wrong_length_key() {
        assert!(parse_master_key("too-short").is_err());
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = test_key();
        assert_eq!(format!("{key:?}"), "MasterKey([REDACTED])");
    }

    #[test]
    fn payload_encryptor_roundtrips_json() {
        let encryptor = PayloadEncryptor::new(test_key());
        let value = serde_json::json!({"amount": 100, "currency": "USD"});
        let encrypted = encryptor.encrypt_json(&value).unwrap();
        let decrypted = encryptor.decrypt_json(&encrypted).unwrap();
        assert_eq!(decrypted, value);
    }

    #[test]
    fn is_encrypted_detects_envelope() {
        let key = test_key();
        let encrypted = encrypt_value("x", &key).unwrap();
        assert!(is_encrypted(&encrypted));
        assert!(!is_encrypted("plain"));
    }
}
