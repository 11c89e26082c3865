//! Key material handled during provisioning
//!
//! Two kinds of secrets pass through the host:
//! - symmetric write/read keys, either supplied as hex or generated locally
//! - the ECC P-256 attestation private key, read from a PEM file

use p256::pkcs8::DecodePrivateKey;
use p256::SecretKey;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::mask::{derive_write_mask, WriteMask, KEY_LEN};

/// Length of a raw P-256 private scalar
pub const ATTESTATION_KEY_LEN: usize = 32;

const SEC1_LABEL: &str = "EC PRIVATE KEY";
const PKCS8_LABEL: &str = "PRIVATE KEY";

/// A 32-byte symmetric key (write key or read key)
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial([u8; KEY_LEN]);

impl KeyMaterial {
    /// Generate a fresh key from the operating system CSPRNG
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Wrap raw key bytes, which must be exactly 32 bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidKeyMaterial(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Parse a key from 64 hex digits
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| Error::InvalidKeyMaterial(format!("bad hex: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Derive the write mask for this key
    pub fn write_mask(&self) -> WriteMask {
        derive_write_mask(&self.0)
    }
}

impl FromStr for KeyMaterial {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

// Secrets stay out of logs
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(..)")
    }
}

/// Raw P-256 attestation private key
#[derive(Clone, PartialEq, Eq)]
pub struct AttestationKey([u8; ATTESTATION_KEY_LEN]);

impl AttestationKey {
    /// Decode a PEM encoded P-256 private key
    ///
    /// Accepts SEC1 (`EC PRIVATE KEY`, as produced by
    /// `openssl ecparam -genkey`, with or without the leading
    /// `EC PARAMETERS` block) and PKCS#8 (`PRIVATE KEY`).
    pub fn from_pem(pem: &str) -> Result<Self> {
        let secret = if let Some(block) = pem_block(pem, SEC1_LABEL) {
            SecretKey::from_sec1_pem(&block).map_err(|e| {
                Error::InvalidAttestationKey(format!("not a prime256v1 EC key: {}", e))
            })?
        } else if let Some(block) = pem_block(pem, PKCS8_LABEL) {
            SecretKey::from_pkcs8_pem(&block).map_err(|e| {
                Error::InvalidAttestationKey(format!("not a prime256v1 EC key: {}", e))
            })?
        } else {
            return Err(Error::InvalidAttestationKey(
                "no EC private key found in PEM input".into(),
            ));
        };

        Self::from_raw(secret.to_bytes().as_slice())
    }

    /// Wrap a raw private scalar, which must be exactly 32 bytes long
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        let scalar: [u8; ATTESTATION_KEY_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidAttestationKey(format!(
                "incorrect key type: raw key is {} bytes, must be a {}-byte prime256v1 scalar",
                bytes.len(),
                ATTESTATION_KEY_LEN
            ))
        })?;
        Ok(Self(scalar))
    }

    /// Raw scalar bytes, as sent with the load-attestation-key command
    pub fn as_bytes(&self) -> &[u8; ATTESTATION_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for AttestationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AttestationKey(..)")
    }
}

/// Cut a single `-----BEGIN <label>-----` document out of `text`
fn pem_block(text: &str, label: &str) -> Option<String> {
    let begin = format!("-----BEGIN {}-----", label);
    let end = format!("-----END {}-----", label);
    let start = text.find(&begin)?;
    let stop = text[start..].find(&end)? + start + end.len();
    Some(format!("{}\n", &text[start..stop]))
}
