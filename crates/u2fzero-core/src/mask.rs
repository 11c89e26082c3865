//! Write mask derivation
//!
//! Keys are never stored on the token in raw form. The host sends a mask:
//! SHA-256 over the key padded with a fixed suffix, followed by the first
//! four bytes of SHA-256 over that digest.

use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a raw transport key
pub const KEY_LEN: usize = 32;

/// Length of a derived mask in bytes (72 hex characters)
pub const MASK_LEN: usize = 36;

/// Bytes of the second digest kept in the mask
const CHECK_LEN: usize = MASK_LEN - 32;

/// Suffix appended to the key before the first hash (7 bytes + 57 zeros)
pub const MASK_SUFFIX: [u8; 64] = {
    let mut suffix = [0u8; 64];
    let head = [0x15, 0x02, 0x01, 0x00, 0xee, 0x01, 0x23];
    let mut i = 0;
    while i < head.len() {
        suffix[i] = head[i];
        i += 1;
    }
    suffix
};

/// Derived write mask
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WriteMask([u8; MASK_LEN]);

impl WriteMask {
    /// Raw mask bytes, as sent with the load-write-key command
    pub fn as_bytes(&self) -> &[u8; MASK_LEN] {
        &self.0
    }

    /// Lowercase hex form, as written to the key output file
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for WriteMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for WriteMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WriteMask({})", self.to_hex())
    }
}

/// Derive the write mask for a 32-byte key
pub fn derive_write_mask(key: &[u8; KEY_LEN]) -> WriteMask {
    let first = Sha256::new()
        .chain_update(key)
        .chain_update(MASK_SUFFIX)
        .finalize();
    let second = Sha256::digest(first);

    let mut mask = [0u8; MASK_LEN];
    mask[..32].copy_from_slice(&first);
    mask[32..].copy_from_slice(&second[..CHECK_LEN]);
    WriteMask(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_layout() {
        assert_eq!(&MASK_SUFFIX[..7], &[0x15, 0x02, 0x01, 0x00, 0xee, 0x01, 0x23]);
        assert!(MASK_SUFFIX[7..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_zero_key_vector() {
        let mask = derive_write_mask(&[0u8; KEY_LEN]);
        assert_eq!(
            mask.to_hex(),
            "bc0932eaa5afe62a0f2a99e9bd6a7c7b7a81c446d4ec24ed8bf92859fb07a7c187bb0ae2"
        );
    }

    #[test]
    fn test_counting_key_vector() {
        let mut key = [0u8; KEY_LEN];
        for (i, b) in key.iter_mut().enumerate() {
            *b = i as u8;
        }
        let mask = derive_write_mask(&key);
        assert_eq!(
            mask.to_hex(),
            "d6d9a4442d1b1e8c86e8caf5cc23aae0e1cdae9590b38234769182549274cb3630640917"
        );
    }

    #[test]
    fn test_length_and_purity() {
        let key = [0x42u8; KEY_LEN];
        let a = derive_write_mask(&key);
        let b = derive_write_mask(&key);
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 2 * MASK_LEN);
        assert_eq!(a.as_bytes().len(), MASK_LEN);
    }

    #[test]
    fn test_distinct_keys_differ() {
        let mut other = [0u8; KEY_LEN];
        other[31] = 1;
        assert_ne!(derive_write_mask(&[0u8; KEY_LEN]), derive_write_mask(&other));
    }
}
