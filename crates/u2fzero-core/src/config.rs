//! EEPROM configuration blob
//!
//! The configuration zone of the token's secure element is 128 bytes. The
//! first bytes hold the chip serial, which differs per device, so the host
//! reads it back and splices it over the factory template before computing
//! the lock checksum.

use crate::crc;

/// Size of the configuration zone in bytes
pub const CONFIG_LEN: usize = 128;

/// Factory configuration template
///
/// Slot and key configuration for the secure element; bytes covered by the
/// device serial are overwritten before locking.
pub const FACTORY_TEMPLATE: [u8; CONFIG_LEN] = [
    0x01, 0x23, 0x6d, 0x10, 0x00, 0x00, 0x50, 0x00, 0xd7, 0x2c, 0xa5, 0x71, 0xee, 0xc0, 0x85, 0x00,
    0xc0, 0x00, 0x55, 0x00, 0x83, 0x71, 0x81, 0x01, 0x83, 0x71, 0xc1, 0x01, 0x83, 0x71, 0x83, 0x71,
    0x83, 0x71, 0xc1, 0x71, 0x01, 0x01, 0x83, 0x71, 0x83, 0x71, 0xc1, 0x71, 0x83, 0x71, 0x83, 0x71,
    0x83, 0x71, 0x83, 0x71, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff,
    0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x55, 0x55, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x13, 0x00, 0x3c, 0x00, 0x13, 0x00, 0x3c, 0x00, 0x13, 0x00, 0x3c, 0x00, 0x13, 0x00, 0x3c, 0x00,
    0x3c, 0x00, 0x3c, 0x00, 0x13, 0x00, 0x3c, 0x00, 0x13, 0x00, 0x3c, 0x00, 0x13, 0x00, 0x33, 0x00,
];

/// A 128-byte configuration image ready to be checksummed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBlob([u8; CONFIG_LEN]);

impl ConfigBlob {
    /// The unmodified factory template
    pub fn factory() -> Self {
        Self(FACTORY_TEMPLATE)
    }

    /// Factory template with its leading bytes replaced by `serial`
    ///
    /// Serials longer than the blob are truncated; the result is always
    /// [`CONFIG_LEN`] bytes.
    pub fn with_serial(serial: &[u8]) -> Self {
        let mut blob = Self::factory();
        blob.patch_serial(serial);
        blob
    }

    /// Overwrite the leading bytes with `serial`, keeping the rest
    pub fn patch_serial(&mut self, serial: &[u8]) {
        let len = serial.len().min(CONFIG_LEN);
        if len < serial.len() {
            log::warn!(
                "Serial of {} bytes truncated to {} bytes",
                serial.len(),
                CONFIG_LEN
            );
        }
        self.0[..len].copy_from_slice(&serial[..len]);
    }

    /// Checksum the token expects with the lock command
    pub fn checksum(&self) -> [u8; 2] {
        crc::crc16(&self.0)
    }

    /// Raw configuration bytes
    pub fn as_bytes(&self) -> &[u8; CONFIG_LEN] {
        &self.0
    }
}

impl Default for ConfigBlob {
    fn default() -> Self {
        Self::factory()
    }
}

impl AsRef<[u8]> for ConfigBlob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_every_length() {
        let serial: Vec<u8> = (0..CONFIG_LEN).map(|i| (i as u8) ^ 0x5A).collect();
        for len in 0..=CONFIG_LEN {
            let blob = ConfigBlob::with_serial(&serial[..len]);
            assert_eq!(blob.as_bytes().len(), CONFIG_LEN);
            assert_eq!(&blob.as_bytes()[..len], &serial[..len]);
            assert_eq!(&blob.as_bytes()[len..], &FACTORY_TEMPLATE[len..]);
        }
    }

    #[test]
    fn test_long_serial_truncated() {
        let serial = [0xAB; CONFIG_LEN + 10];
        let blob = ConfigBlob::with_serial(&serial);
        assert_eq!(blob.as_bytes(), &[0xAB; CONFIG_LEN]);
    }

    #[test]
    fn test_empty_serial_is_factory() {
        assert_eq!(ConfigBlob::with_serial(&[]), ConfigBlob::factory());
    }

    #[test]
    fn test_patched_checksum() {
        let serial = [0x01, 0x23, 0xAA, 0xBB, 0xCC, 0xDD, 0x00, 0x00, 0xEE];
        let blob = ConfigBlob::with_serial(&serial);
        assert_eq!(blob.checksum(), [0x48, 0x7F]);
    }
}
