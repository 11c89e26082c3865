//! EEPROM configuration checksum
//!
//! The token refuses to lock its configuration zone unless the host sends
//! the CRC it computed itself. The variant is CRC-16/ARC (reflected
//! polynomial 0xA001, init 0) fed bit by bit, with the final register
//! bit-reversed before it goes on the wire high byte first.

/// Reflected CRC-16 polynomial
const POLY_REFLECTED: u16 = 0xA001;

/// Feed one byte into the running CRC register
#[inline]
fn feed(mut crc: u16, byte: u8) -> u16 {
    crc ^= byte as u16;
    for _ in 0..8 {
        crc = if crc & 1 != 0 {
            (crc >> 1) ^ POLY_REFLECTED
        } else {
            crc >> 1
        };
    }
    crc
}

/// Compute the bit-reversed CRC-16 of `data` as a number
pub fn crc16_value(data: &[u8]) -> u16 {
    data.iter().fold(0, |crc, &b| feed(crc, b)).reverse_bits()
}

/// Compute the CRC-16 of `data` in wire order (high byte first)
pub fn crc16(data: &[u8]) -> [u8; 2] {
    crc16_value(data).to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FACTORY_TEMPLATE;

    #[test]
    fn test_empty_input() {
        assert_eq!(crc16_value(&[]), 0x0000);
        assert_eq!(crc16(&[]), [0x00, 0x00]);
    }

    #[test]
    fn test_check_string() {
        // CRC-16/ARC check value is 0xBB3D; reversed that is 0xBCDD
        assert_eq!(crc16_value(b"123456789"), 0xBCDD);
        assert_eq!(crc16(b"123456789"), [0xBC, 0xDD]);
    }

    #[test]
    fn test_single_byte() {
        assert_eq!(crc16_value(&[0x01]), 0x8303);
    }

    #[test]
    fn test_factory_template() {
        assert_eq!(crc16(&FACTORY_TEMPLATE), [0x89, 0xEB]);
    }

    #[test]
    fn test_reversal_matches_swap_network() {
        // Reversal must equal the 1/2/4/8-bit swap sequence the firmware uses
        fn swap_reverse(mut v: u16) -> u16 {
            v = ((v & 0xAAAA) >> 1) | ((v & 0x5555) << 1);
            v = ((v & 0xCCCC) >> 2) | ((v & 0x3333) << 2);
            v = ((v & 0xF0F0) >> 4) | ((v & 0x0F0F) << 4);
            ((v & 0xFF00) >> 8) | ((v & 0x00FF) << 8)
        }
        for v in [0x0000u16, 0x0001, 0x8000, 0x1234, 0xBB3D, 0xFFFF, 0xA001] {
            assert_eq!(v.reverse_bits(), swap_reverse(v));
        }
    }

    #[test]
    fn test_deterministic() {
        let data: Vec<u8> = (0..=255u8).collect();
        assert_eq!(crc16(&data), crc16(&data));
        assert_ne!(crc16(&data[..255]), crc16(&data));
    }
}
