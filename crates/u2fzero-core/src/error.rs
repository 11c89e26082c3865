//! Error types for u2fzero-core

use std::fmt;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Key slot a load command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySlot {
    /// Transaction (master) key, loaded from the raw write key
    Transaction,
    /// Write key, loaded from the derived write mask
    Write,
    /// ECC P-256 attestation key
    Attestation,
}

impl fmt::Display for KeySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction => write!(f, "transaction key"),
            Self::Write => write!(f, "write key"),
            Self::Attestation => write!(f, "attestation key"),
        }
    }
}

/// Errors produced while talking to a token
#[derive(Debug, Error)]
pub enum Error {
    /// No HID device matched the vendor/product id (and serial, if given)
    #[error("{}", not_found(.serial))]
    DeviceNotFound {
        /// Serial number filter that was requested
        serial: Option<String>,
    },

    /// Token reports it has not been built
    #[error("device not configured")]
    NotConfigured,

    /// Response had unexpected content or length
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// Token refused to lock the EEPROM configuration
    #[error("device refused to lock configuration")]
    LockFailed,

    /// Token refused a key load command
    #[error("failed loading {0}")]
    KeyLoadFailed(KeySlot),

    /// Attestation key could not be decoded as a 32-byte P-256 scalar
    #[error("invalid attestation key: {0}")]
    InvalidAttestationKey(String),

    /// Token did not acknowledge the switch to bootloader mode
    #[error("failed to put device in bootloader mode")]
    BootloaderTransitionFailed,

    /// No response within the read timeout
    #[error("timed out waiting for device response")]
    Timeout,

    /// Low-level transport failure (write or read)
    #[error("transport error: {0}")]
    Transport(String),

    /// Caller supplied key material is malformed
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Payload does not fit into a single report
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge {
        /// Requested payload length
        len: usize,
        /// Maximum payload for the chosen framing
        max: usize,
    },

    /// Local I/O error (output file, stdin/stdout streams)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn not_found(serial: &Option<String>) -> String {
    match serial {
        Some(sn) => format!("U2F Zero {} not found", sn),
        None => "U2F Zero not found".to_string(),
    }
}

impl Error {
    /// Whether this error means the device simply did not answer in time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}
