//! Error types for the HID backend

use std::fmt;

/// Result type for HID operations
pub type Result<T> = std::result::Result<T, HidError>;

/// Errors that can occur when talking to a token over hidapi
#[derive(Debug)]
pub enum HidError {
    /// hidapi could not be initialised
    InitFailed(String),
    /// No matching device
    DeviceNotFound {
        /// Serial number that was requested, if any
        serial: Option<String>,
    },
    /// Failed to open device
    OpenFailed(String),
    /// Device was already closed
    Closed,
    /// Write of an output report failed
    WriteFailed(String),
    /// Read of an input report failed
    ReadFailed(String),
    /// Short write
    Incomplete {
        /// Bytes the device accepted
        written: usize,
        /// Bytes that should have been written
        expected: usize,
    },
}

impl fmt::Display for HidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HidError::InitFailed(msg) => write!(f, "Failed to initialise hidapi: {}", msg),
            HidError::DeviceNotFound { serial: Some(sn) } => {
                write!(f, "U2F Zero {} not found (VID:10c4 PID:8acf)", sn)
            }
            HidError::DeviceNotFound { serial: None } => {
                write!(f, "U2F Zero not found (VID:10c4 PID:8acf)")
            }
            HidError::OpenFailed(msg) => write!(f, "Failed to open U2F Zero: {}", msg),
            HidError::Closed => write!(f, "Device already closed"),
            HidError::WriteFailed(msg) => write!(f, "HID write failed: {}", msg),
            HidError::ReadFailed(msg) => write!(f, "HID read failed: {}", msg),
            HidError::Incomplete { written, expected } => {
                write!(f, "Short HID write: {} of {} bytes", written, expected)
            }
        }
    }
}

impl std::error::Error for HidError {}

impl From<HidError> for u2fzero_core::Error {
    fn from(e: HidError) -> Self {
        match e {
            HidError::DeviceNotFound { serial } => u2fzero_core::Error::DeviceNotFound { serial },
            other => u2fzero_core::Error::Transport(other.to_string()),
        }
    }
}
