//! u2fzero-hid - hidapi transport for U2F Zero tokens
//!
//! Opens the token's HID interface (VID:10c4 PID:8acf) and implements the
//! [`Transport`](u2fzero_core::Transport) trait on top of blocking hidapi
//! reads and writes.
//!
//! # Example
//!
//! ```no_run
//! use u2fzero_core::custom;
//! use u2fzero_hid::U2fZero;
//!
//! let mut token = U2fZero::open(None)?;
//! custom::wink(&mut token)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod device;
mod error;

pub use device::{list_devices, U2fZero, U2fZeroDeviceInfo};
pub use error::{HidError, Result};
