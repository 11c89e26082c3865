//! u2fzero-core - Configuration protocol for U2F Zero tokens
//!
//! This crate contains everything that talks to a U2F Zero token at the
//! byte level, independent of how packets reach the device:
//!
//! - [`crc`] - the CRC-16 variant the token checks before locking its EEPROM
//! - [`mask`] - SHA-256 based derivation of write masks from raw keys
//! - [`protocol`] - command table, packet framing and response offsets
//! - [`transport`] - the blocking [`Transport`] trait and bounded-retry reads
//! - [`configure`] - the provisioning sequence run on a fresh token
//! - [`custom`] - RNG, seed, wipe, wink and bootloader passthroughs
//!
//! Device backends (hidapi, the simulated token) live in their own crates
//! and only need to implement [`Transport`].
//!
//! # Example
//!
//! ```ignore
//! use u2fzero_core::configure::{ConfigureRequest, Provisioner};
//!
//! let pem = std::fs::read_to_string("attest.pem")?;
//! let request = ConfigureRequest::new(&pem, "keys.txt".as_ref());
//! let report = Provisioner::new().configure(&mut device, &request, |step| {
//!     println!("{}", step);
//! })?;
//! println!("write mask: {}", report.write_mask.to_hex());
//! ```

#![warn(rust_2018_idioms)]

pub mod config;
pub mod configure;
pub mod crc;
pub mod custom;
pub mod error;
pub mod keys;
pub mod mask;
pub mod protocol;
pub mod transport;

pub use error::{Error, KeySlot, Result};
pub use protocol::{Command, Framing, Response};
pub use transport::{RetryPolicy, Transport};
