//! CLI command implementations
//!
//! Each subcommand maps onto one operation from `u2fzero-core`. The
//! functions here take any `Transport`, so they work the same way against
//! a real token or the simulated one.

pub mod configure;
pub mod device;
pub mod interrupt;
pub mod list;
pub mod stream;

/// Result type shared by the command implementations
pub type CmdResult = Result<(), Box<dyn std::error::Error>>;
