//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use u2fzero_core::keys::KeyMaterial;

#[derive(Parser)]
#[command(name = "u2fzero")]
#[command(author, version, about = "U2F Zero provisioning and maintenance tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Serial number of the token to use (defaults to the first one found)
    #[arg(short, long, global = true)]
    pub serial: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision a freshly built token and put it into bootloader mode
    Configure {
        /// Attestation private key (P-256, PEM)
        ecc_key: PathBuf,

        /// File to write the write and read key masks to
        output: PathBuf,

        /// Write key as 64 hex digits (random if omitted)
        #[arg(short = 'w', long, value_name = "HEX")]
        write_key: Option<KeyMaterial>,

        /// Read key as 64 hex digits (random if omitted)
        #[arg(short = 'r', long, value_name = "HEX")]
        read_key: Option<KeyMaterial>,
    },

    /// Stream hardware random numbers to stdout until interrupted
    Rng {
        /// Stop after this many bytes
        #[arg(short = 'n', long, value_name = "BYTES")]
        count: Option<u64>,
    },

    /// Feed entropy from stdin into the token's RNG
    Seed,

    /// Erase all registered keys (requires button presses)
    Wipe,

    /// List connected tokens
    List,

    /// Blink the token's LED
    Wink,

    /// Put the token into bootloader mode
    Bootloader,

    /// Permanently disable the bootloader
    BootloaderDestroy,
}
