//! u2fzero - Provisioning and maintenance tool for U2F Zero tokens
//!
//! Talks to the token's vendor HID interface to run the one-time
//! configuration sequence and the day-to-day custom commands.
//!
//! # Architecture
//!
//! All protocol logic lives in `u2fzero-core` and is written against the
//! `Transport` trait. This binary only opens the HID device, maps each
//! subcommand to one core operation and reports the outcome:
//! - **configure** - lock the EEPROM, load keys and the attestation key,
//!   write the key masks to a file and enter bootloader mode
//! - **rng / seed** - stream random data out of, or entropy into, the token
//!   until interrupted
//! - **wipe / wink / bootloader** - one-shot custom commands

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use u2fzero_hid::U2fZero;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG overrides the verbosity flags
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter(cli.verbose)),
    )
    .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Log filter used when RUST_LOG is not set
fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let serial = cli.serial.as_deref();

    match cli.command {
        Commands::List => commands::list::run(),
        Commands::Configure {
            ecc_key,
            output,
            write_key,
            read_key,
        } => {
            let mut token = U2fZero::open(serial)?;
            commands::configure::run(&mut token, &ecc_key, &output, write_key, read_key)
        }
        Commands::Rng { count } => {
            let mut token = U2fZero::open(serial)?;
            let cancel = commands::interrupt::watch(|| {})?;
            commands::stream::run_rng(&mut token, &cancel, count)
        }
        Commands::Seed => {
            let mut token = U2fZero::open(serial)?;
            let seeded = Arc::new(AtomicU64::new(0));
            let summary = seeded.clone();
            let cancel = commands::interrupt::watch(move || {
                println!("seeded {} bytes", summary.load(Ordering::SeqCst));
            })?;
            commands::stream::run_seed(&mut token, &cancel, &seeded)
        }
        Commands::Wipe => {
            let mut token = U2fZero::open(serial)?;
            commands::device::run_wipe(&mut token)
        }
        Commands::Wink => {
            let mut token = U2fZero::open(serial)?;
            commands::device::run_wink(&mut token)
        }
        Commands::Bootloader => {
            let mut token = U2fZero::open(serial)?;
            commands::device::run_bootloader(&mut token)
        }
        Commands::BootloaderDestroy => {
            let mut token = U2fZero::open(serial)?;
            commands::device::run_bootloader_destroy(&mut token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_selects_filter() {
        assert_eq!(default_filter(0), "info");
        assert_eq!(default_filter(1), "debug");
        assert_eq!(default_filter(2), "trace");
        assert_eq!(default_filter(5), "trace");
    }

    #[test]
    fn test_verbose_flag_counts() {
        let cli = Cli::try_parse_from(["u2fzero", "-vv", "wink"]).unwrap();
        assert_eq!(default_filter(cli.verbose), "trace");

        let cli = Cli::try_parse_from(["u2fzero", "list", "-v"]).unwrap();
        assert_eq!(default_filter(cli.verbose), "debug");

        let cli = Cli::try_parse_from(["u2fzero", "list"]).unwrap();
        assert_eq!(default_filter(cli.verbose), "info");
    }
}
