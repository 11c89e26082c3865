//! RNG and seed streaming commands

use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, ErrorKind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use u2fzero_core::custom::{self, CancelToken};
use u2fzero_core::{Error, Transport};

use super::CmdResult;

/// Create a standard spinner style
fn create_spinner_style() -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?)
}

/// Dump random bytes to stdout until interrupted or `count` bytes are out
pub fn run_rng<T: Transport + ?Sized>(
    token: &mut T,
    cancel: &CancelToken,
    count: Option<u64>,
) -> CmdResult {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match custom::dump_rng(token, &mut out, cancel, count) {
        Ok(stats) => {
            log::info!(
                "Wrote {} random bytes ({} device errors)",
                stats.bytes,
                stats.errors
            );
            Ok(())
        }
        // Reader went away, e.g. piped into `head`
        Err(Error::Io(e)) if e.kind() == ErrorKind::BrokenPipe => {
            log::debug!("Output closed");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Feed stdin into the token's RNG seed until EOF or interrupted
///
/// `seeded` mirrors the running count so an interrupt watcher can report it.
pub fn run_seed<T: Transport + ?Sized>(
    token: &mut T,
    cancel: &CancelToken,
    seeded: &AtomicU64,
) -> CmdResult {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let pb = ProgressBar::new_spinner();
    pb.set_style(create_spinner_style()?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("waiting for input");

    let result = custom::ingest_seed(token, &mut input, cancel, |n| {
        seeded.store(n, Ordering::SeqCst);
        pb.set_message(format!("seeded {} bytes", n));
    });

    pb.finish_and_clear();
    println!("seeded {} bytes", result?);
    Ok(())
}
