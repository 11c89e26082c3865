//! Custom commands and bootloader control
//!
//! These are simple passthroughs on the broadcast channel. In the streaming
//! ones (RNG dump, seed ingestion) a bad frame is logged and the loop
//! carries on. They stop when their [`CancelToken`] is triggered.

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::{
    custom_payload, seed_payload, Command, Framing, Response, CUSTOM_ECHO_OFFSET,
    CUSTOM_STATUS_OFFSET, MAX_SEED_CHUNK, RNG_CHUNK_LEN, RNG_DATA_OFFSET, RNG_LEN_OFFSET,
    STREAM_TIMEOUT, WIPE_TIMEOUT,
};
use crate::transport::Transport;

/// Cooperative cancellation flag shared with a signal watcher
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// New, untriggered token
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask running loops to stop after their current iteration
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters from an RNG dump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RngStats {
    /// Random bytes written to the output
    pub bytes: u64,
    /// Frames rejected as device errors
    pub errors: u64,
}

/// Stream hardware random numbers to `out`
///
/// Runs until `cancel` is triggered or, if given, at least `limit` bytes
/// have been written (the last chunk is trimmed to the limit).
pub fn dump_rng<T, W>(
    transport: &mut T,
    out: &mut W,
    cancel: &CancelToken,
    limit: Option<u64>,
) -> Result<RngStats>
where
    T: Transport + ?Sized,
    W: Write + ?Sized,
{
    let payload = custom_payload(&[]);
    let mut stats = RngStats::default();

    while !cancel.is_cancelled() {
        if let Some(limit) = limit {
            if stats.bytes >= limit {
                break;
            }
        }

        transport.send(Framing::Broadcast, Command::Rng, &payload)?;
        let chunk = match transport.receive(STREAM_TIMEOUT) {
            Ok(response) => match rng_chunk(&response) {
                Some(chunk) => chunk.to_vec(),
                None => {
                    log::warn!("device error: bad RNG frame {:?}", response);
                    stats.errors += 1;
                    continue;
                }
            },
            Err(e) => {
                log::warn!("device error: {}", e);
                stats.errors += 1;
                continue;
            }
        };

        let take = match limit {
            Some(limit) => chunk.len().min((limit - stats.bytes) as usize),
            None => chunk.len(),
        };
        out.write_all(&chunk[..take])?;
        out.flush()?;
        stats.bytes += take as u64;
    }

    Ok(stats)
}

/// Random bytes of a valid RNG response
fn rng_chunk(response: &Response) -> Option<&[u8]> {
    if response.byte(CUSTOM_ECHO_OFFSET) != Some(Command::Rng.code()) {
        return None;
    }
    if response.byte(RNG_LEN_OFFSET) != Some(RNG_CHUNK_LEN as u8) {
        return None;
    }
    response.slice(RNG_DATA_OFFSET, RNG_CHUNK_LEN)
}

/// Feed entropy from `input` into the token's RNG seed
///
/// Input is sent in chunks of at most 20 bytes until end of input or until
/// `cancel` is triggered. Cancellation is checked after every read from
/// `input`; a partly read chunk is then dropped and nothing more is sent.
/// `progress` receives the running count of accepted bytes. Returns the
/// number of bytes the token accepted.
pub fn ingest_seed<T, R, F>(
    transport: &mut T,
    input: &mut R,
    cancel: &CancelToken,
    mut progress: F,
) -> Result<u64>
where
    T: Transport + ?Sized,
    R: Read + ?Sized,
    F: FnMut(u64),
{
    let mut seeded = 0u64;
    let mut buf = [0u8; MAX_SEED_CHUNK];

    while !cancel.is_cancelled() {
        let n = match read_chunk(input, &mut buf, cancel)? {
            Some(0) => break,
            Some(n) => n,
            None => {
                log::debug!("Seeding cancelled, dropping partial chunk");
                break;
            }
        };

        transport.send(Framing::Broadcast, Command::Seed, &seed_payload(&buf[..n]))?;
        match transport.receive(STREAM_TIMEOUT) {
            Ok(response) if response.status_ok(CUSTOM_STATUS_OFFSET) => {
                seeded += n as u64;
                progress(seeded);
            }
            Ok(response) => log::warn!("device error: seed rejected {:?}", response),
            Err(e) => log::warn!("device error: {}", e),
        }
    }

    Ok(seeded)
}

/// Fill `buf` from `input` until it is full or input ends
///
/// Returns `None` if `cancel` fired while reading.
fn read_chunk<R: Read + ?Sized>(
    input: &mut R,
    buf: &mut [u8],
    cancel: &CancelToken,
) -> Result<Option<usize>> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = input.read(&mut buf[filled..]);
        if cancel.is_cancelled() {
            return Ok(None);
        }
        match read {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Some(filled))
}

/// Erase all registered keys
///
/// The token only answers once its button has been pressed enough times,
/// so this waits indefinitely, in 10 second slices. Returns whether the
/// token reported success.
pub fn wipe<T: Transport + ?Sized>(transport: &mut T) -> Result<bool> {
    transport.send(Framing::Broadcast, Command::Wipe, &custom_payload(&[]))?;
    let response = loop {
        match transport.receive(WIPE_TIMEOUT) {
            Ok(response) if !response.is_empty() => break response,
            Ok(_) => continue,
            Err(Error::Timeout) => {
                log::debug!("Still waiting for button presses");
                continue;
            }
            Err(e) => return Err(e),
        }
    };
    Ok(response.status_ok(CUSTOM_STATUS_OFFSET))
}

/// Blink the LED; the token sends no response
pub fn wink<T: Transport + ?Sized>(transport: &mut T) -> Result<()> {
    transport.send(Framing::Broadcast, Command::Wink, &custom_payload(&[]))
}

/// Ask the token to enter bootloader mode
///
/// Sent in both framings so that tokens with either firmware generation
/// pick it up.
pub fn enter_bootloader<T: Transport + ?Sized>(transport: &mut T) -> Result<()> {
    send_both_forms(transport, Command::Bootloader)
}

/// Permanently disable the bootloader
pub fn destroy_bootloader<T: Transport + ?Sized>(transport: &mut T) -> Result<()> {
    send_both_forms(transport, Command::BootloaderDestroy)
}

fn send_both_forms<T: Transport + ?Sized>(transport: &mut T, command: Command) -> Result<()> {
    transport.send(Framing::Short, command, &[])?;
    transport.send(Framing::Broadcast, command, &[])
}
