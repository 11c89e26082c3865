//! Provisioning sequence for a freshly built token
//!
//! Configuration is a strictly ordered script. Each step either succeeds or
//! aborts the whole run, and nothing is rolled back: a locked EEPROM stays
//! locked. Only reads are retried, never a state-changing command.

use std::fmt;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::config::{ConfigBlob, CONFIG_LEN};
use crate::error::{Error, KeySlot, Result};
use crate::keys::{AttestationKey, KeyMaterial};
use crate::mask::WriteMask;
use crate::protocol::{
    Command, Framing, Response, CONFIG_ECHO_OFFSET, CONFIG_STATUS_OFFSET, CONFIG_TIMEOUT,
    SERIAL_DATA_OFFSET, SERIAL_LEN_OFFSET, STEP_DELAY,
};
use crate::transport::{RetryPolicy, Transport};

/// One step of the provisioning sequence, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    VerifyBuilt,
    FetchSerial,
    PatchConfig,
    Lock,
    AcquireKeys,
    LoadTransactionKey,
    DeriveMasks,
    LoadWriteKey,
    LoadAttestationKey,
    PersistMasks,
    EnterBootloader,
}

impl Step {
    /// All steps in order
    pub const ALL: [Step; 11] = [
        Step::VerifyBuilt,
        Step::FetchSerial,
        Step::PatchConfig,
        Step::Lock,
        Step::AcquireKeys,
        Step::LoadTransactionKey,
        Step::DeriveMasks,
        Step::LoadWriteKey,
        Step::LoadAttestationKey,
        Step::PersistMasks,
        Step::EnterBootloader,
    ];

    /// 1-based position in the sequence
    pub fn number(self) -> usize {
        self as usize + 1
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match self {
            Step::VerifyBuilt => "checking device build",
            Step::FetchSerial => "reading serial number",
            Step::PatchConfig => "patching configuration",
            Step::Lock => "locking configuration",
            Step::AcquireKeys => "preparing keys",
            Step::LoadTransactionKey => "loading transaction key",
            Step::DeriveMasks => "deriving key masks",
            Step::LoadWriteKey => "loading write key",
            Step::LoadAttestationKey => "loading attestation key",
            Step::PersistMasks => "writing key file",
            Step::EnterBootloader => "entering bootloader",
        };
        f.write_str(desc)
    }
}

/// Inputs for one provisioning run
#[derive(Debug, Clone)]
pub struct ConfigureRequest<'a> {
    /// PEM text of the P-256 attestation private key
    pub attestation_pem: &'a str,
    /// File receiving the write and read masks
    pub output: &'a Path,
    /// Write key to use instead of a generated one
    pub write_key: Option<KeyMaterial>,
    /// Read key to use instead of a generated one
    pub read_key: Option<KeyMaterial>,
}

impl<'a> ConfigureRequest<'a> {
    /// Request with generated write and read keys
    pub fn new(attestation_pem: &'a str, output: &'a Path) -> Self {
        Self {
            attestation_pem,
            output,
            write_key: None,
            read_key: None,
        }
    }

    /// Use a caller supplied write key
    pub fn with_write_key(mut self, key: KeyMaterial) -> Self {
        self.write_key = Some(key);
        self
    }

    /// Use a caller supplied read key
    pub fn with_read_key(mut self, key: KeyMaterial) -> Self {
        self.read_key = Some(key);
        self
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    /// Serial number reported by the token
    pub serial: Vec<u8>,
    /// Checksum the configuration was locked with
    pub crc: [u8; 2],
    /// Mask of the write key (first line of the output file)
    pub write_mask: WriteMask,
    /// Mask of the read key (second line of the output file)
    pub read_mask: WriteMask,
    /// Whether the write key was generated rather than supplied
    pub write_key_generated: bool,
    /// Whether the read key was generated rather than supplied
    pub read_key_generated: bool,
}

/// Runs the provisioning sequence against a [`Transport`]
#[derive(Debug, Clone)]
pub struct Provisioner {
    retry: RetryPolicy,
    step_delay: Duration,
    timeout: Duration,
}

impl Default for Provisioner {
    fn default() -> Self {
        Self::new()
    }
}

impl Provisioner {
    /// Provisioner with the timings real tokens need
    pub fn new() -> Self {
        Self {
            retry: RetryPolicy::default(),
            step_delay: STEP_DELAY,
            timeout: CONFIG_TIMEOUT,
        }
    }

    /// Override the read retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the settle delay between steps
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Override the per-read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the full sequence
    ///
    /// `on_step` is called as each step starts. The first failing step
    /// aborts the run and its error is returned; later steps are not
    /// attempted. The attestation key is decoded before anything is sent,
    /// so a bad PEM fails with the token untouched.
    pub fn configure<T, F>(
        &self,
        transport: &mut T,
        request: &ConfigureRequest<'_>,
        mut on_step: F,
    ) -> Result<ProvisionReport>
    where
        T: Transport + ?Sized,
        F: FnMut(Step),
    {
        let attestation = AttestationKey::from_pem(request.attestation_pem)?;

        on_step(Step::VerifyBuilt);
        self.verify_built(transport)?;
        self.settle();

        on_step(Step::FetchSerial);
        let serial = self.fetch_serial(transport)?;
        self.settle();

        on_step(Step::PatchConfig);
        let blob = ConfigBlob::with_serial(&serial);
        log::debug!("Config: {}", hex::encode(blob.as_bytes()));

        on_step(Step::Lock);
        let crc = self.lock(transport, &blob)?;
        self.settle();

        on_step(Step::AcquireKeys);
        let (write_key, write_key_generated) = acquire_key(request.write_key.as_ref(), "write");
        let (read_key, read_key_generated) = acquire_key(request.read_key.as_ref(), "read");

        on_step(Step::LoadTransactionKey);
        self.load(
            transport,
            Command::LoadTransKey,
            write_key.as_bytes(),
            Error::KeyLoadFailed(KeySlot::Transaction),
        )?;

        on_step(Step::DeriveMasks);
        let write_mask = write_key.write_mask();
        let read_mask = read_key.write_mask();
        log::info!("Write key mask: {}", write_mask);

        on_step(Step::LoadWriteKey);
        self.load(
            transport,
            Command::LoadWriteKey,
            write_mask.as_bytes(),
            Error::KeyLoadFailed(KeySlot::Write),
        )?;

        on_step(Step::LoadAttestationKey);
        self.load(
            transport,
            Command::LoadAttestKey,
            attestation.as_bytes(),
            Error::KeyLoadFailed(KeySlot::Attestation),
        )?;

        on_step(Step::PersistMasks);
        persist_masks(request.output, &write_mask, &read_mask)?;

        on_step(Step::EnterBootloader);
        self.load(
            transport,
            Command::Bootloader,
            &[],
            Error::BootloaderTransitionFailed,
        )?;
        log::info!("Device is now in bootloader mode");

        Ok(ProvisionReport {
            serial,
            crc,
            write_mask,
            read_mask,
            write_key_generated,
            read_key_generated,
        })
    }

    fn settle(&self) {
        if !self.step_delay.is_zero() {
            thread::sleep(self.step_delay);
        }
    }

    /// Step 1: the token must report a completed build
    fn verify_built<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<()> {
        transport.send(Framing::Short, Command::IsBuild, &[])?;
        let response = transport.receive(self.timeout)?;
        if !response.status_ok(CONFIG_STATUS_OFFSET) {
            return Err(Error::NotConfigured);
        }
        log::info!("Device is built");
        Ok(())
    }

    /// Step 2: read the serial, skipping responses to anything else
    fn fetch_serial<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<Vec<u8>> {
        transport.send(Framing::Short, Command::GetSerialNum, &[])?;

        let attempts = self.retry.tries.max(1);
        for attempt in 1..=attempts {
            let response = transport.receive_with_retries(&self.retry, self.timeout)?;
            if response.byte(CONFIG_ECHO_OFFSET) != Some(Command::GetSerialNum.code()) {
                log::debug!(
                    "Ignoring stale response {:?} ({}/{})",
                    response,
                    attempt,
                    attempts
                );
                continue;
            }
            return parse_serial(&response);
        }

        Err(Error::ProtocolMismatch(format!(
            "no serial number response after {} reads",
            attempts
        )))
    }

    /// Step 4: checksum the patched blob and lock it in
    fn lock<T: Transport + ?Sized>(&self, transport: &mut T, blob: &ConfigBlob) -> Result<[u8; 2]> {
        let crc = blob.checksum();
        log::debug!("CRC is {:02x}{:02x}", crc[0], crc[1]);
        self.load(transport, Command::Lock, &crc, Error::LockFailed)?;
        log::info!("Locked EEPROM with CRC {:02x}{:02x}", crc[0], crc[1]);
        Ok(crc)
    }

    /// Send a command and require the success marker in the response
    fn load<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        command: Command,
        payload: &[u8],
        failure: Error,
    ) -> Result<()> {
        transport.send(Framing::Short, command, payload)?;
        let response = transport.receive_with_retries(&self.retry, self.timeout)?;
        if response.status_ok(CONFIG_STATUS_OFFSET) {
            Ok(())
        } else {
            log::debug!("{} rejected: {:?}", command, response);
            Err(failure)
        }
    }
}

fn parse_serial(response: &Response) -> Result<Vec<u8>> {
    let len = response
        .byte(SERIAL_LEN_OFFSET)
        .ok_or_else(|| Error::ProtocolMismatch("serial response has no length".into()))?
        as usize;
    if len > CONFIG_LEN {
        return Err(Error::ProtocolMismatch(format!(
            "serial length {} exceeds configuration size",
            len
        )));
    }
    let serial = response.slice(SERIAL_DATA_OFFSET, len).ok_or_else(|| {
        Error::ProtocolMismatch(format!(
            "serial response truncated: {} bytes announced, {} received",
            len,
            response.len().saturating_sub(SERIAL_DATA_OFFSET)
        ))
    })?;
    log::info!("Read {} byte serial {}", len, hex::encode(serial));
    Ok(serial.to_vec())
}

fn acquire_key(supplied: Option<&KeyMaterial>, name: &str) -> (KeyMaterial, bool) {
    match supplied {
        Some(key) => {
            log::info!("Using provided {} key", name);
            (key.clone(), false)
        }
        None => {
            log::info!("Generating a new random {} key", name);
            (KeyMaterial::generate(), true)
        }
    }
}

/// Write the two masks, write mask first
fn persist_masks(output: &Path, write_mask: &WriteMask, read_mask: &WriteMask) -> Result<()> {
    log::info!("Writing keys to {}", output.display());
    fs::write(output, format!("{}\n{}", write_mask.to_hex(), read_mask.to_hex()))?;
    Ok(())
}
