//! U2F Zero vendor protocol constants and packet framing
//!
//! Every exchange is one HID output report from the host followed by (at
//! most) one 64-byte input report from the token. Configuration commands use
//! the short form; the custom commands ride on the U2F HID broadcast channel.
//!
//! ```text
//! short:     00 | cmd | payload ...
//! broadcast: 00 | FF FF FF FF | cmd | payload ...
//! ```
//!
//! The leading `00` is the HID report id and is not part of the 64-byte
//! report itself.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

// USB device identifiers
pub const U2F_ZERO_VENDOR: u16 = 0x10C4;
pub const U2F_ZERO_PRODUCT: u16 = 0x8ACF;

/// HID report size (without the report id)
pub const REPORT_SIZE: usize = 64;
/// Size of an output packet including the report id
pub const PACKET_SIZE: usize = REPORT_SIZE + 1;
/// HID report id, always zero
pub const REPORT_ID: u8 = 0x00;
/// Channel id of the U2F HID broadcast channel
pub const BROADCAST_CHANNEL: [u8; 4] = [0xFF; 4];

/// Maximum payload in a short-form packet
pub const MAX_SHORT_PAYLOAD: usize = REPORT_SIZE - 1;
/// Maximum payload in a broadcast-form packet
pub const MAX_BROADCAST_PAYLOAD: usize = REPORT_SIZE - BROADCAST_CHANNEL.len() - 1;

// Timeouts
pub const CONFIG_TIMEOUT: Duration = Duration::from_millis(1000);
pub const STREAM_TIMEOUT: Duration = Duration::from_millis(1000);
pub const WIPE_TIMEOUT: Duration = Duration::from_millis(10000);

/// Pause the token needs between configuration steps
pub const STEP_DELAY: Duration = Duration::from_millis(250);

/// Status value reported for a successful command
pub const STATUS_OK: u8 = 1;

// Response offsets for configuration commands
pub const CONFIG_ECHO_OFFSET: usize = 0;
pub const CONFIG_STATUS_OFFSET: usize = 1;
pub const SERIAL_LEN_OFFSET: usize = 1;
pub const SERIAL_DATA_OFFSET: usize = 2;

// Response offsets for custom (broadcast) commands
pub const CUSTOM_ECHO_OFFSET: usize = 4;
pub const CUSTOM_STATUS_OFFSET: usize = 7;
pub const RNG_LEN_OFFSET: usize = 6;
pub const RNG_DATA_OFFSET: usize = 7;

/// Random bytes returned per RNG request
pub const RNG_CHUNK_LEN: usize = 32;
/// Maximum seed bytes accepted per request
pub const MAX_SEED_CHUNK: usize = 20;

/// Vendor command identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    GetSerialNum = 0x80,
    IsBuild = 0x81,
    IsConfigured = 0x82,
    Lock = 0x83,
    GenKey = 0x84,
    LoadTransKey = 0x85,
    LoadWriteKey = 0x86,
    LoadAttestKey = 0x87,
    Bootloader = 0x88,
    BootloaderDestroy = 0x89,

    Rng = 0x21,
    Seed = 0x22,
    Wipe = 0x23,
    Wink = 0x24,
}

impl Command {
    /// All known commands
    pub const ALL: [Command; 14] = [
        Command::GetSerialNum,
        Command::IsBuild,
        Command::IsConfigured,
        Command::Lock,
        Command::GenKey,
        Command::LoadTransKey,
        Command::LoadWriteKey,
        Command::LoadAttestKey,
        Command::Bootloader,
        Command::BootloaderDestroy,
        Command::Rng,
        Command::Seed,
        Command::Wipe,
        Command::Wink,
    ];

    /// Wire value of the command
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a command by its wire value
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Custom commands are carried on the broadcast channel
    pub fn is_custom(self) -> bool {
        matches!(
            self,
            Command::Rng | Command::Seed | Command::Wipe | Command::Wink
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::GetSerialNum => "GET_SERIAL_NUM",
            Command::IsBuild => "IS_BUILD",
            Command::IsConfigured => "IS_CONFIGURED",
            Command::Lock => "LOCK",
            Command::GenKey => "GENKEY",
            Command::LoadTransKey => "LOAD_TRANS_KEY",
            Command::LoadWriteKey => "LOAD_WRITE_KEY",
            Command::LoadAttestKey => "LOAD_ATTEST_KEY",
            Command::Bootloader => "BOOTLOADER",
            Command::BootloaderDestroy => "BOOTLOADER_DESTROY",
            Command::Rng => "RNG",
            Command::Seed => "SEED",
            Command::Wipe => "WIPE",
            Command::Wink => "WINK",
        };
        write!(f, "{} (0x{:02X})", name, self.code())
    }
}

/// Packet layout used for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `[0, cmd, payload...]`
    Short,
    /// `[0, FF, FF, FF, FF, cmd, payload...]`
    Broadcast,
}

impl Framing {
    /// Offset of the command byte within the packet
    const fn command_offset(self) -> usize {
        match self {
            Framing::Short => 1,
            Framing::Broadcast => 1 + BROADCAST_CHANNEL.len(),
        }
    }

    /// Largest payload that fits one report
    pub const fn max_payload(self) -> usize {
        match self {
            Framing::Short => MAX_SHORT_PAYLOAD,
            Framing::Broadcast => MAX_BROADCAST_PAYLOAD,
        }
    }
}

/// Build a zero-padded output packet (report id included)
pub fn encode_packet(framing: Framing, command: Command, payload: &[u8]) -> Result<[u8; PACKET_SIZE]> {
    if payload.len() > framing.max_payload() {
        return Err(Error::PayloadTooLarge {
            len: payload.len(),
            max: framing.max_payload(),
        });
    }

    let mut packet = [0u8; PACKET_SIZE];
    packet[0] = REPORT_ID;
    if framing == Framing::Broadcast {
        packet[1..5].copy_from_slice(&BROADCAST_CHANNEL);
    }
    let cmd_at = framing.command_offset();
    packet[cmd_at] = command.code();
    packet[cmd_at + 1..cmd_at + 1 + payload.len()].copy_from_slice(payload);
    Ok(packet)
}

/// Payload for a custom command: big-endian length followed by the data
pub fn custom_payload(data: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + data.len());
    payload.extend_from_slice(&(data.len() as u16).to_be_bytes());
    payload.extend_from_slice(data);
    payload
}

/// Payload for SEED: the length field is always [`MAX_SEED_CHUNK`]
///
/// A shorter final chunk is followed by the zero padding of the packet, so
/// the token always mixes a full chunk.
pub fn seed_payload(chunk: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + MAX_SEED_CHUNK);
    payload.extend_from_slice(&(MAX_SEED_CHUNK as u16).to_be_bytes());
    payload.extend_from_slice(&chunk[..chunk.len().min(MAX_SEED_CHUNK)]);
    payload
}

/// A packet as seen by the token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<'a> {
    /// Framing the host used
    pub framing: Framing,
    /// Raw command byte
    pub command: u8,
    /// Everything after the command byte (including padding)
    pub payload: &'a [u8],
}

/// Split an output packet back into framing, command and payload
///
/// Used by device emulators; returns `None` for packets too short to carry
/// a command or with a non-zero report id.
pub fn decode_packet(packet: &[u8]) -> Option<Request<'_>> {
    if packet.len() < 2 || packet[0] != REPORT_ID {
        return None;
    }
    let framing = if packet.len() > 5 && packet[1..5] == BROADCAST_CHANNEL {
        Framing::Broadcast
    } else {
        Framing::Short
    };
    let cmd_at = framing.command_offset();
    Some(Request {
        framing,
        command: packet[cmd_at],
        payload: &packet[cmd_at + 1..],
    })
}

/// An input report received from the token
#[derive(Clone, PartialEq, Eq)]
pub struct Response {
    data: [u8; REPORT_SIZE],
    len: usize,
}

impl Response {
    /// Wrap received bytes; anything past [`REPORT_SIZE`] is dropped
    pub fn new(bytes: &[u8]) -> Self {
        let len = bytes.len().min(REPORT_SIZE);
        let mut data = [0u8; REPORT_SIZE];
        data[..len].copy_from_slice(&bytes[..len]);
        Self { data, len }
    }

    /// Bytes actually received
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Number of bytes received
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the token sent nothing
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte at `offset`, if it was received
    pub fn byte(&self, offset: usize) -> Option<u8> {
        self.as_bytes().get(offset).copied()
    }

    /// Slice of `len` bytes at `offset`, if fully received
    pub fn slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.as_bytes().get(offset..offset.checked_add(len)?)
    }

    /// Whether the byte at `offset` carries the success marker
    pub fn status_ok(&self, offset: usize) -> bool {
        self.byte(offset) == Some(STATUS_OK)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Response({:02x?})", self.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes() {
        assert_eq!(Command::GetSerialNum.code(), 0x80);
        assert_eq!(Command::BootloaderDestroy.code(), 0x89);
        assert_eq!(Command::Wink.code(), 0x24);
        for cmd in Command::ALL {
            assert_eq!(Command::from_code(cmd.code()), Some(cmd));
        }
        assert_eq!(Command::from_code(0x00), None);
    }

    #[test]
    fn test_short_packet_layout() {
        let packet = encode_packet(Framing::Short, Command::Lock, &[0x89, 0xEB]).unwrap();
        assert_eq!(packet.len(), PACKET_SIZE);
        assert_eq!(&packet[..4], &[0x00, 0x83, 0x89, 0xEB]);
        assert!(packet[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_broadcast_packet_layout() {
        let packet =
            encode_packet(Framing::Broadcast, Command::Seed, &custom_payload(&[7, 8])).unwrap();
        assert_eq!(
            &packet[..10],
            &[0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x22, 0x00, 0x02, 7, 8]
        );
    }

    #[test]
    fn test_seed_payload_declares_full_chunk() {
        let packet =
            encode_packet(Framing::Broadcast, Command::Seed, &seed_payload(&[7, 8, 9])).unwrap();
        assert_eq!(
            &packet[..12],
            &[0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x22, 0x00, 20, 7, 8, 9, 0]
        );
        assert!(packet[11..].iter().all(|&b| b == 0));
        assert_eq!(seed_payload(&[1; 25]).len(), 2 + MAX_SEED_CHUNK);
    }

    #[test]
    fn test_payload_limits() {
        assert!(encode_packet(Framing::Short, Command::LoadWriteKey, &[0; 63]).is_ok());
        assert!(matches!(
            encode_packet(Framing::Short, Command::LoadWriteKey, &[0; 64]),
            Err(Error::PayloadTooLarge { len: 64, max: 63 })
        ));
        assert!(encode_packet(Framing::Broadcast, Command::Seed, &[0; 59]).is_ok());
        assert!(encode_packet(Framing::Broadcast, Command::Seed, &[0; 60]).is_err());
    }

    #[test]
    fn test_decode_packet() {
        let short = encode_packet(Framing::Short, Command::IsBuild, &[]).unwrap();
        let req = decode_packet(&short).unwrap();
        assert_eq!(req.framing, Framing::Short);
        assert_eq!(req.command, 0x81);

        let bcast = encode_packet(Framing::Broadcast, Command::Wink, &[0, 0]).unwrap();
        let req = decode_packet(&bcast).unwrap();
        assert_eq!(req.framing, Framing::Broadcast);
        assert_eq!(req.command, 0x24);
        assert_eq!(req.payload.len(), PACKET_SIZE - 6);

        assert!(decode_packet(&[0x01, 0x81]).is_none());
        assert!(decode_packet(&[0x00]).is_none());
    }

    #[test]
    fn test_response_accessors() {
        let resp = Response::new(&[0x80, 3, 0xAA, 0xBB, 0xCC]);
        assert_eq!(resp.len(), 5);
        assert_eq!(resp.byte(1), Some(3));
        assert_eq!(resp.byte(5), None);
        assert_eq!(resp.slice(2, 3), Some(&[0xAA, 0xBB, 0xCC][..]));
        assert_eq!(resp.slice(2, 4), None);
        assert!(!resp.status_ok(0));
        assert!(Response::new(&[]).is_empty());
    }
}
