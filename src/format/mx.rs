//! # Ingest envelope ("MX") format
//!
//! Receiver stations relay TS packets to the merger as fixed 204-byte
//! records over UDP, one or more per datagram:
//!
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 0x00   | 2    | Magic `0xA1 0x55`                       |
//! | 0x02   | 4    | Counter (unsigned, little-endian)       |
//! | 0x06   | 10   | Callsign (NUL-padded)                   |
//! | 0x10   | 188  | Raw TS packet (starts with `0x47`)      |
//!
//! The counter starts at 0 and increments by 1 per packet sent by the
//! station; the callsign identifies the station (first-seen callsigns
//! auto-register at the merger).

use crate::error::{Result, TsMergeError};
use crate::format::ts::TS_PACKET_SIZE;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::str::FromStr;

/// Magic bytes at the start of every ingest record
pub const MX_MAGIC: [u8; 2] = [0xa1, 0x55];
/// Total size of one ingest record
pub const MX_RECORD_LEN: usize = 0x10 + TS_PACKET_SIZE;
/// Maximum callsign length in bytes
pub const CALLSIGN_LEN: usize = 10;

const COUNTER_OFFSET: usize = 0x02;
const CALLSIGN_OFFSET: usize = 0x06;
const TS_OFFSET: usize = 0x10;

/// A station callsign: up to 10 bytes, NUL-padded on the wire.
///
/// An all-NUL callsign (empty first byte) marks a free station slot and
/// is never a valid on-air identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Callsign([u8; CALLSIGN_LEN]);

impl Callsign {
    /// Wraps the raw NUL-padded wire bytes.
    pub fn from_bytes(bytes: [u8; CALLSIGN_LEN]) -> Self {
        Self(bytes)
    }

    /// The NUL-padded wire representation.
    pub fn as_bytes(&self) -> &[u8; CALLSIGN_LEN] {
        &self.0
    }

    /// True for the all-NUL callsign marking a free slot.
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

impl fmt::Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(CALLSIGN_LEN);
        write!(f, "{}", String::from_utf8_lossy(&self.0[..len]))
    }
}

impl FromStr for Callsign {
    type Err = TsMergeError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(TsMergeError::InvalidData("callsign cannot be empty".into()));
        }
        if s.len() > CALLSIGN_LEN {
            return Err(TsMergeError::InvalidData(format!(
                "callsign '{}' longer than {} bytes",
                s, CALLSIGN_LEN
            )));
        }
        let mut bytes = [0u8; CALLSIGN_LEN];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self(bytes))
    }
}

/// Borrowed view of one parsed ingest record.
#[derive(Debug)]
pub struct MxRecord<'a> {
    /// Sender-assigned 32-bit sequence counter
    pub counter: u32,
    /// Station callsign
    pub callsign: Callsign,
    /// The verbatim 188-byte TS packet
    pub ts: &'a [u8],
}

impl<'a> MxRecord<'a> {
    /// Parses one 204-byte record.
    ///
    /// Fails on a short or oversized slice and on a wrong magic; both
    /// cause the record to be dropped by the ingest dispatcher.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() != MX_RECORD_LEN {
            return Err(TsMergeError::InvalidData(format!(
                "ingest record is {} bytes, expected {}",
                data.len(),
                MX_RECORD_LEN
            )));
        }

        if data[0..2] != MX_MAGIC {
            return Err(TsMergeError::InvalidData("bad ingest record magic".into()));
        }

        let counter = u32::from_le_bytes([
            data[COUNTER_OFFSET],
            data[COUNTER_OFFSET + 1],
            data[COUNTER_OFFSET + 2],
            data[COUNTER_OFFSET + 3],
        ]);

        let mut callsign = [0u8; CALLSIGN_LEN];
        callsign.copy_from_slice(&data[CALLSIGN_OFFSET..CALLSIGN_OFFSET + CALLSIGN_LEN]);

        Ok(Self {
            counter,
            callsign: Callsign::from_bytes(callsign),
            ts: &data[TS_OFFSET..],
        })
    }
}

/// Appends one 204-byte ingest record to `buf`.
pub fn write_record(
    buf: &mut BytesMut,
    counter: u32,
    callsign: &Callsign,
    ts: &[u8; TS_PACKET_SIZE],
) {
    buf.reserve(MX_RECORD_LEN);
    buf.put_slice(&MX_MAGIC);
    buf.put_u32_le(counter);
    buf.put_slice(callsign.as_bytes());
    buf.put_slice(ts);
}
