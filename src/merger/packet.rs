use crate::format::ts::{TsHeader, TS_PACKET_SIZE};

/// Position of a packet inside the merger: station index plus the
/// sender-assigned 32-bit counter.
///
/// The output chain is a linked list of these rather than pointers, so a
/// link survives slot eviction: following a stale link yields "absent"
/// instead of dangling, and viewers re-anchor to the published head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLink {
    /// Index into the merger's station table
    pub station: usize,
    /// Sender-assigned sequence counter
    pub counter: u32,
}

/// One slot in a station's ring buffer.
///
/// A slot is valid for `(station, counter)` iff its `tag` matches that
/// exact pair; anything else (never written, or overwritten by a later
/// counter that maps to the same ring index) reads as absent. This
/// identity check replaces an occupancy bitmap and makes eviction a
/// plain overwrite.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketSlot {
    /// Identity of the occupant, `None` until first written
    pub(crate) tag: Option<ChainLink>,
    /// Wall-clock receive time at the merger, milliseconds
    pub(crate) timestamp_ms: i64,
    /// Parsed TS header; `None` when the header failed to parse. Such
    /// packets are still carried to viewers but never act as segment
    /// boundaries.
    pub(crate) header: Option<TsHeader>,
    /// The verbatim TS packet bytes, emitted unchanged to viewers
    pub(crate) raw: [u8; TS_PACKET_SIZE],
    /// Forward link along the output chain
    pub(crate) next: Option<ChainLink>,
}

impl Default for PacketSlot {
    fn default() -> Self {
        Self {
            tag: None,
            timestamp_ms: 0,
            header: None,
            raw: [0u8; TS_PACKET_SIZE],
            next: None,
        }
    }
}

impl PacketSlot {
    /// The slot's identity, usable as a viewer anchor for
    /// [`Merger::next`](super::Merger::next).
    pub fn link(&self) -> Option<ChainLink> {
        self.tag
    }

    /// The verbatim 188-byte TS packet.
    pub fn raw(&self) -> &[u8; TS_PACKET_SIZE] {
        &self.raw
    }

    /// Whether the TS header parsed cleanly.
    pub fn parse_ok(&self) -> bool {
        self.header.is_some()
    }

    /// The parsed TS header, if valid.
    pub fn header(&self) -> Option<&TsHeader> {
        self.header.as_ref()
    }

    /// PCR base of this packet, if it carries one.
    pub fn pcr_base(&self) -> Option<u64> {
        self.header.as_ref().and_then(|h| h.pcr_base())
    }

    /// Receive timestamp in milliseconds.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Forward link along the output chain, if already spliced.
    pub fn next_link(&self) -> Option<ChainLink> {
        self.next
    }
}
