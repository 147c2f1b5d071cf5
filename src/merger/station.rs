use super::packet::{ChainLink, PacketSlot};
use super::segment::Segment;
use super::{RING_SLOTS, STATION_TIMEOUT_MS};
use crate::format::mx::Callsign;

/// Ring index for a counter: the low 16 bits.
pub(crate) fn ring_index(counter: u32) -> usize {
    counter as usize & (RING_SLOTS - 1)
}

/// One tracked upstream source and its packet ring.
///
/// The ring holds the last 2^16 counters' worth of packets; older slots
/// are evicted by overwrite and detected through the slot identity tag.
/// Stations are never destroyed: a silent station stops being live after
/// [`STATION_TIMEOUT_MS`] and its slot is reclaimed by the next unknown
/// callsign.
#[derive(Debug)]
pub(crate) struct Station {
    /// Callsign; empty marks a free table slot
    pub(crate) callsign: Callsign,
    /// Counter at which segment discovery scans forward, and the late
    /// threshold for ingest. Counters are compared via signed 32-bit
    /// deltas, so ordering is only defined within a window of ±2^31 —
    /// far beyond any practical packet rate.
    pub(crate) current: u32,
    /// Highest counter ever received
    pub(crate) latest: u32,
    /// Receive time of the most recent packet, drives liveness
    pub(crate) last_seen_ms: i64,
    /// The currently-pinned segment offer, if any
    pub(crate) segment: Option<Segment>,
    /// Consumed right boundary to resume discovery from
    pub(crate) resume: Option<u32>,
    /// The packet ring, addressed by `counter mod 2^16`
    pub(crate) ring: Vec<PacketSlot>,
}

impl Station {
    /// Allocates the station with its full ring. This is the only
    /// allocation a station ever performs; steady-state operation
    /// reuses the slots in place.
    pub(crate) fn new() -> Self {
        Self {
            callsign: Callsign::default(),
            current: 0,
            latest: 0,
            last_seen_ms: 0,
            segment: None,
            resume: None,
            ring: vec![PacketSlot::default(); RING_SLOTS],
        }
    }

    /// True when the table slot holds no station.
    pub(crate) fn is_free(&self) -> bool {
        self.callsign.is_empty()
    }

    /// A station is live iff it has a callsign and its most recent
    /// packet arrived within the timeout, the boundary included.
    pub(crate) fn is_live(&self, now_ms: i64) -> bool {
        !self.is_free() && self.last_seen_ms >= now_ms - STATION_TIMEOUT_MS
    }

    /// Re-initializes the station for `callsign`, positioned at
    /// `counter`. Every ring slot is invalidated; prior packets become
    /// unreachable from then on.
    pub(crate) fn reset(&mut self, callsign: Callsign, counter: u32) {
        self.callsign = callsign;
        self.current = counter;
        self.latest = counter;
        self.last_seen_ms = 0;
        self.segment = None;
        self.resume = None;
        for slot in &mut self.ring {
            slot.tag = None;
            slot.next = None;
        }
    }

    /// Borrow of the raw slot a counter maps to, ignoring identity.
    pub(crate) fn slot(&self, counter: u32) -> &PacketSlot {
        &self.ring[ring_index(counter)]
    }

    /// Mutable borrow of the raw slot a counter maps to.
    pub(crate) fn slot_mut(&mut self, counter: u32) -> &mut PacketSlot {
        &mut self.ring[ring_index(counter)]
    }

    /// The slot for `link`, only if its identity matches exactly.
    /// Absorbs ring wrap: an older occupant of the same ring index
    /// fails the tag comparison and reads as absent.
    pub(crate) fn lookup(&self, link: ChainLink) -> Option<&PacketSlot> {
        let slot = self.slot(link.counter);
        if slot.tag == Some(link) {
            Some(slot)
        } else {
            None
        }
    }

    /// Mutable variant of [`lookup`](Self::lookup).
    pub(crate) fn lookup_mut(&mut self, link: ChainLink) -> Option<&mut PacketSlot> {
        let slot = self.slot_mut(link.counter);
        if slot.tag == Some(link) {
            Some(slot)
        } else {
            None
        }
    }
}
