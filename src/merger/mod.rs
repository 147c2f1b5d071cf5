//! # Merger core
//!
//! Reconstructs one coherent TS stream out of several redundant feeds of
//! the same broadcast. Each receiver station relays its packets over UDP
//! with a per-station counter; the merger buffers them in per-station
//! rings, discovers PCR-delimited segments, and repeatedly picks, across
//! stations, the segment best continuing from the last emitted PCR.
//! Viewers pull the resulting chain packet-by-packet through
//! [`Merger::next`].
//!
//! The core is deliberately passive: it owns no sockets, reads no clock
//! and spawns nothing. A driver loop feeds it received records, ticks
//! [`Merger::update`] until no more progress is reported, then drains
//! viewers:
//!
//! ```rust
//! use tsmerge::merger::Merger;
//!
//! let mut merger = Merger::new(256);
//!
//! // No stations have fed anything yet: no output is deliverable and
//! // update reports no progress.
//! assert!(!merger.update(1_000));
//! assert!(merger.next(None).is_none());
//! ```
//!
//! All mutation must stay confined to a single owner; the async drivers
//! in [`net`](crate::net) share one merger behind a single mutex, since
//! every update reads every station anyway.

use crate::format::mx::Callsign;
use thiserror::Error;

/// Core packet record types
pub mod packet;

mod core;
mod segment;
mod station;

pub use self::core::Merger;
pub use packet::{ChainLink, PacketSlot};

/// Capacity of the station table
pub const STATION_SLOTS: usize = 8;
/// Slots per station ring; counters are mapped by their low 16 bits
pub const RING_SLOTS: usize = 1 << 16;
/// A station with no packet for this long is no longer live
pub const STATION_TIMEOUT_MS: i64 = 10_000;
/// PCR packets younger than this are not yet eligible as segment
/// boundaries, giving late-arriving peer packets time to land
pub const GUARD_MS: i64 = 1_000;

/// Data-level reasons an ingest record is dropped.
///
/// None of these are fatal: the dispatcher logs and moves on to the next
/// record. Counter resets are not errors at all — the station is
/// silently reinitialized and the packet accepted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// Framing envelope was malformed (wrong length or magic)
    #[error("malformed ingest record: {0}")]
    MalformedFrame(String),

    /// The station's stream position has already moved past this counter
    #[error("late packet for station {station} (counter {counter})")]
    LatePacket {
        /// Station table index
        station: usize,
        /// The late counter
        counter: u32,
    },

    /// This exact `(station, counter)` packet is already buffered
    #[error("duplicate packet from station {station} (counter {counter})")]
    DuplicatePacket {
        /// Station table index
        station: usize,
        /// The duplicated counter
        counter: u32,
    },

    /// Unknown callsign and every table slot is occupied by a live station
    #[error("no free station slot for {callsign}")]
    StationTableFull {
        /// The callsign that could not be registered
        callsign: Callsign,
    },
}
