//! Segment discovery within one station's ring.
//!
//! A segment is the half-open counter range `[left, right)` between two
//! successive packets that sit on the PCR PID and carry a valid PCR: the
//! left boundary plus every present packet up to, but excluding, the
//! right boundary. The scanner doubles as the intra-station chain
//! builder: while walking forward it lays down the `next` links viewers
//! later traverse, so the cross-station selector only has to splice
//! between stations.
//!
//! A discovered segment stays pinned and is re-offered on every
//! selection round until the selector publishes it (consuming it) or one
//! of its edges is evicted from the ring. Losing a selection round does
//! not cost a station its segment.

use super::packet::ChainLink;
use super::station::{ring_index, Station};
use super::GUARD_MS;

/// A pinned segment: both PCR boundaries plus the last content packet,
/// which is where the next segment gets spliced on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment {
    /// Left PCR boundary; the segment's head packet
    pub(crate) left: u32,
    /// Right PCR boundary; excluded from the segment's content
    pub(crate) right: u32,
    /// Last content packet (the left boundary itself when the segment
    /// has no interior packets)
    pub(crate) tail: u32,
}

impl Station {
    /// Scans counters from `from` through `latest` for the next packet
    /// that can serve as a segment boundary: present, cleanly parsed,
    /// on the PCR PID, carrying a PCR, and older than the guard window.
    /// A PCR packet still inside the guard window is skipped, not a
    /// stop condition: slower peers get [`GUARD_MS`] to deliver a
    /// competing copy before selection commits, and the skipped packet
    /// is carried as ordinary segment content.
    ///
    /// Side effect: every present non-boundary packet walked is linked
    /// from its predecessor (`prev` seeds the predecessor), so the
    /// intra-station chain is in place before the segment can publish.
    /// Repeat scans over the same range re-lay the links, healing the
    /// chain around packets that arrived out of order in the meantime.
    /// The returned boundary itself is never linked to; the splice at
    /// publish time decides what follows the segment's tail.
    ///
    /// Returns the boundary counter and the predecessor it was found
    /// behind.
    pub(crate) fn next_pcr(
        &mut self,
        index: usize,
        pcr_pid: u16,
        now_ms: i64,
        from: u32,
        mut prev: Option<u32>,
    ) -> Option<(u32, Option<u32>)> {
        let end = self.latest.wrapping_add(1);
        let mut counter = from;

        while counter != end {
            let link = ChainLink {
                station: index,
                counter,
            };

            if self.ring[ring_index(counter)].tag != Some(link) {
                counter = counter.wrapping_add(1);
                continue;
            }

            let slot = &self.ring[ring_index(counter)];
            let is_boundary = slot
                .header
                .map_or(false, |h| h.pid == pcr_pid && h.has_pcr())
                && slot.timestamp_ms < now_ms - GUARD_MS;

            if is_boundary {
                return Some((counter, prev));
            }

            if let Some(prev_counter) = prev {
                self.ring[ring_index(prev_counter)].next = Some(link);
            }
            prev = Some(counter);
            counter = counter.wrapping_add(1);
        }

        None
    }

    /// The station's current segment offer, discovering a new one when
    /// nothing is pinned.
    ///
    /// A pinned segment is returned as-is while both its edges are
    /// intact, so an offer that loses a selection round survives to the
    /// next one. Discovery resumes from the last consumed right
    /// boundary when its slot is still valid (the old right edge is the
    /// new left edge); otherwise it rescans forward from `current`.
    /// Pinning a segment moves `current` past its right boundary, which
    /// closes the range to stragglers: from then on the ingest path
    /// drops those counters as late.
    pub(crate) fn advance_segment(
        &mut self,
        index: usize,
        pcr_pid: u16,
        now_ms: i64,
    ) -> Option<Segment> {
        if let Some(seg) = self.segment {
            let left_ok = self.has_packet(index, seg.left);
            let right_ok = self.has_packet(index, seg.right);
            if left_ok && right_ok {
                return Some(seg);
            }
            // An edge was evicted; drop the pin but keep the surviving
            // right boundary as the place to resume from.
            self.segment = None;
            self.resume = if right_ok { Some(seg.right) } else { None };
        }

        let left = match self.resume {
            Some(counter) if self.has_packet(index, counter) => counter,
            _ => {
                self.next_pcr(index, pcr_pid, now_ms, self.current, None)?
                    .0
            }
        };

        let (right, tail) =
            self.next_pcr(index, pcr_pid, now_ms, left.wrapping_add(1), Some(left))?;

        let segment = Segment {
            left,
            right,
            tail: tail.unwrap_or(left),
        };
        self.segment = Some(segment);
        self.resume = None;
        self.current = right.wrapping_add(1);

        Some(segment)
    }

    /// Releases the pinned segment after it was published (or skipped);
    /// the next offer continues from its right boundary.
    pub(crate) fn consume_segment(&mut self) {
        if let Some(seg) = self.segment.take() {
            self.resume = Some(seg.right);
        }
    }

    fn has_packet(&self, index: usize, counter: u32) -> bool {
        self.lookup(ChainLink {
            station: index,
            counter,
        })
        .is_some()
    }
}
