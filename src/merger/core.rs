use super::packet::{ChainLink, PacketSlot};
use super::segment::Segment;
use super::station::Station;
use super::{FeedError, STATION_SLOTS};
use crate::format::mx::{Callsign, MxRecord};
use crate::format::ts::parse_header;
use log::{debug, info};

/// The merger core: a station table of time-indexed packet rings, the
/// cross-station segment selector, and the pull interface viewers read
/// the output chain through.
///
/// The core is synchronous and single-owner. It never reads the clock —
/// every entry point takes the caller's wall-clock milliseconds — and it
/// never raises to its caller beyond the data-level [`FeedError`] drops;
/// see the module docs for the driving contract.
pub struct Merger {
    /// The PID whose PCR-carrying packets delimit segments
    pcr_pid: u16,
    /// Most recent wall-clock seen, clamped to a running maximum so a
    /// regressing driver clock cannot loosen liveness or guard checks
    now_ms: i64,
    /// Head packet (left PCR boundary) of the most recently published
    /// segment; where re-anchoring viewers join the chain
    head: Option<ChainLink>,
    /// Last content packet of the published chain; where the next
    /// segment is spliced on
    tail: Option<ChainLink>,
    /// Fixed station table
    stations: Vec<Station>,
}

impl Merger {
    /// Creates a merger that treats `pcr_pid` as the PCR clock PID.
    ///
    /// All station rings are allocated here, up front; no further
    /// allocation happens while the merger runs.
    pub fn new(pcr_pid: u16) -> Self {
        Self {
            pcr_pid,
            now_ms: 0,
            head: None,
            tail: None,
            stations: (0..STATION_SLOTS).map(|_| Station::new()).collect(),
        }
    }

    /// The PID used as the PCR clock.
    pub fn pcr_pid(&self) -> u16 {
        self.pcr_pid
    }

    /// Head packet of the most recently published segment, if any.
    pub fn head(&self) -> Option<ChainLink> {
        self.head
    }

    fn touch(&mut self, now_ms: i64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Fetches the packet at `link`, or absent.
    ///
    /// This is the sole read primitive: it returns a slot only if the
    /// owning station is live and the slot's identity matches `link`
    /// exactly, which absorbs both ring wrap and station staleness.
    pub fn get(&self, link: ChainLink) -> Option<&PacketSlot> {
        let station = self.stations.get(link.station)?;
        if !station.is_live(self.now_ms) {
            return None;
        }
        station.lookup(link)
    }

    fn get_mut(&mut self, link: ChainLink) -> Option<&mut PacketSlot> {
        let now_ms = self.now_ms;
        let station = self.stations.get_mut(link.station)?;
        if !station.is_live(now_ms) {
            return None;
        }
        station.lookup_mut(link)
    }

    /// Station index with a matching callsign that is still live.
    fn lookup_station(&self, callsign: &Callsign) -> Option<usize> {
        self.stations
            .iter()
            .position(|st| !st.is_free() && st.callsign == *callsign && st.is_live(self.now_ms))
    }

    /// First reusable station slot: timed out, or never used.
    fn free_station(&self) -> Option<usize> {
        self.stations
            .iter()
            .position(|st| !st.is_live(self.now_ms) || st.is_free())
    }

    /// Ingests one 204-byte framed record received at `now_ms`.
    ///
    /// Resolves or auto-registers the station, detects counter resets
    /// (a delta beyond ±0xFFFF reinitializes the station), rejects late
    /// and duplicate packets, and writes the packet into the ring slot
    /// its counter addresses. A packet whose TS header fails to parse
    /// is stored anyway; it is carried to viewers verbatim but never
    /// becomes a segment boundary.
    pub fn feed(&mut self, now_ms: i64, record: &[u8]) -> Result<(), FeedError> {
        self.touch(now_ms);

        let record = MxRecord::parse(record)
            .map_err(|e| FeedError::MalformedFrame(e.to_string()))?;
        if record.callsign.is_empty() {
            return Err(FeedError::MalformedFrame("empty callsign".into()));
        }
        let counter = record.counter;

        let index = match self.lookup_station(&record.callsign) {
            Some(index) => {
                let delta = counter.wrapping_sub(self.stations[index].current) as i32;
                if !(-0xffff..=0xffff).contains(&delta) {
                    info!("station {} ({}) counter reset", index, record.callsign);
                    self.stations[index].reset(record.callsign, counter);
                } else if delta <= 0 {
                    // The stream position has already moved past this
                    // counter; too late to use it.
                    return Err(FeedError::LatePacket {
                        station: index,
                        counter,
                    });
                }
                index
            }
            None => {
                let index = self.free_station().ok_or(FeedError::StationTableFull {
                    callsign: record.callsign,
                })?;
                info!("new station {} got slot {}", record.callsign, index);
                self.stations[index].reset(record.callsign, counter);
                index
            }
        };

        let link = ChainLink {
            station: index,
            counter,
        };
        let station = &mut self.stations[index];

        if station.slot(counter).tag == Some(link) {
            return Err(FeedError::DuplicatePacket {
                station: index,
                counter,
            });
        }

        let header = match parse_header(record.ts) {
            Ok(header) => Some(header),
            Err(e) => {
                debug!("station {}: unparseable TS packet at {}: {}", index, counter, e);
                None
            }
        };

        let slot = station.slot_mut(counter);
        slot.tag = Some(link);
        slot.timestamp_ms = now_ms;
        slot.header = header;
        slot.raw.copy_from_slice(record.ts);
        slot.next = None;

        if (counter.wrapping_sub(station.latest) as i32) > 0 {
            station.latest = counter;
        }
        station.last_seen_ms = now_ms;

        Ok(())
    }

    /// Publishes at most one more segment on the output chain.
    ///
    /// Every live station offers its next segment at or beyond the PCR
    /// floor — the PCR of the chain's current head packet — discarding
    /// segments the chain has already moved past. The station offering
    /// the smallest such PCR wins; a losing offer stays pinned for the
    /// next round. On an exact PCR tie the currently-published station
    /// is kept (no pointless switch), otherwise the lowest station
    /// index wins.
    ///
    /// Returns `true` when a segment was published. Drivers call this in
    /// a loop until it returns `false`; at that point a repeat call with
    /// the same timestamp is a no-op.
    pub fn update(&mut self, now_ms: i64) -> bool {
        self.touch(now_ms);
        let pcr_pid = self.pcr_pid;
        let now_ms = self.now_ms;

        let floor_packet = self.head.and_then(|link| self.get(link));
        let floor_known = floor_packet.is_some();
        let pcr_floor = floor_packet.and_then(|p| p.pcr_base()).unwrap_or(0);
        let head_station = self.head.map(|link| link.station);

        // (station, left-edge pcr, segment) of the best offer
        let mut best: Option<(usize, u64, Segment)> = None;

        for index in 0..self.stations.len() {
            if !self.stations[index].is_live(now_ms) {
                continue;
            }

            // Discard segments that start before the floor; the first
            // one at or beyond it is this station's offer.
            let offer = loop {
                let station = &mut self.stations[index];
                match station.advance_segment(index, pcr_pid, now_ms) {
                    None => break None,
                    Some(seg) => {
                        let pcr = station.slot(seg.left).pcr_base().unwrap_or(0);
                        if pcr >= pcr_floor {
                            break Some((pcr, seg));
                        }
                        station.consume_segment();
                    }
                }
            };

            let Some((pcr, seg)) = offer else {
                continue;
            };

            best = match best {
                None => Some((index, pcr, seg)),
                Some((_, best_pcr, _)) if pcr < best_pcr => Some((index, pcr, seg)),
                Some((_, best_pcr, _)) if pcr == best_pcr && head_station == Some(index) => {
                    Some((index, pcr, seg))
                }
                keep => keep,
            };
        }

        let Some((index, pcr, seg)) = best else {
            return false;
        };

        // Splice the published chain onto the new segment. When the
        // floor equals the new PCR, another station is taking over at a
        // PCR moment whose boundary packet has already been emitted, so
        // the chain skips the new left edge and continues at the packet
        // after it.
        let left_link = ChainLink {
            station: index,
            counter: seg.left,
        };
        let target = if floor_known && pcr == pcr_floor {
            self.stations[index].slot(seg.left).next
        } else {
            Some(left_link)
        };
        if let Some(tail_link) = self.tail {
            if let Some(tail_packet) = self.get_mut(tail_link) {
                tail_packet.next = target;
            }
        }

        self.head = Some(left_link);
        self.tail = Some(ChainLink {
            station: index,
            counter: seg.tail,
        });
        self.stations[index].consume_segment();

        true
    }

    /// The packet following a viewer's last-delivered position.
    ///
    /// With no anchor, or an anchor whose slot has been evicted, the
    /// viewer is re-anchored to the head of the published chain — a
    /// discontinuity, but a recoverable one. Absent means nothing is
    /// deliverable right now; the caller retries after the next update.
    pub fn next(&self, last: Option<ChainLink>) -> Option<&PacketSlot> {
        match last.and_then(|link| self.get(link)) {
            None => self.head.and_then(|link| self.get(link)),
            Some(packet) => packet.next.and_then(|link| self.get(link)),
        }
    }
}
