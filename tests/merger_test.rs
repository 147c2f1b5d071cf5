//! End-to-end scenarios over the merger's public API: a driver feeds
//! station records, updates until no more segments publish, and drains
//! a viewer through `next()` after every round, the way the network
//! loop does.

use bytes::BytesMut;
use pretty_assertions::assert_eq;
use tsmerge::format::mx::write_record;
use tsmerge::format::ts::TS_PACKET_SIZE;
use tsmerge::merger::{ChainLink, Merger};

const PCR_PID: u16 = 256;
const PAYLOAD_PID: u16 = 512;

fn ts_packet(pid: u16, pcr_base: Option<u64>) -> [u8; TS_PACKET_SIZE] {
    let mut data = [0xffu8; TS_PACKET_SIZE];
    data[0] = 0x47;
    data[1] = ((pid >> 8) & 0x1f) as u8;
    data[2] = (pid & 0xff) as u8;
    match pcr_base {
        Some(base) => {
            data[3] = 0x30;
            data[4] = 7; // flags + 6 PCR bytes
            data[5] = 0x10;
            data[6] = (base >> 25) as u8;
            data[7] = (base >> 17) as u8;
            data[8] = (base >> 9) as u8;
            data[9] = (base >> 1) as u8;
            data[10] = (((base & 1) << 7) as u8) | 0x7e;
            data[11] = 0;
        }
        None => data[3] = 0x10,
    }
    data
}

fn record(callsign: &str, counter: u32, ts: &[u8; TS_PACKET_SIZE]) -> BytesMut {
    let mut buf = BytesMut::new();
    write_record(&mut buf, counter, &callsign.parse().unwrap(), ts);
    buf
}

fn link(station: usize, counter: u32) -> ChainLink {
    ChainLink { station, counter }
}

/// Feeds one station packet: a PCR boundary when `pcr` is set, payload
/// otherwise.
fn feed(merger: &mut Merger, now: i64, callsign: &str, counter: u32, pcr: Option<u64>) {
    let pid = if pcr.is_some() { PCR_PID } else { PAYLOAD_PID };
    merger
        .feed(now, &record(callsign, counter, &ts_packet(pid, pcr)))
        .unwrap();
}

/// Drains everything deliverable for one viewer, returning the visited
/// positions and advancing the viewer's anchor.
fn drain(merger: &Merger, last: &mut Option<ChainLink>) -> Vec<ChainLink> {
    let mut out = Vec::new();
    while let Some(packet) = merger.next(*last) {
        let position = packet.link().expect("delivered packets carry their identity");
        out.push(position);
        *last = Some(position);
    }
    out
}

/// Runs the driver loop: update until exhausted, draining the viewer
/// after every published segment.
fn run_driver(merger: &mut Merger, now: i64, last: &mut Option<ChainLink>) -> Vec<ChainLink> {
    let mut out = Vec::new();
    loop {
        let progressed = merger.update(now);
        out.extend(drain(merger, last));
        if !progressed {
            break;
        }
    }
    out
}

/// PCR bases of the delivered packets that carry one.
fn pcr_trail(merger: &Merger, chain: &[ChainLink]) -> Vec<u64> {
    chain
        .iter()
        .filter_map(|&l| merger.get(l).and_then(|p| p.pcr_base()))
        .collect()
}

#[test]
fn single_station_linear() {
    let mut merger = Merger::new(PCR_PID);
    feed(&mut merger, 0, "A", 0, Some(100));
    feed(&mut merger, 10, "A", 1, None);
    feed(&mut merger, 20, "A", 2, Some(200));
    feed(&mut merger, 30, "A", 3, None);
    feed(&mut merger, 40, "A", 4, Some(300));

    let mut last = None;
    assert!(merger.update(1_500));
    // First segment [0, 2) publishes with its left boundary as head.
    assert_eq!(merger.head(), Some(link(0, 0)));

    let mut delivered = drain(&merger, &mut last);
    delivered.extend(run_driver(&mut merger, 1_500, &mut last));

    let counters: Vec<u32> = delivered.iter().map(|l| l.counter).collect();
    assert_eq!(counters, vec![0, 1, 2, 3]);
    // Counter 4 stays pending as the next segment's boundary.
    assert_eq!(merger.next(last), None);
}

#[test]
fn two_stations_interleave_by_pcr() {
    let mut merger = Merger::new(PCR_PID);
    // A carries PCRs 100, 200, 300; B carries 150, 250, 350. A trailing
    // boundary on each closes the last segment.
    for (i, base) in [100u64, 200, 300, 400].iter().enumerate() {
        feed(&mut merger, i as i64 * 10, "A", i as u32 * 2, Some(*base));
        feed(&mut merger, i as i64 * 10, "A", i as u32 * 2 + 1, None);
    }
    for (i, base) in [150u64, 250, 350, 450].iter().enumerate() {
        feed(&mut merger, i as i64 * 10, "B", i as u32 * 2, Some(*base));
        feed(&mut merger, i as i64 * 10, "B", i as u32 * 2 + 1, None);
    }

    let mut last = None;
    let delivered = run_driver(&mut merger, 2_000, &mut last);

    let pcrs = pcr_trail(&merger, &delivered);
    assert_eq!(pcrs, vec![100, 150, 200, 250, 300, 350]);

    // Segments alternate between the stations offering the smaller PCR.
    let stations: Vec<usize> = delivered
        .iter()
        .filter(|&&l| merger.get(l).map_or(false, |p| p.pcr_base().is_some()))
        .map(|l| l.station)
        .collect();
    assert_eq!(stations, vec![0, 1, 0, 1, 0, 1]);
}

#[test]
fn chain_pcr_is_monotone() {
    let mut merger = Merger::new(PCR_PID);
    for (i, base) in [100u64, 200, 300, 400].iter().enumerate() {
        feed(&mut merger, i as i64, "A", i as u32 * 2, Some(*base));
        feed(&mut merger, i as i64, "A", i as u32 * 2 + 1, None);
    }
    for (i, base) in [150u64, 250, 350].iter().enumerate() {
        feed(&mut merger, i as i64, "B", i as u32 * 2, Some(*base));
        feed(&mut merger, i as i64, "B", i as u32 * 2 + 1, None);
    }

    let mut last = None;
    let delivered = run_driver(&mut merger, 2_000, &mut last);

    let pcrs = pcr_trail(&merger, &delivered);
    assert!(pcrs.windows(2).all(|w| w[0] <= w[1]), "pcrs: {:?}", pcrs);
}

#[test]
fn equal_pcr_ties_prefer_the_current_station() {
    let mut merger = Merger::new(PCR_PID);
    // Both stations carry the identical boundary sequence.
    for callsign in ["A", "B"] {
        for (i, base) in [100u64, 200, 300].iter().enumerate() {
            feed(&mut merger, i as i64, callsign, i as u32 * 2, Some(*base));
            feed(&mut merger, i as i64, callsign, i as u32 * 2 + 1, None);
        }
    }

    // Fresh tie: the lowest station index wins.
    assert!(merger.update(2_000));
    assert_eq!(merger.head(), Some(link(0, 0)));

    // B takes over at PCR 100 (A's next offer is already at 200).
    assert!(merger.update(2_000));
    assert_eq!(merger.head(), Some(link(1, 0)));

    // At the 200/200 tie the currently-published station stays.
    assert!(merger.update(2_000));
    assert_eq!(merger.head(), Some(link(1, 2)));
}

#[test]
fn viewer_reanchors_to_the_published_head() {
    let mut merger = Merger::new(PCR_PID);
    feed(&mut merger, 0, "A", 0, Some(100));
    feed(&mut merger, 10, "A", 1, None);
    feed(&mut merger, 20, "A", 2, Some(200));
    while merger.update(1_500) {}

    // The viewer's anchor never existed; it falls back to the head.
    let reanchored = merger.next(Some(link(0, 9_999))).unwrap();
    assert_eq!(reanchored.link(), Some(link(0, 0)));

    // With nothing published the fallback is absent too.
    let empty = Merger::new(PCR_PID);
    assert!(empty.next(Some(link(0, 9_999))).is_none());
}

#[test]
fn reordered_feed_converges_to_the_in_order_chain() {
    let in_order: Vec<u32> = (0..6).collect();
    let shuffled: Vec<u32> = vec![0, 3, 1, 5, 2, 4];
    let pcr_of = |counter: u32| match counter {
        0 => Some(100),
        2 => Some(200),
        4 => Some(300),
        _ => None,
    };

    let mut chains = Vec::new();
    for order in [&in_order, &shuffled] {
        let mut merger = Merger::new(PCR_PID);
        for (i, &counter) in order.iter().enumerate() {
            feed(&mut merger, i as i64, "A", counter, pcr_of(counter));
        }
        let mut last = None;
        let delivered = run_driver(&mut merger, 2_000, &mut last);
        chains.push(delivered.iter().map(|l| l.counter).collect::<Vec<_>>());
    }

    assert_eq!(chains[0], chains[1]);
    assert_eq!(chains[0], vec![0, 1, 2, 3]);
}

#[test]
fn raw_bytes_are_delivered_verbatim() {
    let mut merger = Merger::new(PCR_PID);
    let boundary = ts_packet(PCR_PID, Some(100));
    let payload = ts_packet(PAYLOAD_PID, None);
    let closer = ts_packet(PCR_PID, Some(200));

    merger.feed(0, &record("A", 0, &boundary)).unwrap();
    merger.feed(10, &record("A", 1, &payload)).unwrap();
    merger.feed(20, &record("A", 2, &closer)).unwrap();
    while merger.update(1_500) {}

    let head = merger.next(None).unwrap();
    assert_eq!(head.raw(), &boundary);
    let second = merger.next(head.link()).unwrap();
    assert_eq!(second.raw(), &payload);
}
