#![doc(html_root_url = "https://docs.rs/tsmerge/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsmerge - Redundant MPEG-TS feed merger
//!
//! `tsmerge` merges multiple redundant MPEG Transport Stream feeds —
//! each produced by an independent receiver station observing the same
//! broadcast — into a single coherent output stream, and fans that
//! stream out to live TCP viewers.
//!
//! Stations relay their received TS packets over UDP, framed with a
//! callsign and a per-station sequence counter. Packets arrive with
//! independent latency, reordering and loss per station; the merger
//! buffers each station in a time-indexed ring, reconstructs stream
//! segments delimited by Program Clock Reference (PCR) markers, and
//! repeatedly selects, across stations, the segment that best continues
//! from the last emitted PCR.
//!
//! ## Components
//!
//! - [`merger`]: the core — per-station ring buffers, PCR segment
//!   discovery, cross-station selection, and the `next()` pull
//!   interface viewers read the output chain through
//! - [`format::ts`]: the minimal TS header view the merger consumes
//!   (PID, PCR presence, 33-bit PCR base)
//! - [`format::mx`]: the 204-byte ingest envelope stations send
//! - [`net`]: async drivers — UDP ingest, update tick, TCP fan-out
//! - [`config`]: runtime settings for the daemon
//!
//! ## Feeding the core directly
//!
//! ```rust
//! use bytes::BytesMut;
//! use tsmerge::format::mx::write_record;
//! use tsmerge::format::ts::TS_PACKET_SIZE;
//! use tsmerge::merger::Merger;
//!
//! let mut merger = Merger::new(256);
//!
//! // One station record: a payload packet on PID 512.
//! let mut ts = [0xffu8; TS_PACKET_SIZE];
//! ts[..4].copy_from_slice(&[0x47, 0x02, 0x00, 0x10]);
//! let mut record = BytesMut::new();
//! write_record(&mut record, 0, &"GB3HV".parse().unwrap(), &ts);
//!
//! merger.feed(0, &record).unwrap();
//!
//! // Without two PCR boundaries there is no segment to publish yet.
//! assert!(!merger.update(2_000));
//! ```
//!
//! ## Running the daemon
//!
//! The `tsmerge` binary binds UDP 5678 for station ingest and TCP 5679
//! for viewers; the `tspush` binary frames a TS file (or stdin) into
//! ingest records and streams them to a merger.
//!
//! ```text
//! tspush --callsign MI0VIM-15 --host merger.example.net capture.ts
//! ```

/// Runtime settings for the daemon
pub mod config;

/// Error types and utilities
pub mod error;

/// Wire formats: TS header view and the ingest envelope
pub mod format;

/// The merger core
pub mod merger;

/// Async network drivers over the core
pub mod net;

pub use error::{Result, TsMergeError};
pub use merger::Merger;
