//! # MPEG Transport Stream (TS) header view
//!
//! A minimal, allocation-free view over 188-byte TS packets. The merger
//! only needs the PID, the PCR-present flag and the 33-bit PCR base of
//! each packet, but the parser extracts the full fixed header and the
//! bounded adaptation-field fields while it is at it.
//!
//! ```rust
//! use tsmerge::format::ts::{parse_header, TS_PACKET_SIZE};
//!
//! let mut packet = [0xffu8; TS_PACKET_SIZE];
//! packet[..4].copy_from_slice(&[0x47, 0x01, 0x00, 0x10]);
//!
//! let header = parse_header(&packet).unwrap();
//! assert_eq!(header.pid, 0x100);
//! assert!(header.pcr_base().is_none());
//! ```

/// Low-level TS header parsing
pub mod parser;

/// Core TS types and constants
pub mod types;

pub use parser::parse_header;
pub use types::{
    AdaptationField, Pcr, TsHeader, TS_HEADER_SIZE, TS_NULL_PID, TS_PACKET_SIZE, TS_SYNC_BYTE,
};
