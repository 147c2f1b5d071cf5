// Constants
/// Size of a Transport Stream packet in bytes
pub const TS_PACKET_SIZE: usize = 188;
/// Size of the fixed Transport Stream header in bytes
pub const TS_HEADER_SIZE: usize = 4;
/// Sync byte value at the start of every TS packet
pub const TS_SYNC_BYTE: u8 = 0x47;
/// PID reserved for NULL (padding) packets
pub const TS_NULL_PID: u16 = 0x1fff;

/// Program Clock Reference carried in the adaptation field
///
/// The PCR is a 42-bit sender clock split into a 33-bit base running at
/// 90 kHz and a 9-bit extension running at 27 MHz. The merger orders and
/// switches streams on the base value alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pcr {
    /// 33-bit PCR base (90 kHz ticks)
    pub base: u64,
    /// 9-bit PCR extension (27 MHz ticks, always < 300)
    pub extension: u16,
}

/// Adaptation field of a TS packet
///
/// Only the fields the merger consumes are retained. The unbounded
/// sub-fields (private data, adaptation extension) are validated for
/// structural overflow during parsing and then discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdaptationField {
    /// Adaptation field length as declared on the wire (1..=183)
    pub length: u8,
    /// Discontinuity indicator
    pub discontinuity: bool,
    /// Random access indicator
    pub random_access: bool,
    /// Elementary stream priority indicator
    pub es_priority: bool,
    /// Program Clock Reference, if the PCR flag is set
    pub pcr: Option<Pcr>,
    /// Original Program Clock Reference, if the OPCR flag is set
    pub opcr: Option<Pcr>,
    /// Splice countdown, if the splicing point flag is set
    pub splice_countdown: Option<i8>,
}

/// Parsed view of a 188-byte Transport Stream packet header
///
/// Produced by [`parse_header`](super::parser::parse_header). The merger
/// consumes `pid` and the adaptation field's PCR; the remaining fields
/// are cheap to extract and useful for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TsHeader {
    /// Sync byte, always 0x47 for a valid packet
    pub sync_byte: u8,
    /// Transport error indicator
    pub transport_error: bool,
    /// Payload unit start indicator
    pub payload_unit_start: bool,
    /// Transport priority
    pub transport_priority: bool,
    /// 13-bit Packet Identifier
    pub pid: u16,
    /// 2-bit transport scrambling control
    pub scrambling_control: u8,
    /// Whether the packet carries a payload
    pub contains_payload: bool,
    /// 4-bit continuity counter
    pub continuity_counter: u8,
    /// Adaptation field, when present with a non-zero length
    pub adaptation_field: Option<AdaptationField>,
    /// Byte offset of the payload within the packet
    pub payload_offset: usize,
}

impl TsHeader {
    /// Returns the PCR base if this packet carries a PCR.
    pub fn pcr_base(&self) -> Option<u64> {
        self.adaptation_field.and_then(|af| af.pcr).map(|pcr| pcr.base)
    }

    /// Returns true if the adaptation field carries a PCR.
    pub fn has_pcr(&self) -> bool {
        self.adaptation_field.map_or(false, |af| af.pcr.is_some())
    }
}
