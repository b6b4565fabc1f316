//! NAL unit headers and RTP payload-format framing.
//!
//! H.264 (RFC 6184) and H.265 (RFC 7798) share the same packetization
//! model but differ in header width:
//!
//! | Codec | NAL header | Aggregation | Fragmentation |
//! |-------|-----------|-------------|---------------|
//! | H.264 | 1 byte `[F\|NRI\|Type]` | STAP-A (24), 1-byte indicator | FU-A (28), indicator + FU header |
//! | H.265 | 2 bytes `[F\|Type\|LayerId\|TID]` | AP (48), 2-byte PayloadHdr | FU (49), PayloadHdr + FU header |
//!
//! [`NalCodec`] captures those differences so the packetization engine in
//! [`crate::media::nalu`] is written once.

pub mod h264;
pub mod h265;

use crate::error::{ParseErrorKind, Result, RtpError};

/// Codec-specific NAL framing used by the packetization engine.
pub trait NalCodec {
    /// Codec name for logging (e.g. `"H264"`).
    const NAME: &'static str;

    /// Width of the NAL unit header in bytes.
    const NAL_HEADER_SIZE: usize;

    /// Bytes in front of the first aggregation unit (STAP-A indicator / AP PayloadHdr).
    const AGGREGATION_HEADER_SIZE: usize;

    /// Bytes in front of every fragment (FU indicator + FU header / PayloadHdr + FU header).
    const FRAGMENTATION_HEADER_SIZE: usize;

    /// Parsed NAL unit header.
    type NalHeader: Copy + std::fmt::Debug;

    /// Parse the header at the front of `nal`.
    fn nal_header(nal: &[u8]) -> Result<Self::NalHeader>;

    /// Append the aggregation packet header covering `headers`.
    fn write_aggregation_header(headers: &[Self::NalHeader], out: &mut Vec<u8>);

    /// Append the per-fragment header(s) for a NAL unit with `header`.
    fn write_fragmentation_header(header: Self::NalHeader, start: bool, end: bool, out: &mut Vec<u8>);

    /// Access unit delimiters and filler data carry nothing a receiver needs.
    fn is_aud_or_filler(header: Self::NalHeader) -> bool;
}

/// RTP payload structure selected by the payload header's type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketizationMode {
    /// The payload is exactly one NAL unit.
    SingleNalUnit,
    /// STAP-A/STAP-B/MTAP (H.264) or AP (H.265).
    AggregationPacket,
    /// FU-A/FU-B (H.264) or FU (H.265).
    FragmentationUnit,
    /// Payload content information (H.265 only, RFC 7798 §4.4.4).
    Paci,
    /// Type values with no payload structure assigned.
    Reserved,
}

/// The `F` bit shared by H.264 and H.265 NAL unit headers (bit 7 of byte 0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForbiddenZeroBit(pub bool);

impl ForbiddenZeroBit {
    pub const MASK: u8 = 0x80;

    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        let byte0 = buf
            .first()
            .ok_or_else(|| RtpError::parse(ParseErrorKind::NalHeader, 1, 0))?;
        Ok(Self(byte0 & Self::MASK != 0))
    }

    /// The bit in position within a header byte.
    pub fn marshal(self) -> u8 {
        if self.0 { Self::MASK } else { 0 }
    }
}

/// Split the body of a STAP-A / AP payload into its NAL units.
///
/// `body` starts right after the aggregation header; each unit is a 16-bit
/// big-endian size followed by that many bytes.
pub fn split_aggregation_units(mut body: &[u8]) -> Result<Vec<&[u8]>> {
    let mut units = Vec::new();
    while !body.is_empty() {
        if body.len() < 2 {
            return Err(RtpError::parse(ParseErrorKind::AggregationUnit, 2, body.len()));
        }
        let size = u16::from_be_bytes([body[0], body[1]]) as usize;
        let rest = &body[2..];
        if rest.len() < size {
            return Err(RtpError::parse(ParseErrorKind::AggregationUnit, size, rest.len()));
        }
        units.push(&rest[..size]);
        body = &rest[size..];
    }
    Ok(units)
}
