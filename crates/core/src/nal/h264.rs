//! H.264 NAL unit header and RFC 6184 payload framing.
//!
//! ```text
//! +---------------+
//! |0|1|2|3|4|5|6|7|
//! +-+-+-+-+-+-+-+-+
//! |F|NRI|  Type   |
//! +---------------+
//! ```

use std::fmt;

use super::{ForbiddenZeroBit, NalCodec, PacketizationMode, split_aggregation_units};
use crate::error::{ParseErrorKind, Result, RtpError};

fn first_byte(buf: &[u8]) -> Result<u8> {
    buf.first()
        .copied()
        .ok_or_else(|| RtpError::parse(ParseErrorKind::NalHeader, 1, 0))
}

/// `nal_ref_idc`: 2 bits, bits 5–6 of the header byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct NalRefIdc(pub u8);

impl NalRefIdc {
    pub const MASK: u8 = 0x60;
    pub const OFFSET: u8 = 5;

    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        Ok(Self((first_byte(buf)? & Self::MASK) >> Self::OFFSET))
    }

    pub fn marshal(self) -> u8 {
        (self.0 << Self::OFFSET) & Self::MASK
    }
}

/// `nal_unit_type`: 5 bits (ITU-T H.264 Table 7-1).
///
/// Stored as the raw value so every bit pattern round-trips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NalUnitType(pub u8);

impl NalUnitType {
    pub const MASK: u8 = 0x1f;

    pub const UNSPECIFIED: Self = Self(0);
    pub const SLICE: Self = Self(1);
    pub const DPA: Self = Self(2);
    pub const DPB: Self = Self(3);
    pub const DPC: Self = Self(4);
    pub const IDR_SLICE: Self = Self(5);
    pub const SEI: Self = Self(6);
    pub const SPS: Self = Self(7);
    pub const PPS: Self = Self(8);
    pub const AUD: Self = Self(9);
    pub const END_SEQUENCE: Self = Self(10);
    pub const END_STREAM: Self = Self(11);
    pub const FILLER_DATA: Self = Self(12);
    pub const SPS_EXT: Self = Self(13);
    pub const PREFIX: Self = Self(14);
    pub const SUB_SPS: Self = Self(15);
    pub const DPS: Self = Self(16);
    pub const AUXILIARY_SLICE: Self = Self(19);
    pub const EXTEN_SLICE: Self = Self(20);
    pub const DEPTH_EXTEN_SLICE: Self = Self(21);

    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        Ok(Self(first_byte(buf)? & Self::MASK))
    }

    pub fn marshal(self) -> u8 {
        self.0 & Self::MASK
    }
}

impl fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "unspecified"),
            1 => write!(f, "slice"),
            2 => write!(f, "dpa"),
            3 => write!(f, "dpb"),
            4 => write!(f, "dpc"),
            5 => write!(f, "idr slice"),
            6 => write!(f, "sei"),
            7 => write!(f, "sps"),
            8 => write!(f, "pps"),
            9 => write!(f, "aud"),
            10 => write!(f, "end sequence"),
            11 => write!(f, "end stream"),
            12 => write!(f, "filler data"),
            13 => write!(f, "sps ext"),
            14 => write!(f, "prefix"),
            15 => write!(f, "sub sps"),
            16 => write!(f, "dps"),
            19 => write!(f, "auxiliary slice"),
            20 => write!(f, "exten slice"),
            21 => write!(f, "depth exten slice"),
            n @ (17 | 18 | 22 | 23) => write!(f, "reserved {n}"),
            n @ 24..=31 => write!(f, "unspecified {n}"),
            n => write!(f, "unknown nalu type {n}"),
        }
    }
}

/// One-byte H.264 NAL unit header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NalHeader {
    pub forbidden_zero_bit: ForbiddenZeroBit,
    pub nal_ref_idc: NalRefIdc,
    pub nal_unit_type: NalUnitType,
}

impl NalHeader {
    pub const MARSHAL_SIZE: usize = 1;

    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        Ok(Self {
            forbidden_zero_bit: ForbiddenZeroBit::unmarshal(buf)?,
            nal_ref_idc: NalRefIdc::unmarshal(buf)?,
            nal_unit_type: NalUnitType::unmarshal(buf)?,
        })
    }

    pub fn marshal(self) -> u8 {
        self.forbidden_zero_bit.marshal() | self.nal_ref_idc.marshal() | self.nal_unit_type.marshal()
    }
}

/// The FU indicator has the NAL header layout with type 28.
pub type FuIndicator = NalHeader;

/// Packet type carried in the payload header's type field (RFC 6184 Table 1).
///
/// ```text
/// NAL Unit  Packet    Packet Type Name               Section
/// Type      Type
/// -------------------------------------------------------------
/// 0        reserved                                     -
/// 1-23     NAL unit  Single NAL unit packet             5.6
/// 24       STAP-A    Single-time aggregation packet     5.7.1
/// 25       STAP-B    Single-time aggregation packet     5.7.1
/// 26       MTAP16    Multi-time aggregation packet      5.7.2
/// 27       MTAP24    Multi-time aggregation packet      5.7.2
/// 28       FU-A      Fragmentation unit                 5.8
/// 29       FU-B      Fragmentation unit                 5.8
/// 30-31    reserved                                     -
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpPacketType(pub u8);

impl RtpPacketType {
    pub const STAP_A: Self = Self(24);
    pub const STAP_B: Self = Self(25);
    pub const MTAP16: Self = Self(26);
    pub const MTAP24: Self = Self(27);
    pub const FU_A: Self = Self(28);
    pub const FU_B: Self = Self(29);

    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        Ok(Self(NalUnitType::unmarshal(buf)?.0))
    }

    pub fn nal_unit_type(self) -> NalUnitType {
        NalUnitType(self.0 & NalUnitType::MASK)
    }

    pub fn mode(self) -> PacketizationMode {
        match self.0 & NalUnitType::MASK {
            1..=23 => PacketizationMode::SingleNalUnit,
            24..=27 => PacketizationMode::AggregationPacket,
            28 | 29 => PacketizationMode::FragmentationUnit,
            _ => PacketizationMode::Reserved,
        }
    }

    pub fn is_single_nal_unit(self) -> bool {
        self.mode() == PacketizationMode::SingleNalUnit
    }

    pub fn is_single_time_aggregation(self) -> bool {
        self == Self::STAP_A || self == Self::STAP_B
    }

    pub fn is_multi_time_aggregation(self) -> bool {
        self == Self::MTAP16 || self == Self::MTAP24
    }

    pub fn is_fragmentation_unit(self) -> bool {
        self.mode() == PacketizationMode::FragmentationUnit
    }

    pub fn is_reserved(self) -> bool {
        self.mode() == PacketizationMode::Reserved
    }

    /// Bytes of framing in front of the NAL data for this packet type.
    pub fn header_size(self) -> usize {
        match self {
            Self::STAP_B | Self::MTAP16 | Self::MTAP24 => 1 + 2,
            Self::FU_A => 1 + 1,
            Self::FU_B => 1 + 1 + 2,
            _ => 1,
        }
    }
}

/// FU header (RFC 6184 §5.8).
///
/// ```text
/// +---------------+
/// |0|1|2|3|4|5|6|7|
/// +-+-+-+-+-+-+-+-+
/// |S|E|R|  Type   |
/// +---------------+
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuHeader {
    pub start_bit: bool,
    pub end_bit: bool,
    pub nal_unit_type: NalUnitType,
}

impl FuHeader {
    pub const START_BIT_MASK: u8 = 0x80;
    pub const END_BIT_MASK: u8 = 0x40;
    /// Offset of the FU header within an FU-A payload.
    pub const BYTE_INDEX: usize = 1;

    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        let byte0 = buf
            .first()
            .copied()
            .ok_or_else(|| RtpError::parse(ParseErrorKind::FuHeader, 1, 0))?;
        Ok(Self {
            start_bit: byte0 & Self::START_BIT_MASK != 0,
            end_bit: byte0 & Self::END_BIT_MASK != 0,
            nal_unit_type: NalUnitType(byte0 & NalUnitType::MASK),
        })
    }

    pub fn marshal(self) -> u8 {
        let mut byte0 = self.nal_unit_type.marshal();
        if self.start_bit {
            byte0 |= Self::START_BIT_MASK;
        }
        if self.end_bit {
            byte0 |= Self::END_BIT_MASK;
        }
        byte0
    }

    /// Read the FU header out of a complete FU-A payload.
    pub fn parse(rtp_payload: &[u8]) -> Result<Self> {
        let buf = rtp_payload.get(Self::BYTE_INDEX..).unwrap_or_default();
        Self::unmarshal(buf)
    }
}

/// RFC 6184 framing for the packetization engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct H264;

impl NalCodec for H264 {
    const NAME: &'static str = "H264";
    const NAL_HEADER_SIZE: usize = NalHeader::MARSHAL_SIZE;
    const AGGREGATION_HEADER_SIZE: usize = 1;
    const FRAGMENTATION_HEADER_SIZE: usize = 2;

    type NalHeader = NalHeader;

    fn nal_header(nal: &[u8]) -> Result<NalHeader> {
        NalHeader::unmarshal(nal)
    }

    /// STAP-A indicator: F is set if any unit has F set; NRI is the
    /// maximum NRI of the aggregated units (RFC 6184 §5.7).
    fn write_aggregation_header(headers: &[NalHeader], out: &mut Vec<u8>) {
        let indicator = FuIndicator {
            forbidden_zero_bit: ForbiddenZeroBit(headers.iter().any(|h| h.forbidden_zero_bit.0)),
            nal_ref_idc: headers.iter().map(|h| h.nal_ref_idc).max().unwrap_or_default(),
            nal_unit_type: RtpPacketType::STAP_A.nal_unit_type(),
        };
        out.push(indicator.marshal());
    }

    fn write_fragmentation_header(header: NalHeader, start: bool, end: bool, out: &mut Vec<u8>) {
        let indicator = FuIndicator {
            nal_unit_type: RtpPacketType::FU_A.nal_unit_type(),
            ..header
        };
        let fu_header = FuHeader {
            start_bit: start,
            end_bit: end,
            nal_unit_type: header.nal_unit_type,
        };
        out.push(indicator.marshal());
        out.push(fu_header.marshal());
    }

    fn is_aud_or_filler(header: NalHeader) -> bool {
        header.nal_unit_type == NalUnitType::AUD || header.nal_unit_type == NalUnitType::FILLER_DATA
    }
}

/// Metadata reconstructed from a received H.264 RTP payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct H264Packet {
    /// The payload header (a NAL header, STAP-A or FU indicator).
    pub header: NalHeader,
    /// Everything after the payload header, copied out of the input.
    pub payload: Vec<u8>,
}

impl H264Packet {
    pub fn unmarshal(rtp_payload: &[u8]) -> Result<Self> {
        let header = NalHeader::unmarshal(rtp_payload)?;
        Ok(Self {
            header,
            payload: rtp_payload[NalHeader::MARSHAL_SIZE..].to_vec(),
        })
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.marshal_size());
        out.push(self.header.marshal());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn marshal_size(&self) -> usize {
        NalHeader::MARSHAL_SIZE + self.payload.len()
    }

    pub fn packet_type(&self) -> RtpPacketType {
        RtpPacketType(self.header.nal_unit_type.0)
    }

    /// FU header of an FU-A / FU-B packet.
    pub fn fu_header(&self) -> Option<FuHeader> {
        if !self.packet_type().is_fragmentation_unit() {
            return None;
        }
        FuHeader::unmarshal(&self.payload).ok()
    }

    /// Fragment bytes of an FU-A packet (after the FU header).
    pub fn fu_payload(&self) -> Option<&[u8]> {
        if self.packet_type() != RtpPacketType::FU_A {
            return None;
        }
        self.payload.get(1..)
    }

    /// NAL units carried by a STAP-A packet. Empty for other packet types.
    pub fn aggregation_units(&self) -> Result<Vec<&[u8]>> {
        if self.packet_type() != RtpPacketType::STAP_A {
            return Ok(Vec::new());
        }
        split_aggregation_units(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nal_header_fields() {
        // 0x67 = 0 11 00111: SPS with NRI 3
        let h = NalHeader::unmarshal(&[0x67]).unwrap();
        assert!(!h.forbidden_zero_bit.0);
        assert_eq!(h.nal_ref_idc, NalRefIdc(3));
        assert_eq!(h.nal_unit_type, NalUnitType::SPS);
        assert_eq!(h.marshal(), 0x67);
    }

    #[test]
    fn nal_header_round_trips_every_byte() {
        for b in 0..=255u8 {
            assert_eq!(NalHeader::unmarshal(&[b]).unwrap().marshal(), b);
        }
    }

    #[test]
    fn nal_header_empty_buffer() {
        assert!(matches!(
            NalHeader::unmarshal(&[]),
            Err(RtpError::Parse {
                kind: ParseErrorKind::NalHeader,
                ..
            })
        ));
        assert!(NalRefIdc::unmarshal(&[]).is_err());
        assert!(NalUnitType::unmarshal(&[]).is_err());
    }

    #[test]
    fn nal_unit_type_names() {
        assert_eq!(NalUnitType::IDR_SLICE.to_string(), "idr slice");
        assert_eq!(NalUnitType(17).to_string(), "reserved 17");
        assert_eq!(NalUnitType(30).to_string(), "unspecified 30");
    }

    #[test]
    fn packet_type_classification() {
        assert_eq!(RtpPacketType(0).mode(), PacketizationMode::Reserved);
        for t in 1..=23 {
            assert!(RtpPacketType(t).is_single_nal_unit());
            assert_eq!(RtpPacketType(t).header_size(), 1);
        }
        assert!(RtpPacketType::STAP_A.is_single_time_aggregation());
        assert!(RtpPacketType::STAP_B.is_single_time_aggregation());
        assert!(RtpPacketType::MTAP16.is_multi_time_aggregation());
        assert!(RtpPacketType::MTAP24.is_multi_time_aggregation());
        assert!(RtpPacketType::FU_A.is_fragmentation_unit());
        assert!(RtpPacketType::FU_B.is_fragmentation_unit());
        assert!(RtpPacketType(30).is_reserved());
        assert!(RtpPacketType(31).is_reserved());
    }

    #[test]
    fn packet_type_header_sizes() {
        assert_eq!(RtpPacketType::STAP_A.header_size(), 1);
        assert_eq!(RtpPacketType::STAP_B.header_size(), 3);
        assert_eq!(RtpPacketType::MTAP16.header_size(), 3);
        assert_eq!(RtpPacketType::FU_A.header_size(), 2);
        assert_eq!(RtpPacketType::FU_B.header_size(), 4);
        assert_eq!(H264::AGGREGATION_HEADER_SIZE, RtpPacketType::STAP_A.header_size());
        assert_eq!(H264::FRAGMENTATION_HEADER_SIZE, RtpPacketType::FU_A.header_size());
    }

    #[test]
    fn fu_header_bits_are_independent() {
        let start_only = FuHeader {
            start_bit: true,
            end_bit: false,
            nal_unit_type: NalUnitType::IDR_SLICE,
        };
        assert_eq!(start_only.marshal(), 0x85);

        let end_only = FuHeader {
            start_bit: false,
            end_bit: true,
            ..start_only
        };
        assert_eq!(end_only.marshal(), 0x45);

        let middle = FuHeader {
            start_bit: false,
            end_bit: false,
            ..start_only
        };
        assert_eq!(middle.marshal(), 0x05);

        assert_eq!(FuHeader::unmarshal(&[0x85]).unwrap(), start_only);
        assert_eq!(FuHeader::unmarshal(&[0x45]).unwrap(), end_only);
    }

    #[test]
    fn fu_header_parse_from_payload() {
        let h = FuHeader::parse(&[0x7c, 0x45, 0xAA]).unwrap();
        assert!(h.end_bit);
        assert!(!h.start_bit);
        assert!(FuHeader::parse(&[0x7c]).is_err());
    }

    #[test]
    fn fragmentation_header_copies_f_and_nri() {
        let header = NalHeader::unmarshal(&[0x65]).unwrap();
        let mut out = Vec::new();
        H264::write_fragmentation_header(header, true, false, &mut out);
        // NRI 3 | type 28, S | type 5
        assert_eq!(out, vec![0x7c, 0x85]);
    }

    #[test]
    fn aggregation_header_takes_max_nri() {
        let sps = NalHeader::unmarshal(&[0x27]).unwrap(); // NRI 1
        let pps = NalHeader::unmarshal(&[0x48]).unwrap(); // NRI 2
        let mut out = Vec::new();
        H264::write_aggregation_header(&[sps, pps], &mut out);
        assert_eq!(out, vec![0x40 | 24]);
    }

    #[test]
    fn packet_unmarshal_single_nal() {
        let p = H264Packet::unmarshal(&[0x65, 0xAA, 0xBB]).unwrap();
        assert_eq!(p.header.nal_unit_type, NalUnitType::IDR_SLICE);
        assert!(p.packet_type().is_single_nal_unit());
        assert_eq!(p.payload, vec![0xAA, 0xBB]);
        assert_eq!(p.marshal(), vec![0x65, 0xAA, 0xBB]);
        assert!(p.fu_header().is_none());
        assert!(H264Packet::unmarshal(&[]).is_err());
    }

    #[test]
    fn packet_unmarshal_fu_a() {
        let p = H264Packet::unmarshal(&[0x7c, 0x85, 0x01, 0x02]).unwrap();
        let fu = p.fu_header().unwrap();
        assert!(fu.start_bit);
        assert_eq!(fu.nal_unit_type, NalUnitType::IDR_SLICE);
        assert_eq!(p.fu_payload(), Some(&[0x01, 0x02][..]));
    }

    #[test]
    fn packet_unmarshal_stap_a() {
        let p = H264Packet::unmarshal(&[0x78, 0, 2, 0x67, 0x42, 0, 2, 0x68, 0xCE]).unwrap();
        assert_eq!(p.packet_type(), RtpPacketType::STAP_A);
        let units = p.aggregation_units().unwrap();
        assert_eq!(units, vec![&[0x67, 0x42][..], &[0x68, 0xCE][..]]);
    }
}
