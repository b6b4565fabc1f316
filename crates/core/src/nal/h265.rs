//! H.265 (HEVC) NAL unit header and RFC 7798 payload framing.
//!
//! ```text
//!  0                   1
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |F|   Type    |  LayerId  | TID |
//! +-------------+-----------------+
//! ```
//!
//! The RTP payload header (`PayloadHdr`) reuses this layout; only the type
//! field changes (48 = AP, 49 = FU, 50 = PACI). DONL/DOND fields are not
//! supported (`sprop-max-don-diff` is assumed to be 0).

use std::fmt;

use super::{ForbiddenZeroBit, NalCodec, PacketizationMode, split_aggregation_units};
use crate::error::{ParseErrorKind, Result, RtpError};

fn header_word(buf: &[u8]) -> Result<u16> {
    match buf {
        [b0, b1, ..] => Ok(u16::from_be_bytes([*b0, *b1])),
        _ => Err(RtpError::parse(ParseErrorKind::NalHeader, 2, buf.len())),
    }
}

/// `nal_unit_type`: 6 bits, bits 1–6 of byte 0 (ITU-T H.265 Table 7-1).
///
/// Stored as the raw value so every bit pattern round-trips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NalUnitType(pub u8);

impl NalUnitType {
    pub const MASK: u8 = 0x3f << Self::OFFSET;
    pub const OFFSET: u8 = 1;

    pub const TRAIL_N: Self = Self(0);
    pub const TRAIL_R: Self = Self(1);
    pub const TSA_N: Self = Self(2);
    pub const TSA_R: Self = Self(3);
    pub const STSA_N: Self = Self(4);
    pub const STSA_R: Self = Self(5);
    pub const RADL_N: Self = Self(6);
    pub const RADL_R: Self = Self(7);
    pub const RASL_N: Self = Self(8);
    pub const RASL_R: Self = Self(9);
    pub const BLA_W_LP: Self = Self(16);
    pub const BLA_W_RADL: Self = Self(17);
    pub const BLA_N_LP: Self = Self(18);
    pub const IDR_W_RADL: Self = Self(19);
    pub const IDR_N_LP: Self = Self(20);
    pub const CRA_NUT: Self = Self(21);
    pub const VPS_NUT: Self = Self(32);
    pub const SPS_NUT: Self = Self(33);
    pub const PPS_NUT: Self = Self(34);
    pub const AUD_NUT: Self = Self(35);
    pub const EOS_NUT: Self = Self(36);
    pub const EOB_NUT: Self = Self(37);
    pub const FD_NUT: Self = Self(38);
    pub const PREFIX_SEI_NUT: Self = Self(39);
    pub const SUFFIX_SEI_NUT: Self = Self(40);

    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        let byte0 = buf
            .first()
            .copied()
            .ok_or_else(|| RtpError::parse(ParseErrorKind::NalHeader, 1, 0))?;
        Ok(Self((byte0 & Self::MASK) >> Self::OFFSET))
    }

    /// The type positioned within byte 0 of the header.
    pub fn marshal(self) -> u8 {
        (self.0 << Self::OFFSET) & Self::MASK
    }

    /// VCL types occupy 0–31.
    pub fn is_vcl(self) -> bool {
        self.0 < 32
    }
}

impl fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            0 => "TRAIL_N",
            1 => "TRAIL_R",
            2 => "TSA_N",
            3 => "TSA_R",
            4 => "STSA_N",
            5 => "STSA_R",
            6 => "RADL_N",
            7 => "RADL_R",
            8 => "RASL_N",
            9 => "RASL_R",
            16 => "BLA_W_LP",
            17 => "BLA_W_RADL",
            18 => "BLA_N_LP",
            19 => "IDR_W_RADL",
            20 => "IDR_N_LP",
            21 => "CRA_NUT",
            32 => "VPS_NUT",
            33 => "SPS_NUT",
            34 => "PPS_NUT",
            35 => "AUD_NUT",
            36 => "EOS_NUT",
            37 => "EOB_NUT",
            38 => "FD_NUT",
            39 => "PREFIX_SEI_NUT",
            40 => "SUFFIX_SEI_NUT",
            n @ (10..=15 | 22..=31) => return write!(f, "RSV_VCL{n}"),
            n @ 41..=47 => return write!(f, "RSV_NVCL{n}"),
            n @ 48..=63 => return write!(f, "UNSPEC{n}"),
            n => return write!(f, "unknown nalu type {n}"),
        };
        f.write_str(name)
    }
}

/// `nuh_layer_id`: 6 bits spanning the byte boundary (mask `0x01f8` of the
/// big-endian header word).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct NalLayerId(pub u8);

impl NalLayerId {
    pub const MASK: u16 = 0x01f8;
    pub const OFFSET: u16 = 3;

    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        Ok(Self(((header_word(buf)? & Self::MASK) >> Self::OFFSET) as u8))
    }

    /// The two header bytes with only the layer id bits set.
    pub fn marshal(self) -> [u8; 2] {
        ((u16::from(self.0) << Self::OFFSET) & Self::MASK).to_be_bytes()
    }
}

/// `nuh_temporal_id_plus1`: 3 bits, bits 0–2 of byte 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct NalTemporalId(pub u8);

impl NalTemporalId {
    pub const MASK: u8 = 0x07;
    pub const BYTE_INDEX: usize = 1;

    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        let byte1 = buf
            .get(Self::BYTE_INDEX)
            .copied()
            .ok_or_else(|| RtpError::parse(ParseErrorKind::NalHeader, 2, buf.len()))?;
        Ok(Self(byte1 & Self::MASK))
    }

    pub fn marshal(self) -> u8 {
        self.0 & Self::MASK
    }
}

/// Two-byte H.265 NAL unit header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NalHeader {
    pub forbidden_zero_bit: ForbiddenZeroBit,
    pub nal_unit_type: NalUnitType,
    pub nal_layer_id: NalLayerId,
    pub nal_temporal_id: NalTemporalId,
}

impl NalHeader {
    pub const MARSHAL_SIZE: usize = 2;

    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::MARSHAL_SIZE {
            return Err(RtpError::parse(ParseErrorKind::NalHeader, Self::MARSHAL_SIZE, buf.len()));
        }
        Ok(Self {
            forbidden_zero_bit: ForbiddenZeroBit::unmarshal(buf)?,
            nal_unit_type: NalUnitType::unmarshal(buf)?,
            nal_layer_id: NalLayerId::unmarshal(buf)?,
            nal_temporal_id: NalTemporalId::unmarshal(buf)?,
        })
    }

    pub fn marshal(self) -> [u8; 2] {
        let layer = self.nal_layer_id.marshal();
        [
            self.forbidden_zero_bit.marshal() | self.nal_unit_type.marshal() | layer[0],
            layer[1] | self.nal_temporal_id.marshal(),
        ]
    }
}

/// RTP payload header; same layout as the NAL unit header.
pub type PayloadHdr = NalHeader;

/// Packet type carried in the PayloadHdr type field (RFC 7798 §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpPacketType(pub u8);

impl RtpPacketType {
    pub const AP: Self = Self(48);
    pub const FU: Self = Self(49);
    pub const PACI: Self = Self(50);

    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        Ok(Self(NalUnitType::unmarshal(buf)?.0))
    }

    pub fn nal_unit_type(self) -> NalUnitType {
        NalUnitType(self.0 & 0x3f)
    }

    pub fn mode(self) -> PacketizationMode {
        match self.0 & 0x3f {
            0..=47 => PacketizationMode::SingleNalUnit,
            48 => PacketizationMode::AggregationPacket,
            49 => PacketizationMode::FragmentationUnit,
            50 => PacketizationMode::Paci,
            _ => PacketizationMode::Reserved,
        }
    }

    pub fn is_single_nal_unit(self) -> bool {
        self.mode() == PacketizationMode::SingleNalUnit
    }

    pub fn is_aggregation_packet(self) -> bool {
        self.mode() == PacketizationMode::AggregationPacket
    }

    pub fn is_fragmentation_unit(self) -> bool {
        self.mode() == PacketizationMode::FragmentationUnit
    }

    pub fn is_paci(self) -> bool {
        self.mode() == PacketizationMode::Paci
    }

    pub fn is_reserved(self) -> bool {
        self.mode() == PacketizationMode::Reserved
    }

    /// Bytes of framing in front of the NAL data for this packet type.
    pub fn payload_header_size(self) -> usize {
        match self.mode() {
            PacketizationMode::FragmentationUnit => 2 + 1,
            // PayloadHdr + A|cType|PHSsize|F0..2|Y
            PacketizationMode::Paci => 2 + 2,
            _ => 2,
        }
    }
}

/// FU header (RFC 7798 §4.4.3).
///
/// ```text
/// +---------------+
/// |0|1|2|3|4|5|6|7|
/// +-+-+-+-+-+-+-+-+
/// |S|E|  FuType   |
/// +---------------+
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuHeader {
    pub start_bit: bool,
    pub end_bit: bool,
    pub fu_type: NalUnitType,
}

impl FuHeader {
    pub const START_BIT_MASK: u8 = 0x80;
    pub const END_BIT_MASK: u8 = 0x40;
    pub const FU_TYPE_MASK: u8 = 0x3f;
    /// Offset of the FU header within an FU payload (after the PayloadHdr).
    pub const BYTE_INDEX: usize = 2;

    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        let byte0 = buf
            .first()
            .copied()
            .ok_or_else(|| RtpError::parse(ParseErrorKind::FuHeader, 1, 0))?;
        Ok(Self {
            start_bit: byte0 & Self::START_BIT_MASK != 0,
            end_bit: byte0 & Self::END_BIT_MASK != 0,
            fu_type: NalUnitType(byte0 & Self::FU_TYPE_MASK),
        })
    }

    pub fn marshal(self) -> u8 {
        let mut byte0 = self.fu_type.0 & Self::FU_TYPE_MASK;
        if self.start_bit {
            byte0 |= Self::START_BIT_MASK;
        }
        if self.end_bit {
            byte0 |= Self::END_BIT_MASK;
        }
        byte0
    }

    /// Read the FU header out of a complete FU payload.
    pub fn parse(rtp_payload: &[u8]) -> Result<Self> {
        let buf = rtp_payload.get(Self::BYTE_INDEX..).unwrap_or_default();
        Self::unmarshal(buf)
    }
}

/// RFC 7798 framing for the packetization engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct H265;

impl NalCodec for H265 {
    const NAME: &'static str = "H265";
    const NAL_HEADER_SIZE: usize = NalHeader::MARSHAL_SIZE;
    const AGGREGATION_HEADER_SIZE: usize = 2;
    const FRAGMENTATION_HEADER_SIZE: usize = 3;

    type NalHeader = NalHeader;

    fn nal_header(nal: &[u8]) -> Result<NalHeader> {
        NalHeader::unmarshal(nal)
    }

    /// AP PayloadHdr: F is the OR of the aggregated F bits, LayerId and TID
    /// are the lowest of the aggregated units (RFC 7798 §4.4.2).
    fn write_aggregation_header(headers: &[NalHeader], out: &mut Vec<u8>) {
        let payload_hdr = PayloadHdr {
            forbidden_zero_bit: ForbiddenZeroBit(headers.iter().any(|h| h.forbidden_zero_bit.0)),
            nal_unit_type: RtpPacketType::AP.nal_unit_type(),
            nal_layer_id: headers.iter().map(|h| h.nal_layer_id).min().unwrap_or_default(),
            nal_temporal_id: headers
                .iter()
                .map(|h| h.nal_temporal_id)
                .min()
                .unwrap_or(NalTemporalId(1)),
        };
        out.extend_from_slice(&payload_hdr.marshal());
    }

    /// F, LayerId and TID are copied from the fragmented unit (RFC 7798 §4.4.3).
    fn write_fragmentation_header(header: NalHeader, start: bool, end: bool, out: &mut Vec<u8>) {
        let payload_hdr = PayloadHdr {
            nal_unit_type: RtpPacketType::FU.nal_unit_type(),
            ..header
        };
        let fu_header = FuHeader {
            start_bit: start,
            end_bit: end,
            fu_type: header.nal_unit_type,
        };
        out.extend_from_slice(&payload_hdr.marshal());
        out.push(fu_header.marshal());
    }

    fn is_aud_or_filler(header: NalHeader) -> bool {
        header.nal_unit_type == NalUnitType::AUD_NUT || header.nal_unit_type == NalUnitType::FD_NUT
    }
}

/// Metadata reconstructed from a received H.265 RTP payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct H265Packet {
    pub header: PayloadHdr,
    /// Everything after the PayloadHdr, copied out of the input.
    pub payload: Vec<u8>,
}

impl H265Packet {
    pub fn unmarshal(rtp_payload: &[u8]) -> Result<Self> {
        let header = PayloadHdr::unmarshal(rtp_payload)?;
        Ok(Self {
            header,
            payload: rtp_payload[PayloadHdr::MARSHAL_SIZE..].to_vec(),
        })
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.marshal_size());
        out.extend_from_slice(&self.header.marshal());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn marshal_size(&self) -> usize {
        PayloadHdr::MARSHAL_SIZE + self.payload.len()
    }

    pub fn packet_type(&self) -> RtpPacketType {
        RtpPacketType(self.header.nal_unit_type.0)
    }

    pub fn fu_header(&self) -> Option<FuHeader> {
        if !self.packet_type().is_fragmentation_unit() {
            return None;
        }
        FuHeader::unmarshal(&self.payload).ok()
    }

    /// Fragment bytes of an FU packet (after the FU header).
    pub fn fu_payload(&self) -> Option<&[u8]> {
        if !self.packet_type().is_fragmentation_unit() {
            return None;
        }
        self.payload.get(1..)
    }

    /// NAL units carried by an AP packet. Empty for other packet types.
    pub fn aggregation_units(&self) -> Result<Vec<&[u8]>> {
        if !self.packet_type().is_aggregation_packet() {
            return Ok(Vec::new());
        }
        split_aggregation_units(&self.payload)
    }
}
