use crate::error::{ParseErrorKind, Result, RtpError};

const VERSION_SHIFT: u8 = 6;
const VERSION_MASK: u8 = 0x3;
const PADDING_SHIFT: u8 = 5;
const EXTENSION_SHIFT: u8 = 4;
const CC_MASK: u8 = 0xF;
const MARKER_SHIFT: u8 = 7;
const PT_MASK: u8 = 0x7F;

const SEQ_NUM_OFFSET: usize = 2;
const TIMESTAMP_OFFSET: usize = 4;
const SSRC_OFFSET: usize = 8;
const CSRC_OFFSET: usize = 12;
const CSRC_LENGTH: usize = 4;
const EXTENSION_HEADER_LENGTH: usize = 4;

/// Most CSRC identifiers the 4-bit CC field can announce.
pub const MAX_CSRCS: usize = 15;

/// RTP fixed header plus CSRC list and optional header extension.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// |                  CSRC identifiers (CC × 32 bit)               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      extension profile        |   extension length (words)    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     extension payload ...                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The CC field is derived from `csrc.len()`. The extension block is
/// present on the wire only when `extension` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    pub extension_profile: u16,
    pub extension_payload: Vec<u8>,
}

impl Header {
    /// Size of the fixed part of the header.
    pub const FIXED_SIZE: usize = 12;

    /// Parse a header from the start of `raw`.
    ///
    /// Trailing bytes (payload, padding) are ignored; use
    /// [`marshal_size`](Self::marshal_size) to find where the header ends.
    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        if raw.len() < Self::FIXED_SIZE {
            return Err(RtpError::parse(ParseErrorKind::Header, Self::FIXED_SIZE, raw.len()));
        }

        let version = (raw[0] >> VERSION_SHIFT) & VERSION_MASK;
        let padding = (raw[0] >> PADDING_SHIFT) & 1 == 1;
        let extension = (raw[0] >> EXTENSION_SHIFT) & 1 == 1;
        let csrc_count = (raw[0] & CC_MASK) as usize;
        let marker = (raw[1] >> MARKER_SHIFT) & 1 == 1;
        let payload_type = raw[1] & PT_MASK;

        let sequence_number = read_u16(raw, SEQ_NUM_OFFSET);
        let timestamp = read_u32(raw, TIMESTAMP_OFFSET);
        let ssrc = read_u32(raw, SSRC_OFFSET);

        let mut offset = CSRC_OFFSET + csrc_count * CSRC_LENGTH;
        if raw.len() < offset {
            return Err(RtpError::parse(ParseErrorKind::Csrc, offset, raw.len()));
        }
        let csrc = (0..csrc_count)
            .map(|i| read_u32(raw, CSRC_OFFSET + i * CSRC_LENGTH))
            .collect();

        let mut extension_profile = 0;
        let mut extension_payload = Vec::new();
        if extension {
            let needed = offset + EXTENSION_HEADER_LENGTH;
            if raw.len() < needed {
                return Err(RtpError::parse(ParseErrorKind::ExtensionHeader, needed, raw.len()));
            }
            extension_profile = read_u16(raw, offset);
            let extension_length = read_u16(raw, offset + 2) as usize * 4;
            offset = needed;

            let needed = offset + extension_length;
            if raw.len() < needed {
                return Err(RtpError::parse(ParseErrorKind::ExtensionPayload, needed, raw.len()));
            }
            extension_payload = raw[offset..needed].to_vec();
        }

        Ok(Self {
            version,
            padding,
            extension,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extension_profile,
            extension_payload,
        })
    }

    /// Number of bytes [`marshal`](Self::marshal) writes.
    pub fn marshal_size(&self) -> usize {
        let mut size = Self::FIXED_SIZE + self.csrc.len() * CSRC_LENGTH;
        if self.extension {
            size += EXTENSION_HEADER_LENGTH + self.extension_payload.len();
        }
        size
    }

    /// Serialize into the front of `buf`, returning the number of bytes
    /// written.
    pub fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        if self.csrc.len() > MAX_CSRCS {
            return Err(RtpError::TooManyCsrcs(self.csrc.len()));
        }
        if self.extension && self.extension_payload.len() % 4 != 0 {
            return Err(RtpError::ExtensionNotWordAligned(self.extension_payload.len()));
        }
        if self.extension && self.extension_payload.len() / 4 > usize::from(u16::MAX) {
            return Err(RtpError::ExtensionTooLong(self.extension_payload.len()));
        }
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(RtpError::ShortBuffer {
                needed: size,
                actual: buf.len(),
            });
        }

        buf[0] = ((self.version & VERSION_MASK) << VERSION_SHIFT)
            | ((self.padding as u8) << PADDING_SHIFT)
            | ((self.extension as u8) << EXTENSION_SHIFT)
            | self.csrc.len() as u8;
        buf[1] = ((self.marker as u8) << MARKER_SHIFT) | (self.payload_type & PT_MASK);
        buf[SEQ_NUM_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&self.sequence_number.to_be_bytes());
        buf[TIMESTAMP_OFFSET..SSRC_OFFSET].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[SSRC_OFFSET..CSRC_OFFSET].copy_from_slice(&self.ssrc.to_be_bytes());

        let mut offset = CSRC_OFFSET;
        for csrc in &self.csrc {
            buf[offset..offset + CSRC_LENGTH].copy_from_slice(&csrc.to_be_bytes());
            offset += CSRC_LENGTH;
        }

        if self.extension {
            let words = (self.extension_payload.len() / 4) as u16;
            buf[offset..offset + 2].copy_from_slice(&self.extension_profile.to_be_bytes());
            buf[offset + 2..offset + 4].copy_from_slice(&words.to_be_bytes());
            offset += EXTENSION_HEADER_LENGTH;
            buf[offset..offset + self.extension_payload.len()].copy_from_slice(&self.extension_payload);
            offset += self.extension_payload.len();
        }

        Ok(offset)
    }

    /// Serialize into a freshly allocated buffer.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.marshal_size()];
        self.marshal_to(&mut buf)?;
        Ok(buf)
    }
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}
