use super::{Header, PaddingTrailer};
use crate::error::{Result, RtpError};

/// A complete RTP packet: header, payload and optional padding.
///
/// The padding trailer is written only when `header.padding` is set. A
/// padded packet with an empty trailer carries the bare count octet (`1`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
    pub padding_trailer: PaddingTrailer,
}

impl Packet {
    /// Parse a packet, copying the payload and padding out of `raw`.
    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        let header = Header::unmarshal(raw)?;
        let body = &raw[header.marshal_size()..];

        let (payload, padding_trailer) = if header.padding {
            let trailer = PaddingTrailer::unmarshal(body)?;
            let padding_len = trailer.padding_payload.len() + 1;
            (&body[..body.len() - padding_len], trailer)
        } else {
            (body, PaddingTrailer::default())
        };

        Ok(Self {
            header,
            payload: payload.to_vec(),
            padding_trailer,
        })
    }

    fn padding_size(&self) -> usize {
        if !self.header.padding {
            return 0;
        }
        self.padding_trailer.marshal_size().max(1)
    }

    pub fn marshal_size(&self) -> usize {
        self.header.marshal_size() + self.payload.len() + self.padding_size()
    }

    /// Serialize into the front of `buf`, returning the number of bytes
    /// written.
    pub fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(RtpError::ShortBuffer {
                needed: size,
                actual: buf.len(),
            });
        }

        let mut n = self.header.marshal_to(buf)?;
        buf[n..n + self.payload.len()].copy_from_slice(&self.payload);
        n += self.payload.len();

        if self.header.padding {
            let written = self.padding_trailer.marshal_to(&mut buf[n..])?;
            if written == 0 {
                buf[n] = 1;
                n += 1;
            } else {
                n += written;
            }
        }
        Ok(n)
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.marshal_size()];
        self.marshal_to(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    const RAW: [u8; 17] = [
        0x80, 0xe0, 0x69, 0x8f, 0xd9, 0xc2, 0x93, 0xda, 0x1c, 0x64, 0x27, 0x82, 0x98, 0x36, 0xbe,
        0x88, 0x9e,
    ];

    #[test]
    fn unmarshal_basic_packet() {
        let packet = Packet::unmarshal(&RAW).unwrap();
        assert_eq!(packet.header.version, 2);
        assert!(packet.header.marker);
        assert_eq!(packet.header.payload_type, 96);
        assert_eq!(packet.header.sequence_number, 27023);
        assert_eq!(packet.payload, vec![0x98, 0x36, 0xbe, 0x88, 0x9e]);
        assert_eq!(packet.marshal().unwrap(), RAW);
    }

    #[test]
    fn padded_packet() {
        let mut raw = RAW.to_vec();
        raw[0] |= 0x20;
        raw.extend_from_slice(&[0x00, 0x00, 0x03]);

        let packet = Packet::unmarshal(&raw).unwrap();
        assert!(packet.header.padding);
        assert_eq!(packet.payload, vec![0x98, 0x36, 0xbe, 0x88, 0x9e]);
        assert_eq!(packet.padding_trailer.padding_payload, vec![0x00, 0x00]);
        assert_eq!(packet.marshal_size(), raw.len());
        assert_eq!(packet.marshal().unwrap(), raw);
    }

    #[test]
    fn padding_consumes_whole_payload() {
        let mut raw = RAW[..12].to_vec();
        raw[0] |= 0x20;
        raw.extend_from_slice(&[0x00, 0x00, 0x00, 0x04]);
        let packet = Packet::unmarshal(&raw).unwrap();
        assert!(packet.payload.is_empty());
        assert_eq!(packet.padding_trailer.padding_payload.len(), 3);
    }

    #[test]
    fn single_count_octet_round_trips() {
        let mut raw = RAW.to_vec();
        raw[0] |= 0x20;
        raw.push(0x01);
        let packet = Packet::unmarshal(&raw).unwrap();
        assert!(packet.padding_trailer.padding_payload.is_empty());
        assert_eq!(packet.payload.len(), 5);
        assert_eq!(packet.marshal().unwrap(), raw);
    }

    #[test]
    fn padding_count_exceeds_body() {
        let mut raw = RAW.to_vec();
        raw[0] |= 0x20;
        raw.push(0x09);
        let err = Packet::unmarshal(&raw).unwrap_err();
        assert!(matches!(
            err,
            RtpError::Parse {
                kind: ParseErrorKind::PaddingTrailer,
                needed: 9,
                actual: 6
            }
        ));
    }

    #[test]
    fn trailer_ignored_without_padding_flag() {
        let packet = Packet {
            padding_trailer: PaddingTrailer::with_count(4),
            ..Packet::unmarshal(&RAW).unwrap()
        };
        assert_eq!(packet.marshal().unwrap(), RAW);
    }

    #[test]
    fn marshal_to_short_buffer() {
        let packet = Packet::unmarshal(&RAW).unwrap();
        let mut buf = [0u8; 16];
        assert!(matches!(
            packet.marshal_to(&mut buf),
            Err(RtpError::ShortBuffer { needed: 17, actual: 16 })
        ));
    }

    #[test]
    fn header_errors_propagate() {
        assert!(Packet::unmarshal(&RAW[..8]).is_err());
    }
}
