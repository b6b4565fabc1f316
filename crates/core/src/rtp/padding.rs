use crate::error::{ParseErrorKind, Result, RtpError};

/// Largest trailer the single count octet can describe.
pub const MAX_PADDING_SIZE: usize = u8::MAX as usize;

/// Padding appended after the RTP payload (RFC 3550 §5.1).
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     padding payload ...                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |              ....             |         padding count         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// `padding_payload` excludes the count octet; the count written on the
/// wire is `1 + padding_payload.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaddingTrailer {
    pub padding_payload: Vec<u8>,
}

impl PaddingTrailer {
    pub fn new(padding_payload: Vec<u8>) -> Self {
        Self { padding_payload }
    }

    /// Zero-filled padding totalling `count` bytes including the count octet.
    pub fn with_count(count: u8) -> Self {
        Self::new(vec![0; usize::from(count).saturating_sub(1)])
    }

    /// Parse the trailer from the bytes that follow an RTP header.
    ///
    /// The last octet holds the number of padding bytes, itself included.
    pub fn unmarshal(body: &[u8]) -> Result<Self> {
        let Some(&count) = body.last() else {
            return Err(RtpError::parse(ParseErrorKind::PaddingTrailer, 1, 0));
        };
        let count = count as usize;
        if count == 0 {
            return Err(RtpError::ZeroPaddingCount);
        }
        if body.len() < count {
            return Err(RtpError::parse(ParseErrorKind::PaddingTrailer, count, body.len()));
        }
        Ok(Self::new(body[body.len() - count..body.len() - 1].to_vec()))
    }

    /// Bytes occupied on the wire; zero when there is no padding payload.
    pub fn marshal_size(&self) -> usize {
        if self.padding_payload.is_empty() {
            return 0;
        }
        1 + self.padding_payload.len()
    }

    /// Serialize into the front of `buf`, returning the number of bytes
    /// written.
    pub fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let size = self.marshal_size();
        if size > MAX_PADDING_SIZE {
            return Err(RtpError::PaddingOverflow(size));
        }
        if size == 0 {
            return Ok(0);
        }
        if buf.len() < size {
            return Err(RtpError::ShortBuffer {
                needed: size,
                actual: buf.len(),
            });
        }
        buf[..size - 1].copy_from_slice(&self.padding_payload);
        buf[size - 1] = size as u8;
        Ok(size)
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.marshal_size()];
        self.marshal_to(&mut buf)?;
        Ok(buf)
    }
}
