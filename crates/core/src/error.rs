//! Error types for the RTP codec and payloaders.

use std::fmt;

/// Errors that can occur while parsing or serializing RTP data.
///
/// Variants map to specific failure modes:
///
/// - **Parsing**: [`Parse`](Self::Parse), [`ZeroPaddingCount`](Self::ZeroPaddingCount)
///   when the input ended before a fixed or length-prefixed field did.
/// - **Marshalling**: [`ShortBuffer`](Self::ShortBuffer),
///   [`ExtensionNotWordAligned`](Self::ExtensionNotWordAligned),
///   [`ExtensionTooLong`](Self::ExtensionTooLong),
///   [`TooManyCsrcs`](Self::TooManyCsrcs),
///   [`PaddingOverflow`](Self::PaddingOverflow).
/// - **Configuration**: [`InvalidExtensionId`](Self::InvalidExtensionId).
///
/// The payloaders never return errors: malformed NAL units are dropped.
#[derive(Debug, thiserror::Error)]
pub enum RtpError {
    /// Input too short for the field named by `kind`.
    #[error("{kind} size insufficient; {actual} < {needed}")]
    Parse {
        kind: ParseErrorKind,
        needed: usize,
        actual: usize,
    },

    /// Destination buffer cannot hold the marshalled value.
    #[error("buffer too short; {actual} < {needed}")]
    ShortBuffer { needed: usize, actual: usize },

    /// Header extension payload must be a whole number of 32-bit words.
    #[error("extension payload length {0} is not a multiple of 4")]
    ExtensionNotWordAligned(usize),

    /// The extension length is a 16-bit count of 32-bit words.
    #[error("extension payload of {0} bytes exceeds 65535 words")]
    ExtensionTooLong(usize),

    /// The CSRC count is a 4-bit field (RFC 3550 §5.1).
    #[error("too many CSRC identifiers: {0} > 15")]
    TooManyCsrcs(usize),

    /// The padding count is a single octet.
    #[error("padding overflow; expected at most 255, actual {0}")]
    PaddingOverflow(usize),

    /// A padded packet whose last octet claims zero padding bytes.
    #[error("RTP padding count must be at least 1")]
    ZeroPaddingCount,

    /// One-byte header extension ids are 1–14 (RFC 8285 §4.2).
    #[error("invalid one-byte extension id: {0}")]
    InvalidExtensionId(u8),
}

impl RtpError {
    pub(crate) fn parse(kind: ParseErrorKind, needed: usize, actual: usize) -> Self {
        Self::Parse {
            kind,
            needed,
            actual,
        }
    }

    /// `true` for the marshal capacity failures (buffer or word alignment).
    pub fn is_short_buffer(&self) -> bool {
        matches!(
            self,
            Self::ShortBuffer { .. } | Self::ExtensionNotWordAligned(_)
        )
    }
}

/// The field being parsed when the input ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The 12-byte fixed RTP header.
    Header,
    /// The CSRC list announced by the CC field.
    Csrc,
    /// The 4-byte extension profile/length word.
    ExtensionHeader,
    /// The extension payload announced by the length word.
    ExtensionPayload,
    /// The padding announced by the final count octet.
    PaddingTrailer,
    /// A NAL unit (or payload) header.
    NalHeader,
    /// A length-prefixed unit inside a STAP-A / AP payload.
    AggregationUnit,
    /// The FU header following a fragmentation unit payload header.
    FuHeader,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "RTP header"),
            Self::Csrc => write!(f, "RTP CSRC list"),
            Self::ExtensionHeader => write!(f, "RTP header extension"),
            Self::ExtensionPayload => write!(f, "RTP header extension payload"),
            Self::PaddingTrailer => write!(f, "RTP padding trailer"),
            Self::NalHeader => write!(f, "NAL unit header"),
            Self::AggregationUnit => write!(f, "aggregation unit"),
            Self::FuHeader => write!(f, "FU header"),
        }
    }
}

/// Convenience alias for `Result<T, RtpError>`.
pub type Result<T> = std::result::Result<T, RtpError>;
