//! RTP packetization for H.264 and H.265 video.
//!
//! ```text
//! access unit ──► media::Payloader ──► packetizer::Packetizer ──► rtp::Packet ──► wire bytes
//! ```
//!
//! The reverse direction parses wire bytes with [`rtp::Packet::unmarshal`]
//! and recovers NAL metadata with [`nal::h264::H264Packet`] /
//! [`nal::h265::H265Packet`].

pub mod error;
pub mod media;
pub mod nal;
pub mod packetizer;
pub mod rtp;
pub mod sequence;

pub use error::{Result, RtpError};
pub use media::{H264Payloader, H265Payloader, Payloader};
pub use packetizer::{Packetizer, PacketizerConfig};
pub use rtp::{Header, Packet, PaddingTrailer};
pub use sequence::{Sequencer, WrappingSequencer};
