//! Video payloaders: Annex B access unit → RTP payloads.
//!
//! This module provides the [`Payloader`] trait and the H.264 / H.265
//! implementations that split an encoded access unit into MTU-bounded RTP
//! payloads. The RTP header is added afterwards by
//! [`crate::packetizer::Packetizer`].
//!
//! ## Pipeline
//!
//! ```text
//! access unit ──► annexb::emit_nalus ──► nalu::packetize ──► Vec<payload>
//!                 (start code split)     (aggregate / single / fragment)
//! ```
//!
//! ## Supported codecs
//!
//! | Codec | Module | RFC | Aggregation | Fragmentation |
//! |-------|--------|-----|-------------|---------------|
//! | H.264 | [`h264`] | [RFC 6184](https://tools.ietf.org/html/rfc6184) | STAP-A | FU-A |
//! | H.265 | [`h265`] | [RFC 7798](https://tools.ietf.org/html/rfc7798) | AP | FU |

pub mod annexb;
pub mod h264;
pub mod h265;
pub mod nalu;

pub use h264::H264Payloader;
pub use h265::H265Payloader;

use crate::nal::NalCodec;

/// Codec-specific RTP payloader.
///
/// Each supported codec implements this trait. Implementations never fail:
/// input they cannot packetize is dropped (see [`nalu`]).
///
/// ## Implementing a new codec
///
/// 1. Create a new module (e.g. `media/av1.rs`)
/// 2. Implement `Payloader` for your type
/// 3. Hand it to [`crate::packetizer::Packetizer::new`]
pub trait Payloader: Send {
    /// Split one access unit into RTP payloads of at most `mtu` bytes each.
    ///
    /// Returned buffers are owned copies; the caller may reuse
    /// `access_unit` immediately.
    fn payload(&mut self, mtu: usize, access_unit: &[u8]) -> Vec<Vec<u8>>;

    /// Codec name as used in SDP `a=rtpmap` (e.g. `"H264"`, `"H265"`).
    fn codec_name(&self) -> &'static str;
}

/// Shared Annex B path for the NAL-based payloaders.
fn payload_annexb<C: NalCodec>(
    mtu: usize,
    access_unit: &[u8],
    skip_aggregate: bool,
    drop_aud_and_filler: bool,
) -> Vec<Vec<u8>> {
    let nals = annexb::emit_nalus(access_unit)
        .filter(|nal| !(drop_aud_and_filler && C::nal_header(nal).is_ok_and(C::is_aud_or_filler)));
    nalu::packetize::<C, _>(mtu, nals, skip_aggregate)
}
