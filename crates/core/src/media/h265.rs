use super::{Payloader, payload_annexb};
use crate::nal::h265::H265;

/// H.265 RTP payloader (RFC 7798).
///
/// Same structure as [`super::H264Payloader`] with HEVC's two-byte
/// headers: small NAL units are grouped into Aggregation Packets (type 48)
/// and oversized ones are split into Fragmentation Units (type 49) with a
/// 3-byte `PayloadHdr + FU header` prefix.
#[derive(Debug, Clone, Default)]
pub struct H265Payloader {
    /// Never produce AP packets.
    pub skip_aggregate: bool,
    /// Drop AUD_NUT (35) and FD_NUT (38) units.
    pub drop_aud_and_filler: bool,
}

impl H265Payloader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Payloader for H265Payloader {
    fn payload(&mut self, mtu: usize, access_unit: &[u8]) -> Vec<Vec<u8>> {
        let payloads = payload_annexb::<H265>(mtu, access_unit, self.skip_aggregate, self.drop_aud_and_filler);
        tracing::trace!(
            mtu,
            frame_bytes = access_unit.len(),
            payloads = payloads.len(),
            "H.265 access unit payloaded"
        );
        payloads
    }

    fn codec_name(&self) -> &'static str {
        "H265"
    }
}
