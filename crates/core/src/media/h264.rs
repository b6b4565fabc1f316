use super::{Payloader, payload_annexb};
use crate::nal::h264::H264;

/// H.264 RTP payloader (RFC 6184, packetization-mode=1).
///
/// Converts H.264 Annex B access units into RTP payloads using three
/// payload structures:
///
/// - **Single NAL Unit** (§5.6): a NAL that fits within the MTU and cannot
///   share a packet with its neighbours is sent as-is.
///
/// - **STAP-A** (§5.7.1): consecutive small NALs (typically SPS + PPS, or
///   SEI before a slice) are aggregated:
///
///   ```text
///   STAP-A indicator: [F|NRI|Type=24]          (1 byte)
///   Unit:             [size (16 bit)][NAL]     (repeated)
///   ```
///
/// - **FU-A Fragmentation** (§5.8): NALs exceeding the MTU are split
///   across multiple payloads. Each fragment carries a 2-byte FU header
///   (FU indicator + FU header) before the NAL payload:
///
///   ```text
///   FU indicator:  [F|NRI|Type=28]     (1 byte)
///   FU header:     [S|E|R|NAL_Type]    (1 byte)
///   Fragment data: [...]               (up to MTU - 2 bytes)
///   ```
///
///   - **S** (start): set on the first fragment
///   - **E** (end): set on the last fragment
///   - **NAL_Type**: the original NAL unit type from the first byte
#[derive(Debug, Clone, Default)]
pub struct H264Payloader {
    /// Never produce STAP-A packets.
    pub skip_aggregate: bool,
    /// Drop access unit delimiters (type 9) and filler data (type 12).
    pub drop_aud_and_filler: bool,
}

impl H264Payloader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Payloader for H264Payloader {
    fn payload(&mut self, mtu: usize, access_unit: &[u8]) -> Vec<Vec<u8>> {
        let payloads = payload_annexb::<H264>(mtu, access_unit, self.skip_aggregate, self.drop_aud_and_filler);
        tracing::trace!(
            mtu,
            frame_bytes = access_unit.len(),
            payloads = payloads.len(),
            "H.264 access unit payloaded"
        );
        payloads
    }

    fn codec_name(&self) -> &'static str {
        "H264"
    }
}
