//! NAL unit → RTP payload packetization (RFC 6184 §5.7–5.8, RFC 7798 §4.4).
//!
//! For each NAL unit the engine picks one of three payload structures:
//!
//! - **Aggregation** (STAP-A / AP): consecutive small units are buffered and
//!   emitted together as one payload:
//!
//!   ```text
//!   [aggregation header][size 1][NAL 1][size 2][NAL 2]...
//!   ```
//!
//!   `size` is a 16-bit big-endian byte count, which is why NAL units larger
//!   than 65535 bytes are rejected up front.
//!
//! - **Single NAL unit**: a unit that fits the MTU but is buffered alone is
//!   emitted verbatim.
//!
//! - **Fragmentation** (FU-A / FU): a unit larger than the MTU is split.
//!   The NAL header is not repeated in the fragments; its fields travel in
//!   the FU indicator / PayloadHdr and FU header of every fragment.
//!
//! Malformed input is dropped rather than reported: empty or oversized NAL
//! units, units shorter than the codec's NAL header, and MTUs too small to
//! carry a single fragment byte. RTP delivery is lossy anyway and the
//! receiver resynchronizes on the next access unit.

use crate::nal::NalCodec;

/// Largest NAL unit an aggregation unit's 16-bit size field can describe.
pub const MAX_NAL_SIZE: usize = u16::MAX as usize;

/// Bytes of the per-unit size field inside STAP-A / AP payloads.
pub const AGGREGATION_UNIT_SIZE_FIELD: usize = 2;

struct PendingNal<'a, C: NalCodec> {
    header: C::NalHeader,
    data: &'a [u8],
}

/// Accumulate-then-flush state machine over one access unit.
///
/// `pending` holds units waiting to be aggregated; `pending_size` counts
/// their bytes plus one size field each (the aggregation header is added on
/// top when testing against the MTU).
struct Aggregator<'a, C: NalCodec> {
    mtu: usize,
    skip_aggregate: bool,
    pending: Vec<PendingNal<'a, C>>,
    pending_size: usize,
    payloads: Vec<Vec<u8>>,
}

impl<'a, C: NalCodec> Aggregator<'a, C> {
    fn new(mtu: usize, skip_aggregate: bool) -> Self {
        Self {
            mtu,
            skip_aggregate,
            pending: Vec::new(),
            pending_size: 0,
            payloads: Vec::new(),
        }
    }

    fn push(&mut self, nal: &'a [u8]) {
        if nal.is_empty() || nal.len() > MAX_NAL_SIZE {
            tracing::trace!(codec = C::NAME, nal_size = nal.len(), "dropping invalid NAL unit");
            return;
        }
        let header = match C::nal_header(nal) {
            Ok(header) => header,
            Err(err) => {
                tracing::trace!(codec = C::NAME, nal_size = nal.len(), %err, "dropping NAL unit");
                return;
            }
        };

        let unit_size = AGGREGATION_UNIT_SIZE_FIELD + nal.len();
        if !self.skip_aggregate && C::AGGREGATION_HEADER_SIZE + self.pending_size + unit_size <= self.mtu {
            self.pending.push(PendingNal { header, data: nal });
            self.pending_size += unit_size;
            return;
        }

        self.flush();
        self.pending.push(PendingNal { header, data: nal });
        self.pending_size = unit_size;
        if nal.len() > self.mtu {
            self.flush();
        }
    }

    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        self.pending_size = 0;
        match pending.as_slice() {
            [] => {}
            [single] => self.payloads.extend(fragment::<C>(self.mtu, single.header, single.data)),
            units => self.payloads.push(aggregate::<C>(units)),
        }
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        self.flush();
        self.payloads
    }
}

/// Packetize the NAL units of one access unit into RTP payloads of at most
/// `mtu` bytes.
///
/// With `skip_aggregate` set every unit is sent as a single NAL unit packet
/// or fragmented; STAP-A / AP packets are never produced.
pub fn packetize<'a, C, I>(mtu: usize, nals: I, skip_aggregate: bool) -> Vec<Vec<u8>>
where
    C: NalCodec,
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut aggregator = Aggregator::<C>::new(mtu, skip_aggregate);
    for nal in nals {
        aggregator.push(nal);
    }
    aggregator.finish()
}

/// Emit `nal` as a single NAL unit payload if it fits `mtu`, otherwise as
/// fragmentation units.
fn fragment<C: NalCodec>(mtu: usize, header: C::NalHeader, nal: &[u8]) -> Vec<Vec<u8>> {
    if nal.len() <= mtu {
        return vec![nal.to_vec()];
    }

    // The NAL header itself is not carried; it is rebuilt from the FU headers.
    let data = &nal[C::NAL_HEADER_SIZE..];
    let max_fragment_size = mtu.saturating_sub(C::FRAGMENTATION_HEADER_SIZE);
    if max_fragment_size.min(data.len()) == 0 {
        tracing::trace!(codec = C::NAME, mtu, nal_size = nal.len(), "MTU too small to fragment NAL unit");
        return Vec::new();
    }

    let count = data.len().div_ceil(max_fragment_size);
    let mut fragments = Vec::with_capacity(count);
    for (i, chunk) in data.chunks(max_fragment_size).enumerate() {
        let mut out = Vec::with_capacity(C::FRAGMENTATION_HEADER_SIZE + chunk.len());
        C::write_fragmentation_header(header, i == 0, i == count - 1, &mut out);
        out.extend_from_slice(chunk);
        fragments.push(out);
    }

    tracing::trace!(
        codec = C::NAME,
        nal_header = ?header,
        nal_size = nal.len(),
        fragments = fragments.len(),
        "fragmented NAL unit"
    );
    fragments
}

/// Emit one STAP-A / AP payload carrying every pending unit.
fn aggregate<C: NalCodec>(units: &[PendingNal<'_, C>]) -> Vec<u8> {
    let headers: Vec<C::NalHeader> = units.iter().map(|u| u.header).collect();
    let size = C::AGGREGATION_HEADER_SIZE
        + units
            .iter()
            .map(|u| AGGREGATION_UNIT_SIZE_FIELD + u.data.len())
            .sum::<usize>();

    let mut out = Vec::with_capacity(size);
    C::write_aggregation_header(&headers, &mut out);
    for unit in units {
        // Bounded by MAX_NAL_SIZE on intake.
        out.extend_from_slice(&(unit.data.len() as u16).to_be_bytes());
        out.extend_from_slice(unit.data);
    }

    tracing::trace!(codec = C::NAME, units = units.len(), payload_size = out.len(), "aggregated NAL units");
    out
}
