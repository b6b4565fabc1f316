//! Annex B byte stream scanning.
//!
//! H.264 and H.265 elementary streams delimit NAL units with start codes:
//! - 4-byte: `0x00 0x00 0x00 0x01`
//! - 3-byte: `0x00 0x00 0x01`
//!
//! Any run of two or more zero bytes followed by `0x01` is treated as a
//! boundary, so `trailing_zero_8bits` before a start code never end up in
//! the preceding NAL unit.

/// Iterator over the NAL units of an Annex B buffer, start codes excluded.
///
/// Created by [`emit_nalus`].
#[derive(Debug, Clone)]
pub struct NalUnits<'a> {
    data: &'a [u8],
    pos: usize,
    leading: bool,
    done: bool,
}

/// Split `data` into NAL units at start code boundaries.
///
/// - Bytes before the first start code are discarded.
/// - The bytes after the last start code are always yielded, even if empty;
///   the payloaders drop empty units.
/// - A buffer with no start code yields the whole buffer as one unit.
pub fn emit_nalus(data: &[u8]) -> NalUnits<'_> {
    NalUnits {
        data,
        pos: 0,
        leading: true,
        done: false,
    }
}

/// Find the next start code at or after `from`.
///
/// Returns the index of its first zero byte and its length.
fn next_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut zero_count = 0usize;
    for (i, &b) in data[from..].iter().enumerate() {
        if b == 0 {
            zero_count += 1;
            continue;
        }
        if b == 1 && zero_count >= 2 {
            return Some((from + i - zero_count, zero_count + 1));
        }
        zero_count = 0;
    }
    None
}

impl<'a> Iterator for NalUnits<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let start = self.pos;
            let Some((sc_start, sc_len)) = next_start_code(self.data, start) else {
                // Emit until end of stream, no further start code
                self.done = true;
                return Some(&self.data[start..]);
            };

            self.pos = sc_start + sc_len;
            // Whatever precedes the first start code is not a NAL unit.
            if std::mem::replace(&mut self.leading, false) {
                continue;
            }
            return Some(&self.data[start..sc_start]);
        }
        None
    }
}
