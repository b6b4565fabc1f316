//! Absolute send time header extension.
//!
//! <http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time>, carried as a
//! one-byte header extension (RFC 8285 §4.2):
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      0xBE     |      0xDE     |           length=1            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  ID   | len=2 |          absolute send time (6.18)            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The timestamp is 24-bit 6.18 fixed point seconds: 64 s wraparound and
//! roughly 3.8 µs resolution.

use std::time::{SystemTime, UNIX_EPOCH};

use super::Header;
use crate::error::{Result, RtpError};

/// Profile marking a one-byte header extension block.
pub const ONE_BYTE_PROFILE: u16 = 0xBEDE;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
pub const NTP_EPOCH_OFFSET: u64 = 0x83AA_7E80;

/// Highest id a one-byte extension element can use; 15 is reserved.
pub const MAX_ONE_BYTE_ID: u8 = 14;

const ABS_SEND_TIME_LEN: u8 = 3;

/// Bytes the abs-send-time block adds to a header: the profile/length word
/// plus one padded element.
pub const ABS_SEND_TIME_BLOCK_SIZE: usize = 8;

/// 64-bit NTP timestamp: whole seconds in the high word, fraction in the
/// low word. Times before the Unix epoch clamp to it.
pub fn to_ntp_time(t: SystemTime) -> u64 {
    let since_unix = t.duration_since(UNIX_EPOCH).unwrap_or_default();
    let seconds = since_unix.as_secs() + NTP_EPOCH_OFFSET;
    let fraction = (u64::from(since_unix.subsec_nanos()) << 32) / 1_000_000_000;
    (seconds << 32) | fraction
}

/// 24-bit abs-send-time value for an NTP timestamp.
pub fn abs_send_time(ntp: u64) -> u32 {
    ((ntp >> 14) & 0x00FF_FFFF) as u32
}

/// Check a one-byte extension id. `0` is accepted and means disabled.
pub fn validate_id(id: u8) -> Result<()> {
    if id > MAX_ONE_BYTE_ID {
        return Err(RtpError::InvalidExtensionId(id));
    }
    Ok(())
}

/// The single extension element: `ID|len` octet then the 24-bit timestamp.
pub fn abs_send_time_payload(id: u8, t: SystemTime) -> [u8; 4] {
    let send_time = abs_send_time(to_ntp_time(t)).to_be_bytes();
    [(id << 4) | (ABS_SEND_TIME_LEN - 1), send_time[1], send_time[2], send_time[3]]
}

/// Attach an abs-send-time extension block to `header`, replacing any
/// existing extension.
pub fn set_abs_send_time(header: &mut Header, id: u8, t: SystemTime) {
    header.extension = true;
    header.extension_profile = ONE_BYTE_PROFILE;
    header.extension_payload = abs_send_time_payload(id, t).to_vec();
}

/// Read the abs-send-time value back out of a header, if `id` is present.
pub fn parse_abs_send_time(header: &Header, id: u8) -> Option<u32> {
    if !header.extension || header.extension_profile != ONE_BYTE_PROFILE {
        return None;
    }
    let mut elements = header.extension_payload.as_slice();
    while let Some((&first, rest)) = elements.split_first() {
        // Padding octets between elements.
        if first == 0 {
            elements = rest;
            continue;
        }
        let element_id = first >> 4;
        let len = usize::from(first & 0x0F) + 1;
        if element_id == 15 || rest.len() < len {
            return None;
        }
        if element_id == id && len == usize::from(ABS_SEND_TIME_LEN) {
            return Some(u32::from_be_bytes([0, rest[0], rest[1], rest[2]]));
        }
        elements = &rest[len..];
    }
    None
}
