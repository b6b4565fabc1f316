//! Access unit → RTP packets.
//!
//! The [`Packetizer`] runs an access unit through a [`Payloader`] and wraps
//! each payload in an RTP header:
//!
//! - **Sequence number** comes from the shared [`Sequencer`], one per packet.
//! - **Timestamp** is the same for every packet of an access unit and
//!   advances by the caller's `samples` afterwards. It starts at a random
//!   value (RFC 3550 §5.1).
//! - **Marker** is set on the last packet of the access unit
//!   (RFC 6184 §5.1, RFC 7798 §4.1).
//! - **Abs-send-time**, when enabled, is attached to the last packet only.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::error::Result;
use crate::media::Payloader;
use crate::rtp::{self, Header, Packet, extension};
use crate::sequence::Sequencer;

/// Stream parameters for a [`Packetizer`].
#[derive(Debug, Clone)]
pub struct PacketizerConfig {
    /// Largest RTP packet handed to the transport, header and any
    /// abs-send-time extension included.
    pub mtu: usize,
    /// RTP payload type (7-bit, dynamic range 96–127 for video).
    pub payload_type: u8,
    /// Synchronization source identifier (RFC 3550 §8.1).
    pub ssrc: u32,
    /// Media clock in Hz; 90 kHz for H.264 and H.265.
    pub clock_rate: u32,
}

impl Default for PacketizerConfig {
    fn default() -> Self {
        Self {
            mtu: 1400,
            payload_type: 96,
            ssrc: rand::random::<u32>(),
            clock_rate: 90000,
        }
    }
}

/// Turns encoded access units into RTP packets for one stream.
///
/// Calls must be serialized per instance: the timestamp and the sequence
/// numbers advance once per access unit.
pub struct Packetizer {
    config: PacketizerConfig,
    payloader: Box<dyn Payloader>,
    sequencer: Arc<dyn Sequencer>,
    timestamp: u32,
    abs_send_time_id: u8,
    clock: fn() -> SystemTime,
}

impl Packetizer {
    pub fn new(config: PacketizerConfig, payloader: Box<dyn Payloader>, sequencer: Arc<dyn Sequencer>) -> Self {
        let timestamp = rand::random::<u32>();
        tracing::debug!(
            codec = payloader.codec_name(),
            mtu = config.mtu,
            pt = config.payload_type,
            ssrc = format_args!("{:#010X}", config.ssrc),
            ts = timestamp,
            "packetizer created"
        );
        Self {
            config,
            payloader,
            sequencer,
            timestamp,
            abs_send_time_id: 0,
            clock: SystemTime::now,
        }
    }

    /// Replace the wall clock used for abs-send-time.
    pub fn with_clock(mut self, clock: fn() -> SystemTime) -> Self {
        self.clock = clock;
        self
    }

    /// Attach the abs-send-time extension with the given one-byte id to the
    /// last packet of every access unit. `0` disables it.
    pub fn enable_abs_send_time(&mut self, id: u8) -> Result<()> {
        extension::validate_id(id)?;
        self.abs_send_time_id = id;
        tracing::debug!(id, "abs-send-time extension configured");
        Ok(())
    }

    /// Packetize one access unit, then advance the timestamp by `samples`.
    ///
    /// An empty access unit yields no packets and leaves the timestamp
    /// untouched.
    pub fn packetize(&mut self, access_unit: &[u8], samples: u32) -> Vec<Packet> {
        if access_unit.is_empty() {
            return Vec::new();
        }

        let mut overhead = Header::FIXED_SIZE;
        if self.abs_send_time_id != 0 {
            overhead += extension::ABS_SEND_TIME_BLOCK_SIZE;
        }
        let mtu = self.config.mtu.saturating_sub(overhead);
        let payloads = self.payloader.payload(mtu, access_unit);
        let count = payloads.len();

        let mut packets: Vec<Packet> = payloads
            .into_iter()
            .enumerate()
            .map(|(i, payload)| Packet {
                header: Header {
                    version: rtp::VERSION,
                    marker: i == count - 1,
                    payload_type: self.config.payload_type,
                    sequence_number: self.sequencer.next_sequence_number(),
                    timestamp: self.timestamp,
                    ssrc: self.config.ssrc,
                    ..Default::default()
                },
                payload,
                ..Default::default()
            })
            .collect();

        if self.abs_send_time_id != 0
            && let Some(last) = packets.last_mut()
        {
            extension::set_abs_send_time(&mut last.header, self.abs_send_time_id, (self.clock)());
        }

        tracing::trace!(
            frame_bytes = access_unit.len(),
            rtp_packets = packets.len(),
            seq = packets.last().map(|p| p.header.sequence_number),
            ts = self.timestamp,
            "access unit packetized"
        );

        self.timestamp = self.timestamp.wrapping_add(samples);
        packets
    }

    /// Advance the timestamp without sending anything (e.g. a dropped frame).
    pub fn skip_samples(&mut self, samples: u32) {
        self.timestamp = self.timestamp.wrapping_add(samples);
    }

    /// Media clock ticks covering `duration` at the configured clock rate,
    /// saturating at `u32::MAX`.
    pub fn samples_for(&self, duration: Duration) -> u32 {
        let samples = duration.as_nanos() * u128::from(self.config.clock_rate) / 1_000_000_000;
        u32::try_from(samples).unwrap_or(u32::MAX)
    }

    /// RTP timestamp the next access unit will carry.
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn config(&self) -> &PacketizerConfig {
        &self.config
    }

    pub fn codec_name(&self) -> &'static str {
        self.payloader.codec_name()
    }
}
