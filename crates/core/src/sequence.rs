//! RTP sequence number generation.

use parking_lot::Mutex;

/// Source of RTP sequence numbers for one stream.
///
/// Numbers increase by one per packet and wrap at 2^16. Implementations are
/// shared between the packetizer and whoever else needs to observe the
/// stream position (e.g. an RTCP sender report), hence `Send + Sync`.
pub trait Sequencer: Send + Sync {
    /// Sequence number for the next packet.
    fn next_sequence_number(&self) -> u16;

    /// How many times the sequence number has wrapped past `u16::MAX`.
    fn roll_over_count(&self) -> u64;
}

#[derive(Debug)]
struct State {
    sequence_number: u16,
    roll_over_count: u64,
}

/// Default [`Sequencer`]: a wrapping counter behind a mutex.
#[derive(Debug)]
pub struct WrappingSequencer {
    state: Mutex<State>,
}

impl WrappingSequencer {
    /// The first call to [`next_sequence_number`](Sequencer::next_sequence_number)
    /// returns `start + 1`.
    pub fn new(start: u16) -> Self {
        tracing::debug!(start, "sequencer created");
        Self {
            state: Mutex::new(State {
                sequence_number: start,
                roll_over_count: 0,
            }),
        }
    }

    /// Random initial value (RFC 3550 §5.1).
    pub fn random() -> Self {
        Self::new(rand::random::<u16>())
    }
}

impl Default for WrappingSequencer {
    fn default() -> Self {
        Self::random()
    }
}

impl Sequencer for WrappingSequencer {
    fn next_sequence_number(&self) -> u16 {
        let mut state = self.state.lock();
        state.sequence_number = state.sequence_number.wrapping_add(1);
        if state.sequence_number == 0 {
            state.roll_over_count += 1;
        }
        state.sequence_number
    }

    fn roll_over_count(&self) -> u64 {
        self.state.lock().roll_over_count
    }
}
