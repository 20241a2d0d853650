//! Ping-pong DMA abstraction.
//!
//! Two channels are chained so that finishing one half immediately starts the
//! other. The CPU re-arms the idle half (`rewind`) after it has consumed it,
//! which keeps acquisition gap-free as long as consumption outpaces filling.
//!
//! The engine owns the capture memory and lends each half to the backend only
//! for the duration of a call. Hardware backends use the pointer to reprogram
//! the write address; the host fake writes synthetic samples through it.

/// One of the two halves of a ping-pong buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalfIndex {
    /// First half, filled first after priming.
    A,
    /// Second half.
    B,
}

impl HalfIndex {
    /// The opposite half.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            HalfIndex::A => HalfIndex::B,
            HalfIndex::B => HalfIndex::A,
        }
    }
}

/// A pair of chained DMA channels moving `W`-sized words from a peripheral
/// FIFO into two alternating halves.
pub trait DmaPingPong<W: Copy> {
    /// Error type
    type Error: core::fmt::Debug;

    /// Take both channels from the shared pool.
    fn claim(&mut self) -> Result<(), Self::Error>;

    /// Return both channels to the pool. Idempotent.
    fn release(&mut self);

    /// Point the channels at `first` and `second`, chain them to each other
    /// and enable `first`. The peripheral must not be started before this
    /// returns.
    fn prime(&mut self, first: &mut [W], second: &mut [W]) -> Result<(), Self::Error>;

    /// `true` once `half` has been completely written. Latches until the
    /// half is rewound.
    fn poll_filled(&mut self, half: HalfIndex, memory: &mut [W]) -> bool;

    /// `true` when `half` has been completely written, without latching or
    /// clearing anything. Used to spot the hardware lapping the reader.
    fn peek_filled(&self, half: HalfIndex) -> bool;

    /// Reset `half`'s write address to the start of `memory` and clear its
    /// completion flag, leaving it armed for the chain trigger.
    fn rewind(&mut self, half: HalfIndex, memory: &mut [W]);

    /// Abort both channels and clear pending completion flags.
    fn abort(&mut self);

    /// Stall recovery: abort `half`'s channel and leave it disabled.
    fn force_idle(&mut self, half: HalfIndex);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_half_swaps() {
        assert_eq!(HalfIndex::A.other(), HalfIndex::B);
        assert_eq!(HalfIndex::B.other().other(), HalfIndex::B);
    }
}
