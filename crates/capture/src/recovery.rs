//! DMA stall recovery tracking.
//!
//! A stalled half means the DMA chain stopped: either the sequencer never
//! produced data (clock misconfigured, state machine wedged) or a chain link
//! was lost. The coordinator forces the stalled channel idle and aborts the
//! capture; before the next arm the caller must reset the acquisition blocks
//! (abort both channels, drain the ADC FIFO, restart the sequencer) and then
//! report recovery here.
//!
//! # Usage Pattern
//!
//! ```rust,ignore
//! if recovery.needs_recovery() {
//!     dma.abort();
//!     adc.drain_fifo();
//!     recovery.on_recovered();
//! }
//! ```

// ─── State machine ───────────────────────────────────────────────────────────

/// DMA chain health.
///
/// The `stall_count` field saturates at [`u8::MAX`] so sustained failure
/// cannot wrap before the caller reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaRecoveryState {
    /// Chains completed normally on the last capture.
    #[default]
    Healthy,
    /// One or more captures stalled since the last recovery.
    NeedsRecovery {
        /// Stalls since the last recovery. Saturates at 255.
        stall_count: u8,
    },
}

impl DmaRecoveryState {
    /// Healthy state.
    pub const fn new() -> Self {
        Self::Healthy
    }

    /// `true` if the blocks must be reset before the next arm.
    pub fn needs_recovery(&self) -> bool {
        matches!(self, Self::NeedsRecovery { .. })
    }

    /// Record a stalled half.
    pub fn on_stall(&mut self) {
        *self = Self::NeedsRecovery {
            stall_count: match self {
                Self::NeedsRecovery { stall_count } => stall_count.saturating_add(1),
                Self::Healthy => 1,
            },
        };
    }

    /// Record a completed reset. No-op when healthy.
    pub fn on_recovered(&mut self) {
        *self = Self::Healthy;
    }

    /// Stalls since last recovery, 0 if healthy.
    pub fn stall_count(&self) -> u8 {
        match self {
            Self::NeedsRecovery { stall_count } => *stall_count,
            Self::Healthy => 0,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_healthy() {
        assert_eq!(DmaRecoveryState::new(), DmaRecoveryState::Healthy);
        assert!(!DmaRecoveryState::new().needs_recovery());
    }

    #[test]
    fn stalls_accumulate_until_recovered() {
        let mut state = DmaRecoveryState::new();
        state.on_stall();
        state.on_stall();
        assert_eq!(state, DmaRecoveryState::NeedsRecovery { stall_count: 2 });
        state.on_recovered();
        assert_eq!(state.stall_count(), 0);
    }

    #[test]
    fn stall_count_saturates() {
        let mut state = DmaRecoveryState::new();
        for _ in 0..300 {
            state.on_stall();
        }
        assert_eq!(state.stall_count(), u8::MAX);
    }
}
