//! DMA channel plan for the capture ping-pongs.
//!
//! Each ping-pong is two channels chained to each other: when the channel
//! filling half A reaches its transfer count it triggers the channel for
//! half B, and vice versa. The CPU only rewinds the idle channel's write
//! address, which is a non-triggering register write, so the chain is never
//! broken while a half is being drained.
//!
//! # Channel assignment
//!
//! | Channel | Role            | DREQ        | Word |
//! |---------|-----------------|-------------|------|
//! | 8       | digital half A  | PIO1 RX0    | u8   |
//! | 9       | digital half B  | PIO1 RX0    | u8   |
//! | 10      | analog half A   | ADC FIFO    | u16  |
//! | 11      | analog half B   | ADC FIFO    | u16  |
//!
//! Channels 0..=7 belong to the routing and LED subsystems between captures.

use platform::memory::{CAPTURE_DMA_CHANNELS, DMA_CHANNEL_COUNT};
use platform::HalfIndex;

use crate::claims::Resource;

/// Transfer request line paced by PIO1 state machine 0's RX FIFO.
pub const DREQ_PIO1_RX0: u8 = 12;

/// Transfer request line paced by the ADC FIFO.
pub const DREQ_ADC: u8 = 36;

/// Two chained channels serving one ping-pong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaRoute {
    /// Channel filling half A, then half B.
    pub channels: [u8; 2],
    /// Pacing request line.
    pub dreq: u8,
}

impl DmaRoute {
    /// Channel writing `half`.
    pub fn channel(self, half: HalfIndex) -> u8 {
        let [a, b] = self.channels;
        match half {
            HalfIndex::A => a,
            HalfIndex::B => b,
        }
    }

    /// `CHAIN_TO` value for the channel writing `half`: its sibling.
    pub fn chain_to(self, half: HalfIndex) -> u8 {
        self.channel(half.other())
    }

    /// Bit of `half`'s channel in the DMA interrupt registers.
    #[allow(clippy::arithmetic_side_effects)] // Safety: channel < 12 checked by CaptureDmaPlan::validate
    pub fn irq_bit(self, half: HalfIndex) -> u32 {
        1 << self.channel(half)
    }

    /// Both channels' interrupt bits.
    pub fn irq_mask(self) -> u32 {
        self.irq_bit(HalfIndex::A) | self.irq_bit(HalfIndex::B)
    }

    /// Claimable resources backing this route.
    pub fn resources(self) -> [Resource; 2] {
        let [a, b] = self.channels;
        [Resource::DmaChannel(a), Resource::DmaChannel(b)]
    }
}

/// Invalid channel assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaPlanError {
    /// A channel number is past the last DMA channel.
    NoSuchChannel(u8),
    /// The same channel serves two roles.
    Shared(u8),
}

/// Channel routes for both capture ping-pongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureDmaPlan {
    /// Sequencer → digital halves.
    pub digital: DmaRoute,
    /// ADC → analog halves.
    pub analog: DmaRoute,
}

impl CaptureDmaPlan {
    /// The board assignment from [`CAPTURE_DMA_CHANNELS`].
    pub const RP2040: Self = {
        let [da, db, aa, ab] = CAPTURE_DMA_CHANNELS;
        Self {
            digital: DmaRoute {
                channels: [da, db],
                dreq: DREQ_PIO1_RX0,
            },
            analog: DmaRoute {
                channels: [aa, ab],
                dreq: DREQ_ADC,
            },
        }
    };

    /// Every channel exists and serves exactly one role.
    pub fn validate(&self) -> Result<(), DmaPlanError> {
        let [da, db] = self.digital.channels;
        let [aa, ab] = self.analog.channels;
        let all = [da, db, aa, ab];
        let mut seen = 0u16;
        for ch in all {
            if ch >= DMA_CHANNEL_COUNT {
                return Err(DmaPlanError::NoSuchChannel(ch));
            }
            #[allow(clippy::arithmetic_side_effects)] // Safety: ch < 12
            let bit = 1u16 << ch;
            if seen & bit != 0 {
                return Err(DmaPlanError::Shared(ch));
            }
            seen |= bit;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_plan_is_valid() {
        assert_eq!(CaptureDmaPlan::RP2040.validate(), Ok(()));
    }

    #[test]
    fn halves_chain_to_each_other() {
        let route = CaptureDmaPlan::RP2040.digital;
        assert_eq!(route.chain_to(HalfIndex::A), route.channel(HalfIndex::B));
        assert_eq!(route.chain_to(HalfIndex::B), route.channel(HalfIndex::A));
    }

    #[test]
    fn irq_mask_covers_both_channels() {
        let route = CaptureDmaPlan::RP2040.analog;
        assert_eq!(route.irq_mask(), (1 << 10) | (1 << 11));
    }

    #[test]
    fn shared_channel_is_rejected() {
        let mut plan = CaptureDmaPlan::RP2040;
        plan.analog.channels = [9, 11];
        assert_eq!(plan.validate(), Err(DmaPlanError::Shared(9)));
        plan.analog.channels = [10, 12];
        assert_eq!(plan.validate(), Err(DmaPlanError::NoSuchChannel(12)));
    }
}
