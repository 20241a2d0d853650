//! Capture domain newtypes for compile-time safety.
//!
//! These zero-cost abstractions prevent common errors:
//! - `SampleRateHz`: validates the sequencer's reachable range
//! - `ChannelIndex`: a line/ADC index in `0..8`
//! - `ChannelMask`: 8-bit enable mask with ascending-order iteration
//! - `AdcCode`: raw conversion result masked to 12 bits
//! - `Edge`: transition polarity shared by triggers and the line watcher

use crate::config::{MAX_CHANNELS, MAX_CHANNEL_INDEX};

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("value {value} outside {min}..={max}")]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

// ── SampleRateHz ─────────────────────────────────────────────────────────────

/// Digital sample rate in Hz.
///
/// The lower bound is reached through the sequencer's slow program; the upper
/// bound is one sample per [`CYCLES_PER_SAMPLE`](crate::sampler::CYCLES_PER_SAMPLE)
/// system clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct SampleRateHz(u32);

impl SampleRateHz {
    /// Minimum supported sample rate: 1 Hz (slow sequencer program).
    pub const MIN_HZ: u32 = 1;

    /// Maximum supported sample rate.
    pub const MAX_HZ: u32 = 5_000_000;

    /// The slowest rate, as a value.
    pub const MIN: Self = Self(Self::MIN_HZ);

    /// Create a `SampleRateHz`, returning an error if out of range.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `hz < MIN_HZ` or `hz > MAX_HZ`.
    pub fn new(hz: u32) -> Result<Self, OutOfRangeError> {
        if (Self::MIN_HZ..=Self::MAX_HZ).contains(&hz) {
            Ok(Self(hz))
        } else {
            Err(OutOfRangeError {
                value: hz,
                min: Self::MIN_HZ,
                max: Self::MAX_HZ,
            })
        }
    }

    /// Return the sample rate in Hz.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

// ── ChannelIndex ─────────────────────────────────────────────────────────────

/// A digital line or ADC channel number, `0..8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ChannelIndex(u8);

impl ChannelIndex {
    /// Create a `ChannelIndex`, rejecting anything past the 8-channel limit.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `index >= 8`.
    pub fn new(index: u8) -> Result<Self, OutOfRangeError> {
        if usize::from(index) < MAX_CHANNELS {
            Ok(Self(index))
        } else {
            Err(OutOfRangeError {
                value: u32::from(index),
                min: 0,
                max: MAX_CHANNEL_INDEX,
            })
        }
    }

    /// Return the raw channel number.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Single-bit mask for this channel.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // Safety: index < 8, shift cannot overflow
    pub fn bit(self) -> u8 {
        1u8 << self.0
    }
}

// ── ChannelMask ──────────────────────────────────────────────────────────────

/// Enable mask over up to 8 channels (bit n = channel n).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ChannelMask(u8);

impl ChannelMask {
    /// No channel enabled.
    pub const NONE: Self = Self(0);

    /// All 8 channels enabled.
    pub const ALL: Self = Self(0xFF);

    /// Wrap a raw mask.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw mask bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Number of enabled channels.
    #[must_use]
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// `true` when no channel is enabled.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` if `channel` is enabled.
    #[must_use]
    pub fn contains(self, channel: ChannelIndex) -> bool {
        self.0 & channel.bit() != 0
    }

    /// Return a copy with `channel` enabled or disabled.
    #[must_use]
    pub fn with(self, channel: ChannelIndex, enabled: bool) -> Self {
        if enabled {
            Self(self.0 | channel.bit())
        } else {
            Self(self.0 & !channel.bit())
        }
    }

    /// Lowest enabled channel, if any.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // trailing_zeros of a non-zero u8 is < 8
    pub fn first(self) -> Option<ChannelIndex> {
        if self.0 == 0 {
            None
        } else {
            Some(ChannelIndex(self.0.trailing_zeros() as u8))
        }
    }

    /// Enabled channels in ascending index order.
    #[allow(clippy::arithmetic_side_effects)] // Safety: ch < 8
    pub fn iter(self) -> impl Iterator<Item = ChannelIndex> {
        (0u8..8)
            .filter(move |ch| self.0 & (1u8 << ch) != 0)
            .map(ChannelIndex)
    }
}

// ── AdcCode ──────────────────────────────────────────────────────────────────

/// A raw 12-bit ADC conversion result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct AdcCode(u16);

impl AdcCode {
    /// Mask applied to every conversion word.
    pub const MASK: u16 = 0x0FFF;

    /// Full-scale code.
    pub const MAX: Self = Self(Self::MASK);

    /// Build from a raw FIFO word, discarding the error flag and padding bits.
    #[must_use]
    pub const fn from_raw(word: u16) -> Self {
        Self(word & Self::MASK)
    }

    /// The 12-bit code.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

// ── Edge ─────────────────────────────────────────────────────────────────────

/// Transition polarity watched by edge and level-crossing triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Low → high (or below → above a level).
    #[default]
    Rising,
    /// High → low.
    Falling,
    /// Either direction.
    Either,
}

impl Edge {
    /// `true` if a transition from `was_high` to `is_high` matches this edge.
    #[must_use]
    pub fn matches(self, was_high: bool, is_high: bool) -> bool {
        match self {
            Edge::Rising => !was_high && is_high,
            Edge::Falling => was_high && !is_high,
            Edge::Either => was_high != is_high,
        }
    }
}
