//! Acquisition engine abstractions: the digital sequencer and the ADC.
//!
//! Both engines run autonomously once started; the CPU only configures them
//! and reads the memory their DMA channels fill. Clock arithmetic lives here
//! as plain functions so it can be checked on the host.

use crate::types::{ChannelIndex, ChannelMask, Edge, SampleRateHz};

/// Sequencer cycles spent per sample by the continuous program
/// (`in pins, 8` with autopush, wrapped onto itself).
pub const CYCLES_PER_SAMPLE: u32 = 1;

/// Fixed sequencer overhead per sample in the slow program:
/// `in`, `irq`, `mov` plus the final `jmp` fall-through.
pub const SLOW_PROGRAM_OVERHEAD_CYCLES: u32 = 4;

/// Integer clock divider pinned while the slow program runs.
pub const SLOW_PROGRAM_DIVIDER: u16 = 250;

/// Largest integer part of the sequencer's 16.8 clock divider.
pub const MAX_DIVIDER_INT: u16 = u16::MAX;

// ── Clock dividers ───────────────────────────────────────────────────────────

/// 16.8 fixed-point sequencer clock divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockDivider {
    /// Integer part (1..=65535).
    pub int: u16,
    /// Fractional part in 1/256ths.
    pub frac: u8,
}

impl ClockDivider {
    /// Divider of exactly 1 (sequencer at full system clock).
    pub const UNITY: Self = Self { int: 1, frac: 0 };

    /// Divide `clock_hz` down so that `ticks_per_second` sequencer cycles
    /// elapse per second. Returns `None` if the integer part would exceed
    /// [`MAX_DIVIDER_INT`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // shifted/masked values fit their fields
    #[allow(clippy::arithmetic_side_effects)] // Safety: u64 math on u32 inputs; ticks checked non-zero
    pub fn for_ticks(clock_hz: u32, ticks_per_second: u32) -> Option<Self> {
        if ticks_per_second == 0 {
            return None;
        }
        let bits = (u64::from(clock_hz) << 8) / u64::from(ticks_per_second);
        let int = bits >> 8;
        if int > u64::from(MAX_DIVIDER_INT) {
            return None;
        }
        if int == 0 {
            return Some(Self::UNITY);
        }
        Some(Self {
            int: int as u16,
            frac: (bits & 0xFF) as u8,
        })
    }

    /// Raw 24-bit value (`int << 8 | frac`) as written to the divider register.
    #[must_use]
    pub fn bits(self) -> u32 {
        (u32::from(self.int) << 8) | u32::from(self.frac)
    }
}

/// Which sequencer program samples the lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerProgram {
    /// One `in pins, 8` per cycle; the divider alone sets the rate.
    Continuous,
    /// Capture one sample, raise IRQ 0, then spin `delay_cycles` + 1 cycles.
    ///
    /// Used when the continuous program would need a divider above
    /// [`MAX_DIVIDER_INT`].
    Slow {
        /// Value preloaded into the Y scratch register.
        delay_cycles: u32,
    },
}

/// Sequencer program and clock divider for one sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequencerTiming {
    /// Program to load.
    pub program: SequencerProgram,
    /// Clock divider for the state machine.
    pub divider: ClockDivider,
}

impl SequencerTiming {
    /// Pick the program and divider for `rate` on a `sys_clock_hz` sequencer.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // Safety: rate >= 1 (newtype); saturating_sub guards the overhead
    pub fn for_rate(rate: SampleRateHz, sys_clock_hz: u32) -> Self {
        let ticks = rate.get().saturating_mul(CYCLES_PER_SAMPLE);
        if let Some(divider) = ClockDivider::for_ticks(sys_clock_hz, ticks) {
            return Self {
                program: SequencerProgram::Continuous,
                divider,
            };
        }
        let slow_clock = sys_clock_hz / u32::from(SLOW_PROGRAM_DIVIDER);
        let cycles_per_sample = (slow_clock / rate.get()).max(SLOW_PROGRAM_OVERHEAD_CYCLES);
        Self {
            program: SequencerProgram::Slow {
                delay_cycles: cycles_per_sample.saturating_sub(SLOW_PROGRAM_OVERHEAD_CYCLES),
            },
            divider: ClockDivider {
                int: SLOW_PROGRAM_DIVIDER,
                frac: 0,
            },
        }
    }

    /// Achieved sample rate in millihertz (for logging and status).
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // Safety: u64 math; divisor >= 256
    pub fn achieved_rate_millihz(self, sys_clock_hz: u32) -> u64 {
        let cycles = match self.program {
            SequencerProgram::Continuous => u64::from(CYCLES_PER_SAMPLE),
            SequencerProgram::Slow { delay_cycles } => {
                u64::from(delay_cycles) + u64::from(SLOW_PROGRAM_OVERHEAD_CYCLES)
            }
        };
        let divisor = u64::from(self.divider.bits()) * cycles;
        (u64::from(sys_clock_hz) * 256 * 1000) / divisor
    }
}

/// 16.8 fixed-point ADC `DIV` register value.
///
/// The ADC starts a conversion every `1 + int + frac/256` clock cycles; a
/// conversion itself takes 96 cycles, so dividers below 95 run flat out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcClockDivisor {
    /// Integer part.
    pub int: u16,
    /// Fractional part in 1/256ths.
    pub frac: u8,
}

impl AdcClockDivisor {
    /// Divisor starting `conversions_per_second` conversions on an
    /// `adc_clock_hz` clock. Saturates at both ends.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // clamped before narrowing
    #[allow(clippy::arithmetic_side_effects)] // Safety: u64 math; rate checked non-zero
    pub fn for_rate(conversions_per_second: u32, adc_clock_hz: u32) -> Self {
        if conversions_per_second == 0 {
            return Self {
                int: u16::MAX,
                frac: 0xFF,
            };
        }
        let period = (u64::from(adc_clock_hz) << 8) / u64::from(conversions_per_second);
        let bits = period.saturating_sub(256).min((u64::from(u16::MAX) << 8) | 0xFF);
        Self {
            int: (bits >> 8) as u16,
            frac: (bits & 0xFF) as u8,
        }
    }

    /// Slowest conversion rate reachable on an `adc_clock_hz` clock, rounded
    /// up so that [`for_rate`](Self::for_rate) never clamps at this value.
    #[must_use]
    pub fn min_rate(adc_clock_hz: u32) -> u32 {
        // Largest divisor is 1 + 65535 + 255/256 cycles, i.e. 2^24 / 256.
        adc_clock_hz.div_ceil(65_536).max(1)
    }
}

// ── Engine traits ────────────────────────────────────────────────────────────

/// Programmable I/O sequencer sampling 8 digital lines into bytes.
///
/// The sequencer block is shared with the crossbar routing subsystem, so
/// every arm cycle must [`claim`](Self::claim) it and every teardown must
/// [`release`](Self::release) it.
pub trait DigitalSampler {
    /// Error type
    type Error: core::fmt::Debug;

    /// Take ownership of a state machine and its instruction memory.
    fn claim(&mut self) -> Result<(), Self::Error>;

    /// Return the state machine to the shared pool. Idempotent.
    fn release(&mut self);

    /// Load the program and divider. Must be called while stopped.
    fn configure(&mut self, timing: SequencerTiming, lines: ChannelMask)
        -> Result<(), Self::Error>;

    /// Enable the state machine. Call only after both DMA halves are primed.
    fn start(&mut self);

    /// Disable the state machine and clear its FIFOs.
    fn stop(&mut self);

    /// Current line levels, bit n = line n.
    fn pins(&self) -> u8;

    /// Arm the hardware edge watcher on `line`.
    ///
    /// Returns `false` when the backend has no interrupt-driven watcher; the
    /// caller then falls back to evaluating captured samples.
    fn watch_edge(&mut self, line: ChannelIndex, edge: Edge) -> bool;

    /// `true` once the armed edge has been seen. Clears the latch.
    fn edge_seen(&mut self) -> bool;
}

/// Round-robin ADC feeding a DMA ping-pong with 16-bit words.
pub trait AnalogSampler {
    /// Error type
    type Error: core::fmt::Debug;

    /// Program the clock divisor and the round-robin mask, selecting the
    /// first enabled channel as the starting input.
    fn configure(&mut self, divisor: AdcClockDivisor, channels: ChannelMask)
        -> Result<(), Self::Error>;

    /// Discard stale FIFO content. Returns the number of words dropped.
    fn drain_fifo(&mut self) -> usize;

    /// Start free-running conversions. Call only after DMA is primed.
    fn start(&mut self);

    /// Stop conversions and disable round-robin.
    fn stop(&mut self);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests unwrap known-valid constructor inputs
mod tests {
    use super::*;
    use crate::config::{ADC_CLOCK_HZ, SYS_CLOCK_HZ};

    fn rate(hz: u32) -> SampleRateHz {
        SampleRateHz::new(hz).unwrap()
    }

    #[test]
    fn fast_rates_use_continuous_program() {
        let timing = SequencerTiming::for_rate(rate(1_000_000), SYS_CLOCK_HZ);
        assert_eq!(timing.program, SequencerProgram::Continuous);
        assert_eq!(timing.divider, ClockDivider { int: 125, frac: 0 });
    }

    #[test]
    fn divider_keeps_fraction() {
        // 125 MHz / 300 kHz = 416.666… → 416 + 170/256
        let timing = SequencerTiming::for_rate(rate(300_000), SYS_CLOCK_HZ);
        assert_eq!(timing.divider.int, 416);
        assert_eq!(timing.divider.frac, 170);
    }

    #[test]
    fn rates_above_clock_clamp_to_unity() {
        let timing = SequencerTiming::for_rate(rate(SampleRateHz::MAX_HZ), 1_000_000);
        assert_eq!(timing.divider, ClockDivider::UNITY);
    }

    #[test]
    fn slow_rates_switch_program() {
        // 125 MHz / 65536 ≈ 1907 Hz is the continuous floor.
        let timing = SequencerTiming::for_rate(rate(1_000), SYS_CLOCK_HZ);
        assert_eq!(
            timing.program,
            SequencerProgram::Slow {
                delay_cycles: 500 - SLOW_PROGRAM_OVERHEAD_CYCLES
            }
        );
        assert_eq!(timing.divider.int, SLOW_PROGRAM_DIVIDER);
        assert_eq!(timing.achieved_rate_millihz(SYS_CLOCK_HZ), 1_000_000);
    }

    #[test]
    fn one_hertz_is_reachable() {
        let timing = SequencerTiming::for_rate(rate(1), SYS_CLOCK_HZ);
        assert!(matches!(timing.program, SequencerProgram::Slow { .. }));
        assert_eq!(timing.achieved_rate_millihz(SYS_CLOCK_HZ), 1_000);
    }

    #[test]
    fn adc_divisor_for_100k_groups() {
        // 48 MHz / 100 kS/s = 480 cycles → DIV = 479
        let div = AdcClockDivisor::for_rate(100_000, ADC_CLOCK_HZ);
        assert_eq!(div, AdcClockDivisor { int: 479, frac: 0 });
    }

    #[test]
    fn adc_divisor_saturates() {
        assert_eq!(AdcClockDivisor::for_rate(ADC_CLOCK_HZ * 2, ADC_CLOCK_HZ).int, 0);
        assert_eq!(AdcClockDivisor::for_rate(1, ADC_CLOCK_HZ).int, u16::MAX);
        assert_eq!(AdcClockDivisor::for_rate(0, ADC_CLOCK_HZ).int, u16::MAX);
    }

    #[test]
    fn adc_floor_is_last_unclamped_rate() {
        let floor = AdcClockDivisor::min_rate(ADC_CLOCK_HZ);
        assert_eq!(floor, 733);
        let at_floor = AdcClockDivisor::for_rate(floor, ADC_CLOCK_HZ);
        assert!(at_floor.int < u16::MAX || at_floor.frac < 0xFF);
        let below = AdcClockDivisor::for_rate(floor - 1, ADC_CLOCK_HZ);
        assert_eq!(below, AdcClockDivisor { int: u16::MAX, frac: 0xFF });
    }
}
