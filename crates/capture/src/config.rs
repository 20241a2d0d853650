//! Runtime tunables for the planner and the capture loop.
//!
//! Device constants (clocks, channel counts, arena size) live in
//! `platform::config`; these are the knobs a board or a test may reasonably
//! change. Defaults match the RP2040 board.

use platform::config::{ADC_CLOCK_HZ, ADC_MAX_THROUGHPUT_SPS, SYS_CLOCK_HZ};
use platform::{AdcClockDivisor, OutOfRangeError};

/// Buffer Layout Planner settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlannerConfig {
    /// Half size tried first, in samples.
    pub preferred_half_samples: u32,
    /// Bytes kept free below the arena capacity.
    pub safety_margin_bytes: u32,
    /// Ceiling on total ADC conversions per second across channels.
    pub adc_max_throughput_sps: u32,
    /// Slowest conversion rate the ADC divider can pace.
    pub adc_min_throughput_sps: u32,
}

impl PlannerConfig {
    /// Largest preferred half the planner accepts.
    pub const MAX_HALF_SAMPLES: u32 = 1 << 20;

    /// Check every field against its valid range.
    pub fn validate(&self) -> Result<(), OutOfRangeError> {
        check(self.preferred_half_samples, 1, Self::MAX_HALF_SAMPLES)?;
        check(self.adc_max_throughput_sps, 1, u32::MAX)?;
        check(self.adc_min_throughput_sps, 1, self.adc_max_throughput_sps)?;
        Ok(())
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            preferred_half_samples: 4096,
            safety_margin_bytes: 1024,
            adc_max_throughput_sps: ADC_MAX_THROUGHPUT_SPS,
            adc_min_throughput_sps: AdcClockDivisor::min_rate(ADC_CLOCK_HZ),
        }
    }
}

/// Capture engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    /// Planner settings.
    pub planner: PlannerConfig,
    /// Sequencer input clock.
    pub sys_clock_hz: u32,
    /// ADC input clock.
    pub adc_clock_hz: u32,
    /// Pause between polls of an unfinished half.
    pub stall_poll_interval_us: u32,
    /// Slack on top of two half periods before a half counts as stalled.
    pub stall_margin_us: u32,
    /// Zero-progress write attempts per flush before giving up.
    pub flush_retry_limit: u32,
    /// First backoff delay after a refused write.
    pub backoff_initial_us: u32,
    /// Backoff ceiling.
    pub backoff_max_us: u32,
    /// Sample rate of a fresh session.
    pub default_sample_rate_hz: u32,
    /// Post-trigger sample count of a fresh session.
    pub default_total_samples: u32,
}

impl EngineConfig {
    /// Check every field against its valid range.
    pub fn validate(&self) -> Result<(), OutOfRangeError> {
        self.planner.validate()?;
        check(self.sys_clock_hz, 1, u32::MAX)?;
        check(self.adc_clock_hz, 1, u32::MAX)?;
        check(self.stall_poll_interval_us, 1, 1_000_000)?;
        check(self.flush_retry_limit, 1, 1_000)?;
        check(self.backoff_initial_us, 1, self.backoff_max_us.max(1))?;
        check(
            self.default_sample_rate_hz,
            platform::SampleRateHz::MIN_HZ,
            platform::SampleRateHz::MAX_HZ,
        )?;
        check(self.default_total_samples, 1, u32::MAX)?;
        Ok(())
    }

    /// Microseconds a half of `samples_per_half` may stay unfinished at
    /// `sample_rate_hz` before the run is declared stalled.
    #[allow(clippy::arithmetic_side_effects)] // Safety: u64 math on u32/usize inputs; rate ≥ 1
    pub fn stall_budget_us(&self, samples_per_half: usize, sample_rate_hz: u32) -> u64 {
        let half_us =
            (samples_per_half as u64).saturating_mul(1_000_000) / u64::from(sample_rate_hz.max(1));
        half_us.saturating_mul(2).saturating_add(u64::from(self.stall_margin_us))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            planner: PlannerConfig::default(),
            sys_clock_hz: SYS_CLOCK_HZ,
            adc_clock_hz: ADC_CLOCK_HZ,
            stall_poll_interval_us: 5,
            stall_margin_us: 250_000,
            flush_retry_limit: 16,
            backoff_initial_us: 10,
            backoff_max_us: 1_000,
            default_sample_rate_hz: 10_000,
            default_total_samples: 1_000,
        }
    }
}

fn check(value: u32, min: u32, max: u32) -> Result<(), OutOfRangeError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(OutOfRangeError { value, min, max })
    }
}
