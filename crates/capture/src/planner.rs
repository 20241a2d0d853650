//! Buffer Layout Planner.
//!
//! Sizes the four ping-pong halves for one session:
//!
//! ```text
//! [ digital A | digital B | analog A | analog B ]
//!   N bytes     N bytes     G·C words  G·C words     G = N / k, C = analog channels
//! ```
//!
//! `k` (the decimation factor) is the smallest integer keeping
//! `rate / k × C` under the ADC ceiling. The half size starts at the
//! preferred size (or the requested count, if smaller) and halves until
//! `2N + 4·G·C ≤ free − margin`. `N` is always a multiple of `k × max(C, 1)`
//! so every analog half holds whole round-robin groups.

use platform::{ChannelMask, SampleRateHz};

use crate::config::PlannerConfig;
use crate::error::PlanError;

/// Planner input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlanRequest {
    /// Digital sample rate.
    pub sample_rate: SampleRateHz,
    /// Post-trigger samples requested.
    pub total_samples: u32,
    /// Enabled digital lines.
    pub digital: ChannelMask,
    /// Enabled ADC channels.
    pub analog: ChannelMask,
    /// Arena capacity in bytes.
    pub free_bytes: usize,
}

/// Planner output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferLayout {
    /// Time samples per half.
    pub samples_per_half: usize,
    /// Bytes per digital half (one per sample).
    pub digital_bytes_per_half: usize,
    /// 16-bit words per analog half.
    pub analog_words_per_half: usize,
    /// Round-robin groups per analog half.
    pub analog_groups_per_half: usize,
    /// Digital samples per analog group (≥ 1).
    pub decimation_factor: u32,
    /// Enabled ADC channel count.
    pub analog_channels: usize,
}

impl BufferLayout {
    /// Bytes used by all four halves.
    #[allow(clippy::arithmetic_side_effects)] // Safety: bounded by the arena size checked in plan()
    pub fn total_bytes(&self) -> usize {
        2 * self.digital_bytes_per_half + 4 * self.analog_words_per_half
    }

    /// `true` if analog halves are allocated.
    pub fn has_analog(&self) -> bool {
        self.analog_channels > 0
    }
}

/// Smallest `k` such that `rate / k × channels ≤ ceiling`.
#[allow(clippy::arithmetic_side_effects)] // Safety: u64 math; ceiling > 0 (validated config)
#[allow(clippy::cast_possible_truncation)] // k ≤ rate × 8 ≤ 40 M
pub fn decimation_factor(sample_rate: SampleRateHz, analog_channels: usize, ceiling: u32) -> u32 {
    let demand = u64::from(sample_rate.get()) * analog_channels as u64;
    let ceiling = u64::from(ceiling.max(1));
    if demand <= ceiling {
        1
    } else {
        demand.div_ceil(ceiling) as u32
    }
}

/// Bytes needed by a layout of `samples` per half.
#[allow(clippy::arithmetic_side_effects)] // Safety: samples ≤ 2^20, channels ≤ 8, k ≥ 1
fn layout_bytes(samples: usize, decimation: usize, channels: usize) -> usize {
    2 * samples + 4 * (samples / decimation) * channels
}

/// Compute the half layout for `request`.
///
/// Halves the preferred size until the layout fits; fails rather than dropping
/// a channel or rounding the half to zero.
#[allow(clippy::arithmetic_side_effects)] // Safety: unit ≥ 1; sizes bounded by MAX_HALF_SAMPLES
pub fn plan(request: &PlanRequest, config: &PlannerConfig) -> Result<BufferLayout, PlanError> {
    if request.digital.is_empty() && request.analog.is_empty() {
        return Err(PlanError::NoChannels);
    }
    if request.total_samples == 0 {
        return Err(PlanError::InvalidRequest);
    }

    let channels = request.analog.count();
    let k = decimation_factor(request.sample_rate, channels, config.adc_max_throughput_sps);
    if channels > 0 {
        let conversions = u64::from(request.sample_rate.get() / k) * channels as u64;
        if conversions < u64::from(config.adc_min_throughput_sps) {
            warn!(
                "{} ADC conversions/s is below the divider floor of {}",
                conversions,
                config.adc_min_throughput_sps
            );
            return Err(PlanError::InvalidRequest);
        }
    }
    let k_usize = k as usize;
    let unit = k_usize * channels.max(1);

    let preferred = config.preferred_half_samples as usize;
    let wanted = (request.total_samples as usize).div_ceil(unit) * unit;
    let mut samples = round_down(preferred.min(wanted), unit);

    let margin = config.safety_margin_bytes as usize;
    let budget = request.free_bytes.saturating_sub(margin);

    loop {
        let bytes = layout_bytes(samples, k_usize, channels);
        if bytes <= budget {
            break;
        }
        if samples <= unit {
            return Err(PlanError::InsufficientMemory {
                required: bytes + margin,
                available: request.free_bytes,
            });
        }
        samples = round_down(samples / 2, unit);
    }

    let groups = samples / k_usize;
    let layout = BufferLayout {
        samples_per_half: samples,
        digital_bytes_per_half: samples,
        analog_words_per_half: groups * channels,
        analog_groups_per_half: groups,
        decimation_factor: k,
        analog_channels: channels,
    };
    debug!(
        "layout: {} samples/half, k={}, {} analog words/half",
        layout.samples_per_half,
        layout.decimation_factor,
        layout.analog_words_per_half
    );
    Ok(layout)
}

/// Round `value` down to a multiple of `unit`, never below `unit`.
#[allow(clippy::arithmetic_side_effects)] // Safety: unit ≥ 1
fn round_down(value: usize, unit: usize) -> usize {
    (value - value % unit).max(unit)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests unwrap known-valid plans
mod tests {
    use super::*;

    fn request(rate: u32, total: u32, digital: u8, analog: u8, free: usize) -> PlanRequest {
        PlanRequest {
            sample_rate: SampleRateHz::new(rate).unwrap(),
            total_samples: total,
            digital: ChannelMask::from_bits(digital),
            analog: ChannelMask::from_bits(analog),
            free_bytes: free,
        }
    }

    #[test]
    fn short_capture_fits_one_half() {
        let layout = plan(&request(10_000, 100, 0xFF, 0x01, 64 * 1024), &PlannerConfig::default())
            .unwrap();
        assert_eq!(layout.samples_per_half, 100);
        assert_eq!(layout.decimation_factor, 1);
        assert_eq!(layout.analog_words_per_half, 100);
    }

    #[test]
    fn long_capture_uses_preferred_half() {
        let layout = plan(
            &request(10_000, 1_000_000, 0xFF, 0, 64 * 1024),
            &PlannerConfig::default(),
        )
        .unwrap();
        assert_eq!(layout.samples_per_half, 4096);
        assert_eq!(layout.analog_words_per_half, 0);
    }

    #[test]
    fn decimation_kicks_in_above_ceiling() {
        assert_eq!(decimation_factor(SampleRateHz::new(800_000).unwrap(), 1, 200_000), 4);
        assert_eq!(decimation_factor(SampleRateHz::new(100_000).unwrap(), 3, 200_000), 2);
        assert_eq!(decimation_factor(SampleRateHz::new(100_000).unwrap(), 2, 200_000), 1);
        assert_eq!(decimation_factor(SampleRateHz::new(5_000_000).unwrap(), 0, 200_000), 1);
    }

    #[test]
    fn analog_words_are_whole_groups() {
        let layout = plan(&request(150_000, 5_000, 0, 0b0111, 64 * 1024), &PlannerConfig::default())
            .unwrap();
        assert_eq!(layout.decimation_factor, 3);
        assert_eq!(layout.samples_per_half % 9, 0);
        assert_eq!(layout.analog_words_per_half % 3, 0);
        assert_eq!(layout.analog_groups_per_half * 3, layout.samples_per_half);
    }

    #[test]
    fn shrinks_to_fit_memory() {
        // 4096 samples + 4096 analog words would need 8 KiB + 16 KiB.
        let layout = plan(&request(10_000, 100_000, 0xFF, 0x01, 8 * 1024), &PlannerConfig::default())
            .unwrap();
        assert_eq!(layout.samples_per_half, 1024);
        assert!(layout.total_bytes() <= 8 * 1024 - 1024);
    }

    #[test]
    fn no_channels_rejected() {
        assert_eq!(
            plan(&request(10_000, 100, 0, 0, 64 * 1024), &PlannerConfig::default()),
            Err(PlanError::NoChannels)
        );
    }

    #[test]
    fn zero_samples_rejected() {
        assert_eq!(
            plan(&request(10_000, 0, 1, 0, 64 * 1024), &PlannerConfig::default()),
            Err(PlanError::InvalidRequest)
        );
    }

    #[test]
    fn analog_below_adc_floor_rejected() {
        // 100 conversions/s cannot be paced by a 16.8-bit divider on 48 MHz.
        assert_eq!(
            plan(&request(100, 1_000, 0x01, 0x01, 64 * 1024), &PlannerConfig::default()),
            Err(PlanError::InvalidRequest)
        );
        // Four channels at 200 Hz are 800 conversions/s, above the floor.
        assert!(plan(&request(200, 1_000, 0, 0x0F, 64 * 1024), &PlannerConfig::default()).is_ok());
        // Digital-only captures have no floor.
        assert!(plan(&request(100, 1_000, 0x01, 0, 64 * 1024), &PlannerConfig::default()).is_ok());
    }

    #[test]
    fn insufficient_memory_is_explicit() {
        let err = plan(&request(10_000, 100, 0xFF, 0xFF, 1024), &PlannerConfig::default());
        assert!(matches!(err, Err(PlanError::InsufficientMemory { .. })));
    }
}
