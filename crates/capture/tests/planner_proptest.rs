//! Property tests for the Buffer Layout Planner.

#![allow(clippy::unwrap_used)] // Property tests unwrap generated valid inputs
#![allow(clippy::arithmetic_side_effects)]

use capture::{decimation_factor, plan, PlanError, PlanRequest, PlannerConfig};
use platform::{ChannelMask, SampleRateHz};
use proptest::prelude::*;

fn request() -> impl Strategy<Value = PlanRequest> {
    (
        SampleRateHz::MIN_HZ..=SampleRateHz::MAX_HZ,
        1u32..2_000_000,
        any::<u8>(),
        any::<u8>(),
        0usize..(256 * 1024),
    )
        .prop_map(|(hz, total, digital, analog, free)| PlanRequest {
            sample_rate: SampleRateHz::new(hz).unwrap(),
            total_samples: total,
            digital: ChannelMask::from_bits(digital),
            analog: ChannelMask::from_bits(analog),
            free_bytes: free,
        })
}

proptest! {
    #[test]
    fn layout_fits_and_holds_whole_groups(req in request()) {
        let config = PlannerConfig::default();
        match plan(&req, &config) {
            Ok(layout) => {
                let channels = req.analog.count();
                let k = layout.decimation_factor as usize;
                let budget = req.free_bytes - config.safety_margin_bytes as usize;
                prop_assert!(layout.total_bytes() <= budget);
                prop_assert!(layout.samples_per_half > 0);
                prop_assert_eq!(layout.digital_bytes_per_half, layout.samples_per_half);
                prop_assert_eq!(layout.analog_channels, channels);
                prop_assert_eq!(layout.samples_per_half % (k * channels.max(1)), 0);
                prop_assert_eq!(layout.analog_groups_per_half * k, layout.samples_per_half);
                if channels > 0 {
                    prop_assert_eq!(layout.analog_words_per_half % channels, 0);
                    let group_rate = u64::from(req.sample_rate.get()) / k as u64;
                    prop_assert!(group_rate * channels as u64 <= u64::from(config.adc_max_throughput_sps));
                    prop_assert!(group_rate * channels as u64 >= u64::from(config.adc_min_throughput_sps));
                } else {
                    prop_assert_eq!(layout.analog_words_per_half, 0);
                }
            }
            Err(PlanError::NoChannels) => {
                prop_assert!(req.digital.is_empty() && req.analog.is_empty());
            }
            Err(PlanError::InsufficientMemory { required, available }) => {
                prop_assert_eq!(available, req.free_bytes);
                prop_assert!(required > req.free_bytes);
            }
            Err(PlanError::InvalidRequest) => {
                // total_samples is never 0 here, so only the ADC floor rejects.
                let channels = req.analog.count() as u64;
                prop_assert!(channels > 0);
                let k = decimation_factor(
                    req.sample_rate,
                    req.analog.count(),
                    config.adc_max_throughput_sps,
                );
                let conversions = u64::from(req.sample_rate.get() / k) * channels;
                prop_assert!(conversions < u64::from(config.adc_min_throughput_sps));
            }
        }
    }

    #[test]
    fn more_memory_never_shrinks_the_half(req in request(), extra in 0usize..(64 * 1024)) {
        let config = PlannerConfig::default();
        let bigger = PlanRequest { free_bytes: req.free_bytes + extra, ..req };
        if let Ok(small) = plan(&req, &config) {
            let large = plan(&bigger, &config).unwrap();
            prop_assert!(large.samples_per_half >= small.samples_per_half);
        }
    }
}
