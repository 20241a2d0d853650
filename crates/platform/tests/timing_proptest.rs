//! Property-based tests for capture timing math and channel newtypes.
//! Verifies invariants hold for ALL valid inputs, not just fixed examples.

#![allow(clippy::unwrap_used)]
#![allow(clippy::arithmetic_side_effects)]

use platform::config::{ADC_CLOCK_HZ, SYS_CLOCK_HZ};
use platform::{AdcClockDivisor, ChannelMask, SampleRateHz, SequencerProgram, SequencerTiming};

proptest::proptest! {
    /// Every valid rate maps to a divider the hardware accepts.
    #[test]
    fn sequencer_divider_in_hardware_range(hz in SampleRateHz::MIN_HZ..=SampleRateHz::MAX_HZ) {
        let timing = SequencerTiming::for_rate(SampleRateHz::new(hz).unwrap(), SYS_CLOCK_HZ);
        assert!(timing.divider.int >= 1);
    }

    /// The achieved rate is never slower than requested and within 1%.
    ///
    /// Truncating the divider can only speed the sequencer up.
    #[test]
    fn achieved_rate_close_to_request(hz in 2_000u32..=SampleRateHz::MAX_HZ) {
        let timing = SequencerTiming::for_rate(SampleRateHz::new(hz).unwrap(), SYS_CLOCK_HZ);
        let achieved = timing.achieved_rate_millihz(SYS_CLOCK_HZ);
        let requested = u64::from(hz) * 1000;
        assert!(achieved >= requested, "{achieved} < {requested}");
        assert!(achieved * 99 <= requested * 100, "{achieved} too far above {requested}");
    }

    /// Rates below the continuous floor always select the slow program.
    #[test]
    fn slow_program_below_floor(hz in 1u32..1_900) {
        let timing = SequencerTiming::for_rate(SampleRateHz::new(hz).unwrap(), SYS_CLOCK_HZ);
        let is_slow = matches!(timing.program, SequencerProgram::Slow { .. });
        assert!(is_slow);
    }

    /// Higher conversion rates never get a larger ADC divisor.
    #[test]
    fn adc_divisor_monotone(a in 1u32..=500_000, b in 1u32..=500_000) {
        let da = AdcClockDivisor::for_rate(a, ADC_CLOCK_HZ);
        let db = AdcClockDivisor::for_rate(b, ADC_CLOCK_HZ);
        let (ka, kb) = ((da.int, da.frac), (db.int, db.frac));
        if a > b {
            assert!(ka <= kb);
        } else if a < b {
            assert!(ka >= kb);
        }
    }

    /// Mask iteration yields exactly `count()` channels in ascending order.
    #[test]
    fn mask_iteration_matches_count(bits in 0u8..=255) {
        let mask = ChannelMask::from_bits(bits);
        let channels: Vec<u8> = mask.iter().map(|c| c.get()).collect();
        assert_eq!(channels.len(), mask.count());
        assert!(channels.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(mask.first().map(|c| c.get()), channels.first().copied());
    }
}
