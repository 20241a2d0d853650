//! Per-channel analog calibration.

use crate::config::ADC_FULL_SCALE_MICROVOLTS;
use crate::types::{AdcCode, ChannelIndex};

/// Linear code → voltage mapping for one ADC channel.
///
/// `microvolts = code * scale_microvolts + offset_microvolts`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelCalibration {
    /// Microvolts per ADC code.
    pub scale_microvolts: i32,
    /// Microvolts at code 0.
    pub offset_microvolts: i32,
}

impl ChannelCalibration {
    /// Uncalibrated mapping: full scale over 4096 codes, no offset.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // Safety: constant division by non-zero
    pub const fn nominal() -> Self {
        Self {
            scale_microvolts: ADC_FULL_SCALE_MICROVOLTS / 4096,
            offset_microvolts: 0,
        }
    }

    /// Convert a code to microvolts.
    #[must_use]
    pub fn to_microvolts(self, code: AdcCode) -> i32 {
        i32::from(code.get())
            .saturating_mul(self.scale_microvolts)
            .saturating_add(self.offset_microvolts)
    }
}

impl Default for ChannelCalibration {
    fn default() -> Self {
        Self::nominal()
    }
}

/// Source of per-channel calibration, typically persisted by the board
/// support layer.
pub trait CalibrationTable {
    /// Calibration for `channel`, or `None` if the channel has no ADC input.
    fn channel(&self, channel: ChannelIndex) -> Option<ChannelCalibration>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests unwrap known-valid constructor inputs
mod tests {
    use super::*;

    #[test]
    fn nominal_scale() {
        let cal = ChannelCalibration::nominal();
        assert_eq!(cal.scale_microvolts, 805);
        assert_eq!(cal.to_microvolts(AdcCode::from_raw(1000)), 805_000);
    }

    #[test]
    fn offset_applies() {
        let cal = ChannelCalibration {
            scale_microvolts: 800,
            offset_microvolts: -1_500,
        };
        assert_eq!(cal.to_microvolts(AdcCode::from_raw(0)), -1_500);
        assert_eq!(cal.to_microvolts(AdcCode::from_raw(2)), 100);
    }
}
