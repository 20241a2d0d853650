//! Per-board analog calibration.

use platform::config::{ANALOG_INPUTS, MAX_CHANNELS};
use platform::{CalibrationTable, ChannelCalibration, ChannelIndex};

/// Calibration for the four ADC inputs; channels past them report `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardCalibration {
    channels: [Option<ChannelCalibration>; MAX_CHANNELS],
}

impl BoardCalibration {
    /// Nominal scale on every ADC input.
    #[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)] // Safety: i < MAX_CHANNELS
    pub const fn nominal() -> Self {
        let mut channels = [None; MAX_CHANNELS];
        let mut i = 0;
        while i < ANALOG_INPUTS as usize && i < MAX_CHANNELS {
            channels[i] = Some(ChannelCalibration::nominal());
            i += 1;
        }
        Self { channels }
    }

    /// Replace one input's calibration with a measured trim.
    pub fn with_trim(mut self, channel: ChannelIndex, calibration: ChannelCalibration) -> Self {
        if channel.get() < ANALOG_INPUTS {
            if let Some(slot) = self.channels.get_mut(usize::from(channel.get())) {
                *slot = Some(calibration);
            }
        }
        self
    }
}

impl Default for BoardCalibration {
    fn default() -> Self {
        Self::nominal()
    }
}

impl CalibrationTable for BoardCalibration {
    fn channel(&self, channel: ChannelIndex) -> Option<ChannelCalibration> {
        self.channels.get(usize::from(channel.get())).copied().flatten()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests unwrap known-valid channel indices
mod tests {
    use super::*;

    fn ch(index: u8) -> ChannelIndex {
        ChannelIndex::new(index).unwrap()
    }

    #[test]
    fn adc_inputs_are_nominal() {
        let table = BoardCalibration::default();
        assert_eq!(table.channel(ch(0)), Some(ChannelCalibration::nominal()));
        assert_eq!(table.channel(ch(3)), Some(ChannelCalibration::nominal()));
        assert_eq!(table.channel(ch(4)), None);
    }

    #[test]
    fn trim_replaces_one_input() {
        let trim = ChannelCalibration {
            scale_microvolts: 812,
            offset_microvolts: -2_000,
        };
        let table = BoardCalibration::nominal().with_trim(ch(2), trim);
        assert_eq!(table.channel(ch(2)), Some(trim));
        assert_eq!(table.channel(ch(1)), Some(ChannelCalibration::nominal()));
    }

    #[test]
    fn trim_past_the_adc_is_ignored() {
        let trim = ChannelCalibration {
            scale_microvolts: 1,
            offset_microvolts: 0,
        };
        let table = BoardCalibration::nominal().with_trim(ch(6), trim);
        assert_eq!(table.channel(ch(6)), None);
    }
}
