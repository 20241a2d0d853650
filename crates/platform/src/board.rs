//! Board composition: which concrete engine backs each capture role.
//!
//! A [`Board`] names the types; [`BoardParts`] owns the instances. The
//! firmware provides one board for the RP2040, the [`mocks`](crate::mocks)
//! module another for host tests and the emulator.

use embedded_hal::delay::DelayNs;

use crate::calibration::CalibrationTable;
use crate::dma::DmaPingPong;
use crate::probe::StateProbe;
use crate::sampler::{AnalogSampler, DigitalSampler};
use crate::transport::SerialTransport;

/// Type-level description of a capture-capable board.
pub trait Board {
    /// Sequencer sampling the digital lines.
    type Digital: DigitalSampler;
    /// Round-robin ADC.
    type Analog: AnalogSampler;
    /// Ping-pong moving sequencer bytes.
    type DigitalDma: DmaPingPong<u8>;
    /// Ping-pong moving ADC words.
    type AnalogDma: DmaPingPong<u16>;
    /// Host link.
    type Transport: SerialTransport;
    /// Blocking delay used for transmit backoff.
    type Delay: DelayNs;
    /// Analog calibration source.
    type Calibration: CalibrationTable;
    /// Device-state source for internal-variable triggers.
    type Probe: StateProbe;
}

/// Owned instances of every [`Board`] role.
pub struct BoardParts<B: Board> {
    /// Sequencer.
    pub digital: B::Digital,
    /// ADC.
    pub analog: B::Analog,
    /// Digital ping-pong.
    pub digital_dma: B::DigitalDma,
    /// Analog ping-pong.
    pub analog_dma: B::AnalogDma,
    /// Host link.
    pub transport: B::Transport,
    /// Delay provider.
    pub delay: B::Delay,
    /// Calibration table.
    pub calibration: B::Calibration,
    /// State probe.
    pub probe: B::Probe,
}
