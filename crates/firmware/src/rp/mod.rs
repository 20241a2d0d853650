//! RP2040 board backend.
//!
//! | Role        | Implementation | Hardware |
//! |-------------|----------------|----------|
//! | Digital     | [`PioSampler`] | PIO1 SM0, GPIO 0..=7 |
//! | Analog      | [`RpAdc`]      | ADC inputs 0..=3 (GPIO 26..=29), round-robin |
//! | Digital DMA | [`RpPingPong<u8>`]  | channels 8/9 paced by PIO1 RX0 |
//! | Analog DMA  | [`RpPingPong<u16>`] | channels 10/11 paced by the ADC FIFO |
//! | Transport   | [`PipeTransport`] | USB CDC via two embassy-sync pipes |
//!
//! Register access goes through `embassy_rp::pac` where embassy has no
//! driver for the mode we need (self-chaining DMA, ADC round-robin with
//! DREQ); everything else uses the embassy drivers.

mod adc;
mod ping_pong;
mod pio;
pub mod usb;

use embassy_rp::pac;
use platform::Board;
use thiserror_no_std::Error;

use crate::calibration::BoardCalibration;
use crate::claims::ClaimError;
use crate::state::DeviceStateProbe;

pub use adc::RpAdc;
pub use ping_pong::RpPingPong;
pub use pio::PioSampler;
pub use usb::PipeTransport;

/// Errors raised by the RP2040 engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, defmt::Format)]
pub enum RpError {
    /// A shared resource is held elsewhere.
    #[error("claim failed: {0}")]
    Claim(ClaimError),
    /// Operation needs a prior successful claim.
    #[error("resource not claimed")]
    NotClaimed,
    /// A half has no room for a single transfer.
    #[error("empty half")]
    EmptyHalf,
    /// The channel mask names an input the ADC does not have.
    #[error("no such ADC input")]
    NoAdcInput,
}

impl From<ClaimError> for RpError {
    fn from(err: ClaimError) -> Self {
        RpError::Claim(err)
    }
}

/// The breadboard controller.
pub struct RpBoard;

impl Board for RpBoard {
    type Digital = PioSampler;
    type Analog = RpAdc;
    type DigitalDma = RpPingPong<u8>;
    type AnalogDma = RpPingPong<u16>;
    type Transport = PipeTransport;
    type Delay = embassy_time::Delay;
    type Calibration = BoardCalibration;
    type Probe = DeviceStateProbe;
}

/// Halt both acquisition engines and every capture DMA channel.
///
/// Register-level and allocation-free so the HardFault handler can call it.
pub fn emergency_stop() {
    pac::PIO1.ctrl().modify(|w| w.set_sm_enable(0));
    pac::ADC.cs().modify(|w| w.set_start_many(false));
    let plan = crate::dma::CaptureDmaPlan::RP2040;
    pac::DMA
        .chan_abort()
        .write_value(plan.digital.irq_mask() | plan.analog.irq_mask());
}
