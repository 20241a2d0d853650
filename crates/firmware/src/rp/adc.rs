//! Round-robin ADC feeding the analog ping-pong.
//!
//! The embassy ADC driver keeps the block powered and the input pins in
//! analog mode; free-running round-robin with DREQ pacing is programmed on
//! the registers directly.

use embassy_rp::adc::{self, Adc, Blocking, Channel};
use embassy_rp::gpio::Pull;
use embassy_rp::pac;
use embassy_rp::peripherals::{ADC, PIN_26, PIN_27, PIN_28, PIN_29};
use platform::config::ANALOG_INPUTS;
use platform::{AdcClockDivisor, AnalogSampler, ChannelMask};

use super::RpError;

/// FIFO depth plus slack; bounds every drain loop.
const FIFO_DRAIN_LIMIT: usize = 8;

/// Polls of `CS.READY` after stopping before giving up.
const READY_SPIN_LIMIT: u32 = 1_000;

/// ADC inputs 0..=3 converted round-robin.
pub struct RpAdc {
    _adc: Adc<'static, Blocking>,
    _inputs: [Channel<'static>; 4],
}

impl RpAdc {
    /// Power the ADC and put GPIO 26..=29 in analog mode.
    pub fn new(
        adc: ADC,
        a0: PIN_26,
        a1: PIN_27,
        a2: PIN_28,
        a3: PIN_29,
    ) -> Self {
        Self {
            _adc: Adc::new_blocking(adc, adc::Config::default()),
            _inputs: [
                Channel::new_pin(a0, Pull::None),
                Channel::new_pin(a1, Pull::None),
                Channel::new_pin(a2, Pull::None),
                Channel::new_pin(a3, Pull::None),
            ],
        }
    }
}

impl AnalogSampler for RpAdc {
    type Error = RpError;

    fn configure(&mut self, divisor: AdcClockDivisor, channels: ChannelMask) -> Result<(), Self::Error> {
        let first = channels.first().ok_or(RpError::NoAdcInput)?;
        if channels.iter().any(|ch| ch.get() >= ANALOG_INPUTS) {
            return Err(RpError::NoAdcInput);
        }
        let adc = pac::ADC;
        adc.cs().modify(|w| {
            w.set_start_many(false);
            w.set_rrobin(0);
        });
        adc.div().write(|w| {
            w.set_int(divisor.int);
            w.set_frac(divisor.frac);
        });
        // 12-bit results, one word per DREQ, error bit not merged into data.
        adc.fcs().write(|w| {
            w.set_en(true);
            w.set_dreq_en(true);
            w.set_thresh(1);
            w.set_shift(false);
            w.set_err(false);
        });
        adc.cs().modify(|w| {
            w.set_en(true);
            w.set_ainsel(first.get());
            w.set_rrobin(u16::from(channels.bits()));
        });
        defmt::debug!(
            "adc: div {}.{} mask {=u8:#x}",
            divisor.int,
            divisor.frac,
            channels.bits()
        );
        Ok(())
    }

    fn drain_fifo(&mut self) -> usize {
        let adc = pac::ADC;
        let mut dropped = 0usize;
        while !adc.fcs().read().empty() && dropped < FIFO_DRAIN_LIMIT {
            let _ = adc.fifo().read();
            dropped = dropped.saturating_add(1);
        }
        // Sticky over/underflow flags are write-one-to-clear.
        adc.fcs().modify(|w| {
            w.set_over(true);
            w.set_under(true);
        });
        dropped
    }

    fn start(&mut self) {
        pac::ADC.cs().modify(|w| w.set_start_many(true));
    }

    fn stop(&mut self) {
        let adc = pac::ADC;
        adc.cs().modify(|w| w.set_start_many(false));
        let mut spins = 0u32;
        while !adc.cs().read().ready() && spins < READY_SPIN_LIMIT {
            spins = spins.saturating_add(1);
            cortex_m::asm::nop();
        }
        adc.cs().modify(|w| w.set_rrobin(0));
        adc.fcs().modify(|w| w.set_dreq_en(false));
        self.drain_fifo();
    }
}
