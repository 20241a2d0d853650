//! Self-chaining DMA ping-pong over raw channel registers.
//!
//! embassy-rp's `Transfer` owns one channel for one transfer; the capture
//! needs two channels that re-trigger each other indefinitely, so the
//! channels are programmed directly. Completion is read from the raw
//! interrupt register (`INTR`), which latches regardless of the interrupt
//! enables, so no IRQ handler is involved.

use core::marker::PhantomData;
use core::sync::atomic::{compiler_fence, Ordering};

use embassy_rp::pac;
use embassy_rp::pac::dma::regs::{ChanAbort, CtrlTrig, Intr};
use embassy_rp::pac::dma::vals::{DataSize, TreqSel};
use platform::{DmaPingPong, HalfIndex};

use super::RpError;
use crate::claims::CLAIMS;
use crate::dma::{CaptureDmaPlan, DmaRoute};

/// Polls of `CHAN_ABORT` before giving up on an abort completing.
const ABORT_SPIN_LIMIT: u32 = 10_000;

/// Word type moved by a ping-pong.
pub trait DmaWord: Copy {
    /// `DATA_SIZE` field value.
    const SIZE: DataSize;
}

impl DmaWord for u8 {
    const SIZE: DataSize = DataSize::SIZE_BYTE;
}

impl DmaWord for u16 {
    const SIZE: DataSize = DataSize::SIZE_HALFWORD;
}

/// Two chained channels filling alternating halves from one peripheral FIFO.
pub struct RpPingPong<W> {
    route: DmaRoute,
    source: u32,
    claimed: bool,
    filled: [bool; 2],
    _word: PhantomData<W>,
}

impl RpPingPong<u8> {
    /// Digital ping-pong reading PIO1 SM0's RX FIFO.
    #[allow(clippy::cast_possible_truncation)] // 32-bit address space
    pub fn digital() -> Self {
        Self::new(
            CaptureDmaPlan::RP2040.digital,
            pac::PIO1.rxf(0).as_ptr() as u32,
        )
    }
}

impl RpPingPong<u16> {
    /// Analog ping-pong reading the ADC FIFO.
    #[allow(clippy::cast_possible_truncation)] // 32-bit address space
    pub fn analog() -> Self {
        Self::new(CaptureDmaPlan::RP2040.analog, pac::ADC.fifo().as_ptr() as u32)
    }
}

fn slot(half: HalfIndex) -> usize {
    match half {
        HalfIndex::A => 0,
        HalfIndex::B => 1,
    }
}

fn abort_channels(mask: u32) {
    pac::DMA.chan_abort().write_value(ChanAbort(mask));
    let mut spins = 0u32;
    while pac::DMA.chan_abort().read().0 & mask != 0 && spins < ABORT_SPIN_LIMIT {
        spins = spins.saturating_add(1);
        cortex_m::asm::nop();
    }
    if spins >= ABORT_SPIN_LIMIT {
        defmt::error!("dma: abort of {=u32:#x} did not settle", mask);
    }
    pac::DMA.intr().write_value(Intr(mask));
}

impl<W: DmaWord> RpPingPong<W> {
    fn new(route: DmaRoute, source: u32) -> Self {
        Self {
            route,
            source,
            claimed: false,
            filled: [false; 2],
            _word: PhantomData,
        }
    }

    /// Program `half`'s channel to fill `memory`; `trigger` starts it now,
    /// otherwise it waits for its sibling's chain trigger.
    #[allow(clippy::cast_possible_truncation)] // 32-bit address space; len checked by caller
    fn program(&self, half: HalfIndex, memory: &mut [W], trigger: bool) {
        let ch = pac::DMA.ch(usize::from(self.route.channel(half)));
        ch.read_addr().write_value(self.source);
        ch.write_addr().write_value(memory.as_mut_ptr() as u32);
        ch.trans_count().write_value(memory.len() as u32);

        let mut ctrl = CtrlTrig(0);
        ctrl.set_en(true);
        ctrl.set_data_size(W::SIZE);
        ctrl.set_incr_read(false);
        ctrl.set_incr_write(true);
        ctrl.set_treq_sel(TreqSel(self.route.dreq));
        ctrl.set_chain_to(self.route.chain_to(half));
        ctrl.set_irq_quiet(false);

        // Buffer contents must not be reordered past the channel start.
        compiler_fence(Ordering::SeqCst);
        if trigger {
            ch.ctrl_trig().write_value(ctrl);
        } else {
            ch.al1_ctrl().write_value(ctrl.0);
        }
    }
}

impl<W: DmaWord> DmaPingPong<W> for RpPingPong<W> {
    type Error = RpError;

    fn claim(&mut self) -> Result<(), Self::Error> {
        if !self.claimed {
            CLAIMS.claim_all(&self.route.resources())?;
            self.claimed = true;
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.claimed {
            self.abort();
            CLAIMS.release_all(&self.route.resources());
            self.claimed = false;
        }
    }

    fn prime(&mut self, first: &mut [W], second: &mut [W]) -> Result<(), Self::Error> {
        if !self.claimed {
            return Err(RpError::NotClaimed);
        }
        if first.is_empty() || second.is_empty() {
            return Err(RpError::EmptyHalf);
        }
        abort_channels(self.route.irq_mask());
        self.filled = [false; 2];
        // B first: it must be armed before A can chain to it.
        self.program(HalfIndex::B, second, false);
        self.program(HalfIndex::A, first, true);
        Ok(())
    }

    fn poll_filled(&mut self, half: HalfIndex, _memory: &mut [W]) -> bool {
        let idx = slot(half);
        if self.filled.get(idx).copied().unwrap_or(false) {
            return true;
        }
        let bit = self.route.irq_bit(half);
        if pac::DMA.intr().read().0 & bit == 0 {
            return false;
        }
        pac::DMA.intr().write_value(Intr(bit));
        compiler_fence(Ordering::SeqCst);
        if let Some(flag) = self.filled.get_mut(idx) {
            *flag = true;
        }
        true
    }

    fn peek_filled(&self, half: HalfIndex) -> bool {
        self.filled.get(slot(half)).copied().unwrap_or(false)
            || pac::DMA.intr().read().0 & self.route.irq_bit(half) != 0
    }

    #[allow(clippy::cast_possible_truncation)] // 32-bit address space
    fn rewind(&mut self, half: HalfIndex, memory: &mut [W]) {
        // Non-triggering aliases: the channel restarts on its sibling's chain.
        let ch = pac::DMA.ch(usize::from(self.route.channel(half)));
        ch.write_addr().write_value(memory.as_mut_ptr() as u32);
        ch.trans_count().write_value(memory.len() as u32);
        if let Some(flag) = self.filled.get_mut(slot(half)) {
            *flag = false;
        }
    }

    fn abort(&mut self) {
        abort_channels(self.route.irq_mask());
        self.filled = [false; 2];
    }

    fn force_idle(&mut self, half: HalfIndex) {
        let ch = pac::DMA.ch(usize::from(self.route.channel(half)));
        abort_channels(self.route.irq_bit(half));
        // EN is bit 0 of CTRL.
        let ctrl = ch.al1_ctrl().read() & !1;
        ch.al1_ctrl().write_value(ctrl);
        defmt::warn!("dma: forced channel {} idle", self.route.channel(half));
    }
}
