//! Cortex-M exception handlers for the breadboard controller firmware.
//!
//! - **HardFault**: raised on the RP2040's Cortex-M0+ for bus errors,
//!   unaligned access and undefined instructions. M0+ has no separate
//!   MemManage/BusFault/UsageFault vectors, so everything lands here.
//!
//! # Hardware-only handler
//!
//! The `#[cortex_m_rt::exception]` attribute requires ARM target intrinsics and
//! is therefore gated behind `#[cfg(feature = "hardware")]`. The module itself
//! (and `HARDFAULT_DEFINED`) compiles unconditionally so host tests can verify
//! the module exists without needing an ARM toolchain.

#![allow(clippy::doc_markdown)]

/// Marker constant: the HardFault handler below is linked into hardware
/// builds.
pub const HARDFAULT_DEFINED: bool = true;

/// HardFault exception handler (hardware target only).
///
/// Stops both capture engines first so a fault mid-capture does not leave
/// the sequencer and ADC pumping into DMA, then reports the stacked frame
/// via defmt/RTT and halts.
///
/// # Safety
///
/// This function must never return: returning from a HardFault handler is
/// undefined behavior on Cortex-M. The `-> !` return type enforces this.
#[cfg(feature = "hardware")]
#[cortex_m_rt::exception]
#[allow(unsafe_code)]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    crate::rp::emergency_stop();
    defmt::panic!(
        "HardFault at pc=0x{:08X} lr=0x{:08X}",
        ef.pc(),
        ef.lr()
    );
}
