//! Hardware boot sequence for the breadboard controller.
//!
//! Initialization order (MUST be respected; order matters for correctness):
//!   1. Clocks: 12 MHz crystal → PLL_SYS 125 MHz, PLL_USB 48 MHz
//!   2. USB CDC device and its RX/TX pipes on core 0
//!   3. Routing/LED duties on core 0 (they yield while a capture runs)
//!   4. Capture engine on core 1, after the pipes exist
//!
//! Everything in this module except [`hardware`] is plain data so the clock
//! arithmetic can be checked on the host.

use platform::config::{ADC_CLOCK_HZ, SYS_CLOCK_HZ};
use platform::memory::TX_BUFFER_BYTES;

/// Ordered list of boot sequence steps for documentation and testing.
///
/// # Correctness Invariants
///
/// - Clocks must be final before the PIO divider is computed: the sequencer
///   timing assumes [`SYS_CLOCK_HZ`].
/// - The pipes are statics, but the USB tasks that drain them must be
///   spawned before core 1 starts writing, or the first reply is lost to a
///   full TX pipe.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. Clocks: XOSC 12 MHz, PLL_SYS 125 MHz (sequencer), PLL_USB 48 MHz (USB + ADC)",
    "2. USB: CDC-ACM device, RX/TX pipe tasks on core 0",
    "3. Core 0 duties: routing and LED tasks (yield while capture runs)",
    "4. Core 1: capture engine polling the RX pipe",
];

/// Crystal frequency on the board.
pub const XOSC_HZ: u32 = 12_000_000;

/// PLL settings `(refdiv, fbdiv, postdiv1, postdiv2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PllSettings {
    /// Reference divider.
    pub refdiv: u8,
    /// Feedback divider (VCO multiplier).
    pub fbdiv: u16,
    /// First post divider.
    pub post_div1: u8,
    /// Second post divider.
    pub post_div2: u8,
}

impl PllSettings {
    /// Output frequency for a `xosc_hz` reference.
    #[allow(clippy::arithmetic_side_effects)] // Safety: u64 math; dividers are non-zero constants
    pub const fn output_hz(self, xosc_hz: u32) -> u64 {
        let vco = xosc_hz as u64 / self.refdiv as u64 * self.fbdiv as u64;
        vco / (self.post_div1 as u64 * self.post_div2 as u64)
    }
}

/// System PLL: 1500 MHz VCO / 6 / 2 = 125 MHz.
pub const PLL_SYS: PllSettings = PllSettings {
    refdiv: 1,
    fbdiv: 125,
    post_div1: 6,
    post_div2: 2,
};

/// USB PLL: 1440 MHz VCO / 6 / 5 = 48 MHz; also clocks the ADC.
pub const PLL_USB: PllSettings = PllSettings {
    refdiv: 1,
    fbdiv: 120,
    post_div1: 6,
    post_div2: 5,
};

/// Stack reserved for core 1 (capture engine, command reader, encoder).
pub const CORE1_STACK_BYTES: usize = 8 * 1024;

/// Host → device pipe size. Commands are short; only the abort byte matters
/// while a capture runs.
pub const RX_PIPE_BYTES: usize = 64;

/// Device → host pipe size. Four encoder flushes deep.
#[allow(clippy::arithmetic_side_effects)] // Safety: constant
pub const TX_PIPE_BYTES: usize = TX_BUFFER_BYTES * 4;

/// Full-speed bulk packet size.
pub const USB_PACKET_BYTES: u16 = 64;

/// USB vendor id (pid.codes open-source vendor).
pub const USB_VID: u16 = 0x1209;

/// USB product id.
pub const USB_PID: u16 = 0xB1A1;

/// USB manufacturer string.
pub const USB_MANUFACTURER: &str = "Breadboard LA";

/// USB product string.
pub const USB_PRODUCT: &str = "Breadboard LA logic analyzer";

/// Idle delay between command polls on core 1 when no byte is pending.
pub const IDLE_POLL_US: u64 = 100;

// ── Hardware-only init ────────────────────────────────────────────────────────
//
// Host tests (cargo test -p firmware) never compile or link this module.
#[cfg(feature = "hardware")]
pub mod hardware {
    //! embassy-rp configuration built from the constants above.

    use embassy_rp::clocks::ClockConfig;

    /// Build the `embassy_rp::config::Config` for the board crystal.
    ///
    /// `ClockConfig::crystal` programs exactly [`super::PLL_SYS`] and
    /// [`super::PLL_USB`] for a 12 MHz crystal; the host tests pin those
    /// values so a board respin cannot drift from the sequencer math.
    pub fn build_embassy_config() -> embassy_rp::config::Config {
        embassy_rp::config::Config::new(ClockConfig::crystal(super::XOSC_HZ))
    }
}

/// `true` when the PLL settings produce the clocks the capture math assumes.
pub fn clocks_match_capture_config() -> bool {
    PLL_SYS.output_hz(XOSC_HZ) == u64::from(SYS_CLOCK_HZ)
        && PLL_USB.output_hz(XOSC_HZ) == u64::from(ADC_CLOCK_HZ)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn sys_pll_gives_sequencer_clock() {
        assert_eq!(PLL_SYS.output_hz(XOSC_HZ), 125_000_000);
    }

    #[test]
    fn usb_pll_gives_adc_clock() {
        assert_eq!(PLL_USB.output_hz(XOSC_HZ), 48_000_000);
        assert!(clocks_match_capture_config());
    }

    #[test]
    fn vco_within_limits() {
        // RP2040 datasheet: VCO 750..=1600 MHz
        for pll in [PLL_SYS, PLL_USB] {
            let vco = u64::from(XOSC_HZ) / u64::from(pll.refdiv) * u64::from(pll.fbdiv);
            assert!((750_000_000..=1_600_000_000).contains(&vco), "{pll:?}");
        }
    }

    #[test]
    fn tx_pipe_holds_a_full_flush() {
        assert!(TX_PIPE_BYTES >= TX_BUFFER_BYTES);
        assert_eq!(TX_PIPE_BYTES % usize::from(USB_PACKET_BYTES), 0);
    }

    #[test]
    fn usb_comes_up_before_capture_core() {
        let steps = BOOT_SEQUENCE_STEPS;
        let usb = steps
            .iter()
            .position(|s| s.contains("USB:"))
            .expect("USB step required");
        let core1 = steps
            .iter()
            .position(|s| s.contains("Core 1"))
            .expect("core 1 step required");
        assert!(usb < core1, "USB pipes must be serviced before capture starts");
    }
}
