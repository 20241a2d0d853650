//! Device identity and hardware constants
//!
//! This module defines central configuration values used across the capture
//! stack. Wire strings, clock rates and channel limits should reference these
//! constants rather than hardcoding values.

/// The application name
pub const APP_NAME: &str = "Breadboard LA";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reply to the `i` (identify) command.
pub const DEVICE_ID: &str = "BBLA1";

/// Reply to the bare `a` command: unsigned 12-bit codes, two 7-bit framed
/// groups, little-endian group order.
pub const ANALOG_FORMAT_DESCRIPTOR: &str = "u12,f7x2,le";

/// Maximum number of digital lines or ADC channels addressable by a mask.
pub const MAX_CHANNELS: usize = 8;

/// Highest valid channel index.
pub const MAX_CHANNEL_INDEX: u32 = 7;

/// System clock feeding the PIO sequencer (RP2040 default PLL_SYS).
pub const SYS_CLOCK_HZ: u32 = 125_000_000;

/// ADC reference clock (RP2040 `clk_adc` from PLL_USB).
pub const ADC_CLOCK_HZ: u32 = 48_000_000;

/// Empirical ceiling for total ADC throughput across all enabled channels.
///
/// The RP2040 ADC converts at up to 500 kS/s, but DMA contention with the
/// digital sampler makes anything above ~200 kS/s lose conversions.
pub const ADC_MAX_THROUGHPUT_SPS: u32 = 200_000;

/// First GPIO of the 8 sampled digital lines.
pub const DIGITAL_PIN_BASE: u8 = 0;

/// Number of ADC inputs wired to the breadboard (ADC0..ADC3).
pub const ANALOG_INPUTS: u8 = 4;

/// Full-scale ADC input in microvolts (3.3 V reference).
pub const ADC_FULL_SCALE_MICROVOLTS: i32 = 3_300_000;

/// Development banner logged at boot.
pub const fn dev_banner() -> &'static str {
    "Breadboard LA - capture engine"
}
