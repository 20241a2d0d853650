//! Capture memory budget for the RP2040.
//!
//! ## SRAM map
//!
//! | Region      | Base Address | Size   | DMA | Use case |
//! |-------------|-------------|--------|-----|----------|
//! | SRAM0-3     | 0x2000_0000 | 256 KB | YES | Striped: stacks, statics, capture arena |
//! | SRAM4       | 0x2004_0000 | 4 KB   | YES | Core 0 stack |
//! | SRAM5       | 0x2004_1000 | 4 KB   | YES | Core 1 stack |
//! | USB DPRAM   | 0x5010_0000 | 4 KB   | NO* | USB endpoint buffers only |
//!
//! \* The USB controller owns DPRAM; DMA must not target it.
//!
//! All striped SRAM is reachable by every DMA channel, so unlike larger parts
//! there is no placement constraint beyond alignment: the capture arena is a
//! single word-aligned static carved into halves at arm time.
//!
//! ## Usage
//! ```rust
//! use platform::memory::CAPTURE_ARENA_WORDS;
//!
//! static mut ARENA: [u32; CAPTURE_ARENA_WORDS] = [0; CAPTURE_ARENA_WORDS];
//! ```

/// Base address of striped SRAM.
pub const SRAM_BASE: u32 = 0x2000_0000;

/// Size of striped SRAM in bytes (256 KB).
pub const SRAM_SIZE_BYTES: usize = 256 * 1024;

/// Bytes reserved for the capture arena.
///
/// Leaves room for the routing/LED subsystems, USB stack and task stacks.
pub const CAPTURE_ARENA_BYTES: usize = 128 * 1024;

/// Capture arena length in 32-bit words (the arena is word-aligned).
pub const CAPTURE_ARENA_WORDS: usize = CAPTURE_ARENA_BYTES / 4;

/// Size of the encoder's transmit staging buffer.
///
/// Matches four full-speed USB CDC packets so one flush fills the endpoint
/// queue.
pub const TX_BUFFER_BYTES: usize = 256;

/// Number of DMA channels on the RP2040.
pub const DMA_CHANNEL_COUNT: u8 = 12;

/// DMA channels reserved for the capture engine: digital A/B, analog A/B.
///
/// The crossbar routing subsystem uses the low channels between captures; the
/// engine claims these around each arm cycle.
pub const CAPTURE_DMA_CHANNELS: [u8; 4] = [8, 9, 10, 11];
