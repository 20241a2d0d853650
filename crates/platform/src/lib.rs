//! Hardware Abstraction Layer (HAL) for the breadboard logic analyzer
//!
//! This crate provides trait-based abstractions for every hardware engine the
//! capture subsystem drives, enabling development and testing without
//! physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate)
//!         ↓
//! Capture engine (capture crate: planner, coordinator, encoder, protocol)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (embassy-rp + PAC register access)
//! ```
//!
//! # Abstraction Levels
//!
//! ## Acquisition engines
//! - [`DigitalSampler`] - programmable I/O sequencer sampling 8 lines
//! - [`AnalogSampler`] - round-robin ADC
//! - [`DmaPingPong`] - two self-chaining DMA channels filling alternating halves
//!
//! ## Collaborators outside the capture core
//! - [`SerialTransport`] - byte-oriented host link (commands and data share it)
//! - [`CalibrationTable`] - per-channel analog scale/offset
//! - [`CaptureActivity`] - "pause other core activity" signal
//! - [`StateProbe`] - named device-state values for internal-variable triggers
//!
//! [`Board`] ties one concrete type to each role.
//!
//! # Features
//!
//! - `std`: Enable the [`mocks`] module for host-side tests of other crates
//! - `hardware`: Physical hardware target marker
//! - `defmt`: Enable defmt::Format derives
//!
//! # Example
//!
//! ```no_run
//! use platform::{DmaPingPong, HalfIndex};
//!
//! fn half_ready<D: DmaPingPong<u8>>(dma: &mut D, memory: &mut [u8]) -> bool {
//!     dma.poll_filled(HalfIndex::A, memory)
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors; callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod activity;
pub mod board;
pub mod calibration;
pub mod config;
pub mod dma;
pub mod memory;
pub mod probe;
pub mod sampler;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export main high-level traits
pub use activity::{ActivityGuard, CaptureActivity};
pub use board::{Board, BoardParts};
pub use calibration::{CalibrationTable, ChannelCalibration};
pub use dma::{DmaPingPong, HalfIndex};
pub use probe::{NoState, StateProbe};
pub use sampler::{
    AdcClockDivisor, AnalogSampler, ClockDivider, DigitalSampler, SequencerProgram,
    SequencerTiming,
};
pub use transport::SerialTransport;

// Re-export validated newtypes
pub use types::{AdcCode, ChannelIndex, ChannelMask, Edge, OutOfRangeError, SampleRateHz};
