//! Breadboard LA firmware
//!
//! Logic-analyzer / mixed-signal capture firmware for the RP2040-based
//! programmable breadboard controller.
//!
//! # Architecture
//!
//! This firmware follows a layered architecture:
//!
//! ```text
//! Application Layer (main.rs: USB on core 0, capture engine on core 1)
//!         ↓
//! Capture engine (capture crate)
//!         ↓
//! Board backends (rp module on hardware, emulator module on desktop)
//!         ↓
//! Platform HAL (platform crate traits)
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for the RP2040 target (embassy-rp, PIO, USB CDC)
//! - `emulator` - Build the desktop emulator (host fakes, stdin/stdout link)
//! - `std` - Enable standard library (for emulator and testing)
//!
//! # Examples
//!
//! ## Hardware Target
//!
//! ```bash
//! cargo build --release --target thumbv6m-none-eabi --features hardware
//! ```
//!
//! ## Emulator Target
//!
//! ```bash
//! cargo run --example emulator --features emulator
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline
#![warn(clippy::print_stdout)] // the emulator's stdout carries the wire protocol
#![warn(clippy::dbg_macro)]
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod boot;
pub mod calibration;
pub mod claims;
pub mod dma;
pub mod exception_handlers;
pub mod state;

#[cfg(feature = "hardware")]
pub mod rp;

#[cfg(feature = "emulator")]
pub mod emulator;

pub use calibration::BoardCalibration;
pub use claims::{ClaimError, Resource, ResourceClaims, CLAIMS};
pub use dma::{CaptureDmaPlan, DmaRoute};
pub use state::{DeviceState, DeviceStateProbe, DEVICE_STATE};
