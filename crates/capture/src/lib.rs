//! Mixed-signal capture engine
//!
//! Samples up to 8 digital lines and the enabled ADC channels through
//! autonomous hardware (sequencer + ADC feeding self-chaining DMA ping-pong
//! buffers), re-encodes each half as it completes into the 7-bit framed wire
//! format, and streams it to the host under flow control.
//!
//! # Layers
//!
//! ```text
//! engine      command FSM: Idle → Armed → Running → DataReady → Idle
//!   ├─ protocol     ASCII command parsing and replies
//!   ├─ planner      half-buffer sizing and decimation
//!   └─ coordinator  one capture cycle: claim, prime, poll, hand off, tear down
//!        ├─ trigger   edge/level/variable detection gating the sample count
//!        └─ encoder   framing + backpressured transmit
//! ```
//!
//! Everything above `platform`'s traits is hardware-independent, so the full
//! engine runs on the host against `platform::mocks`.
//!
//! # Features
//!
//! - `defmt`: log through defmt (hardware builds)
//! - `tracing`: log through tracing (emulator)
//! - `std`: enable `platform/std` for host tooling

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
#![deny(unsafe_code)] // arena views go through bytemuck
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

#[macro_use]
mod log;

pub mod arena;
pub mod config;
pub mod coordinator;
pub mod decoder;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod planner;
pub mod protocol;
pub mod recovery;
pub mod session;
pub mod trigger;

pub use arena::{CaptureBuffers, HalfPair, SampleArena};
pub use config::{EngineConfig, PlannerConfig};
pub use coordinator::RunOutcome;
pub use decoder::{DecodeError, DecodedSample, DecoderEvent, StreamDecoder};
pub use encoder::{frame_word, unframe_word, Encoder};
pub use engine::CaptureEngine;
pub use error::{CaptureError, CommandError, HardwareFault, PlanError};
pub use planner::{decimation_factor, plan, BufferLayout, PlanRequest};
pub use protocol::{Command, CommandReader};
pub use recovery::DmaRecoveryState;
pub use session::{CaptureSession, CaptureState};
pub use trigger::{TriggerConfig, TriggerDetector, TriggerKind, TriggerState};
