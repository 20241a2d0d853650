//! Desktop emulator board.
//!
//! Runs the real capture engine against the host fakes from
//! `platform::mocks`, with the wire protocol on stdin/stdout so a host tool
//! (or a terminal) can talk to it exactly as it would to the USB device.
//! Logs go to stderr through `tracing`.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use platform::mocks::{FakeAnalogSampler, FakeDigitalSampler, FakeDmaPingPong};
use platform::{Board, BoardParts, SerialTransport};
use tracing_subscriber::EnvFilter;

use crate::calibration::BoardCalibration;
use crate::state::DeviceStateProbe;

/// Outbound space advertised to the encoder. Stdout blocks rather than
/// refusing, so this only sizes the encoder's flushes.
const STDOUT_SPACE: usize = 4096;

/// Analog test signal period in samples.
const TRIANGLE_PERIOD: usize = 8190;

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG` (default
/// `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Triangle wave over the full 12-bit range.
#[allow(clippy::cast_possible_truncation)] // result < 4096
#[allow(clippy::arithmetic_side_effects)] // Safety: modulo keeps phase < period
pub fn triangle(n: usize) -> u16 {
    let half = TRIANGLE_PERIOD / 2;
    let phase = n % TRIANGLE_PERIOD;
    let rising = if phase < half { phase } else { TRIANGLE_PERIOD - phase };
    rising.min(4095) as u16
}

/// Host link over the process's stdin/stdout.
pub struct StdioTransport {
    rx: Arc<Mutex<VecDeque<u8>>>,
    closed: Arc<AtomicBool>,
}

impl StdioTransport {
    /// Start the stdin reader thread.
    pub fn spawn() -> Self {
        let rx = Arc::new(Mutex::new(VecDeque::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (queue, eof) = (Arc::clone(&rx), Arc::clone(&closed));
        thread::spawn(move || {
            let mut stdin = std::io::stdin();
            let mut chunk = [0u8; 64];
            loop {
                match stdin.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let Ok(mut pending) = queue.lock() else { break };
                        pending.extend(chunk.iter().take(n));
                    }
                }
            }
            eof.store(true, Ordering::Release);
            tracing::debug!("stdin closed");
        });
        Self { rx, closed }
    }

    /// `true` once stdin has reached end of file.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl SerialTransport for StdioTransport {
    type Error = ErrorKind;

    fn available(&self) -> usize {
        self.rx.lock().map(|q| q.len()).unwrap_or(0)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut pending = self.rx.lock().map_err(|_| ErrorKind::Other)?;
        let n = buf.len().min(pending.len());
        for (slot, byte) in buf.iter_mut().zip(pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_space(&self) -> usize {
        STDOUT_SPACE
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        let mut out = std::io::stdout().lock();
        out.write_all(data).map_err(|e| e.kind())?;
        out.flush().map_err(|e| e.kind())?;
        Ok(data.len())
    }
}

/// Delay backed by `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Fakes plus the stdio link.
pub struct EmulatorBoard;

impl Board for EmulatorBoard {
    type Digital = FakeDigitalSampler;
    type Analog = FakeAnalogSampler;
    type DigitalDma = FakeDmaPingPong<u8>;
    type AnalogDma = FakeDmaPingPong<u16>;
    type Transport = StdioTransport;
    type Delay = StdDelay;
    type Calibration = BoardCalibration;
    type Probe = DeviceStateProbe;
}

impl EmulatorBoard {
    /// Counting digital lines, triangle-wave ADC, instant DMA.
    pub fn parts(transport: StdioTransport) -> BoardParts<EmulatorBoard> {
        BoardParts {
            digital: FakeDigitalSampler::new(),
            analog: FakeAnalogSampler::new(),
            digital_dma: FakeDmaPingPong::counter(),
            analog_dma: FakeDmaPingPong::new(triangle),
            transport,
            delay: StdDelay,
            calibration: BoardCalibration::nominal(),
            probe: DeviceStateProbe::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_spans_the_adc_range() {
        assert_eq!(triangle(0), 0);
        assert_eq!(triangle(TRIANGLE_PERIOD / 2), 4095);
        assert_eq!(triangle(TRIANGLE_PERIOD), 0);
        assert!((0..TRIANGLE_PERIOD).all(|n| triangle(n) <= 4095));
    }

    #[test]
    fn triangle_is_symmetric() {
        for n in 1..100 {
            assert_eq!(triangle(n), triangle(TRIANGLE_PERIOD - n));
        }
    }
}
