//! Mock implementations for testing
//!
//! This module provides fakes for every platform trait so the capture engine
//! can run end to end on the host. The DMA fake writes synthetic samples into
//! whichever half the engine lends it, so encoded output is deterministic.

#![cfg(any(test, feature = "std"))]
// Host-only fakes: counters and fixed-size tables are sized by the tests.
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::missing_panics_doc)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;

use crate::board::{Board, BoardParts};
use crate::calibration::{CalibrationTable, ChannelCalibration};
use crate::config::ANALOG_INPUTS;
use crate::dma::{DmaPingPong, HalfIndex};
use crate::probe::StateProbe;
use crate::sampler::{AdcClockDivisor, AnalogSampler, DigitalSampler, SequencerTiming};
use crate::transport::SerialTransport;
use crate::types::{ChannelIndex, ChannelMask, Edge};

/// Failure injected by a fake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    /// Resource already claimed elsewhere.
    Busy,
    /// Host link dropped.
    LinkDown,
}

// ── Digital sampler ──────────────────────────────────────────────────────────

/// Fake sequencer recording how it was driven.
#[derive(Debug, Default)]
pub struct FakeDigitalSampler {
    claimed: bool,
    running: bool,
    busy: bool,
    timing: Option<SequencerTiming>,
    lines: ChannelMask,
    pins: u8,
    hardware_watch: bool,
    watched: Option<(ChannelIndex, Edge)>,
    edge_after_polls: Option<u32>,
    claims: usize,
    releases: usize,
    starts: usize,
}

impl FakeDigitalSampler {
    /// Idle sampler without a hardware edge watcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `claim` fail as if the routing subsystem held the block.
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Offer a hardware edge watcher whose edge fires after `polls` calls to
    /// `edge_seen`.
    pub fn with_edge_watch(mut self, polls: u32) -> Self {
        self.hardware_watch = true;
        self.edge_after_polls = Some(polls);
        self
    }

    /// Set the levels returned by `pins`.
    pub fn set_pins(&mut self, pins: u8) {
        self.pins = pins;
    }

    /// `true` between `claim` and `release`.
    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    /// `true` between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Last timing passed to `configure`.
    pub fn timing(&self) -> Option<SequencerTiming> {
        self.timing
    }

    /// Last line mask passed to `configure`.
    pub fn lines(&self) -> ChannelMask {
        self.lines
    }

    /// Edge armed through `watch_edge`.
    pub fn watched(&self) -> Option<(ChannelIndex, Edge)> {
        self.watched
    }

    /// Number of successful claims.
    pub fn claims(&self) -> usize {
        self.claims
    }

    /// Number of releases (including redundant ones).
    pub fn releases(&self) -> usize {
        self.releases
    }

    /// Number of starts.
    pub fn starts(&self) -> usize {
        self.starts
    }
}

impl DigitalSampler for FakeDigitalSampler {
    type Error = MockError;

    fn claim(&mut self) -> Result<(), Self::Error> {
        if self.busy || self.claimed {
            return Err(MockError::Busy);
        }
        self.claimed = true;
        self.claims += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.claimed = false;
        self.running = false;
        self.watched = None;
        self.releases += 1;
    }

    fn configure(&mut self, timing: SequencerTiming, lines: ChannelMask) -> Result<(), Self::Error> {
        self.timing = Some(timing);
        self.lines = lines;
        Ok(())
    }

    fn start(&mut self) {
        self.running = true;
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn pins(&self) -> u8 {
        self.pins
    }

    fn watch_edge(&mut self, line: ChannelIndex, edge: Edge) -> bool {
        if self.hardware_watch {
            self.watched = Some((line, edge));
        }
        self.hardware_watch
    }

    fn edge_seen(&mut self) -> bool {
        if self.watched.is_none() {
            return false;
        }
        match self.edge_after_polls {
            Some(0) => true,
            Some(n) => {
                self.edge_after_polls = Some(n - 1);
                false
            }
            None => false,
        }
    }
}

// ── Analog sampler ───────────────────────────────────────────────────────────

/// Fake ADC recording its configuration.
#[derive(Debug, Default)]
pub struct FakeAnalogSampler {
    divisor: Option<AdcClockDivisor>,
    channels: ChannelMask,
    running: bool,
    stale_words: usize,
    drains: usize,
}

impl FakeAnalogSampler {
    /// Stopped ADC with an empty FIFO.
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave `words` stale conversions in the FIFO for the next drain.
    pub fn with_stale_words(mut self, words: usize) -> Self {
        self.stale_words = words;
        self
    }

    /// Last divisor passed to `configure`.
    pub fn divisor(&self) -> Option<AdcClockDivisor> {
        self.divisor
    }

    /// Last round-robin mask.
    pub fn channels(&self) -> ChannelMask {
        self.channels
    }

    /// `true` between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of FIFO drains.
    pub fn drains(&self) -> usize {
        self.drains
    }
}

impl AnalogSampler for FakeAnalogSampler {
    type Error = MockError;

    fn configure(&mut self, divisor: AdcClockDivisor, channels: ChannelMask) -> Result<(), Self::Error> {
        self.divisor = Some(divisor);
        self.channels = channels;
        Ok(())
    }

    fn drain_fifo(&mut self) -> usize {
        self.drains += 1;
        core::mem::take(&mut self.stale_words)
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

// ── DMA ping-pong ────────────────────────────────────────────────────────────

type Source<W> = Box<dyn FnMut(usize) -> W + Send>;

fn slot(half: HalfIndex) -> usize {
    match half {
        HalfIndex::A => 0,
        HalfIndex::B => 1,
    }
}

/// Fake chained DMA pair producing synthetic words.
///
/// Word `n` of the stream (counted across halves since `prime`) is
/// `source(n)`. A half completes on the first poll after it becomes active,
/// or after `latency` polls when configured.
pub struct FakeDmaPingPong<W: Copy> {
    source: Source<W>,
    claimed: bool,
    busy: bool,
    active: Option<HalfIndex>,
    armed: [bool; 2],
    filled: [bool; 2],
    next_word: usize,
    latency: u32,
    waited: u32,
    stall_after: Option<usize>,
    overrun_after: Option<usize>,
    completed: usize,
    rewinds: usize,
    aborts: usize,
    forced_idle: Vec<HalfIndex>,
}

impl<W: Copy> core::fmt::Debug for FakeDmaPingPong<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FakeDmaPingPong")
            .field("active", &self.active)
            .field("armed", &self.armed)
            .field("filled", &self.filled)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

impl<W: Copy> FakeDmaPingPong<W> {
    /// Pair fed by `source`.
    pub fn new(source: impl FnMut(usize) -> W + Send + 'static) -> Self {
        Self {
            source: Box::new(source),
            claimed: false,
            busy: false,
            active: None,
            armed: [false; 2],
            filled: [false; 2],
            next_word: 0,
            latency: 0,
            waited: 0,
            stall_after: None,
            overrun_after: None,
            completed: 0,
            rewinds: 0,
            aborts: 0,
            forced_idle: Vec::new(),
        }
    }

    /// Require `polls` unsuccessful polls before each half completes.
    pub fn with_latency(mut self, polls: u32) -> Self {
        self.latency = polls;
        self
    }

    /// Stop completing halves after `halves` completions.
    pub fn stall_after(mut self, halves: usize) -> Self {
        self.stall_after = Some(halves);
        self
    }

    /// After `halves` completions, report the filling half as already
    /// written whenever it is peeked, as if the reader fell a half behind.
    pub fn overrun_after(mut self, halves: usize) -> Self {
        self.overrun_after = Some(halves);
        self
    }

    /// Make `claim` fail.
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// `true` between `claim` and `release`.
    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    /// Halves completed since construction.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Number of `rewind` calls.
    pub fn rewinds(&self) -> usize {
        self.rewinds
    }

    /// Number of `abort` calls.
    pub fn aborts(&self) -> usize {
        self.aborts
    }

    /// Halves passed to `force_idle`, in call order.
    pub fn forced_idle(&self) -> &[HalfIndex] {
        &self.forced_idle
    }

    fn stalled(&self) -> bool {
        self.stall_after.is_some_and(|limit| self.completed >= limit)
    }
}

impl FakeDmaPingPong<u8> {
    /// Digital lines counting up: sample `n` is `n as u8`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn counter() -> Self {
        Self::new(|n| n as u8)
    }
}

impl FakeDmaPingPong<u16> {
    /// ADC words stepping through all 4096 codes.
    #[allow(clippy::cast_possible_truncation)]
    pub fn ramp() -> Self {
        Self::new(|n| (n % 4096) as u16)
    }
}

impl<W: Copy> DmaPingPong<W> for FakeDmaPingPong<W> {
    type Error = MockError;

    fn claim(&mut self) -> Result<(), Self::Error> {
        if self.busy || self.claimed {
            return Err(MockError::Busy);
        }
        self.claimed = true;
        Ok(())
    }

    fn release(&mut self) {
        self.claimed = false;
        self.active = None;
        self.armed = [false; 2];
    }

    fn prime(&mut self, _first: &mut [W], _second: &mut [W]) -> Result<(), Self::Error> {
        self.active = Some(HalfIndex::A);
        self.armed = [true; 2];
        self.filled = [false; 2];
        self.next_word = 0;
        self.waited = 0;
        Ok(())
    }

    fn poll_filled(&mut self, half: HalfIndex, memory: &mut [W]) -> bool {
        let i = slot(half);
        if self.filled[i] {
            return true;
        }
        if self.active != Some(half) || !self.armed[i] || self.stalled() {
            return false;
        }
        if self.waited < self.latency {
            self.waited += 1;
            return false;
        }
        for word in memory.iter_mut() {
            *word = (self.source)(self.next_word);
            self.next_word += 1;
        }
        self.waited = 0;
        self.filled[i] = true;
        self.armed[i] = false;
        self.completed += 1;
        self.active = Some(half.other());
        true
    }

    fn peek_filled(&self, half: HalfIndex) -> bool {
        let i = slot(half);
        if self.filled[i] {
            return true;
        }
        let lapped = self.overrun_after.is_some_and(|limit| self.completed >= limit);
        lapped && self.active == Some(half) && self.armed[i]
    }

    fn rewind(&mut self, half: HalfIndex, _memory: &mut [W]) {
        let i = slot(half);
        self.filled[i] = false;
        self.armed[i] = true;
        self.rewinds += 1;
    }

    fn abort(&mut self) {
        self.active = None;
        self.armed = [false; 2];
        self.filled = [false; 2];
        self.aborts += 1;
    }

    fn force_idle(&mut self, half: HalfIndex) {
        self.armed[slot(half)] = false;
        if self.active == Some(half) {
            self.active = None;
        }
        self.forced_idle.push(half);
    }
}

// ── Transport ────────────────────────────────────────────────────────────────

/// In-memory host link.
///
/// Bytes pushed with [`push_rx`](Self::push_rx) are read by the device;
/// bytes the device writes accumulate in [`tx`](Self::tx). Input can be
/// scheduled to appear once a given amount of output has been written,
/// which is how tests abort a capture mid-stream. Backpressure is modelled
/// by `write_space` reporting 0 for a number of polls.
#[derive(Debug, Default)]
pub struct MockTransport {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    scheduled: Vec<(usize, Vec<u8>)>,
    refusals: Cell<usize>,
    max_chunk: Option<usize>,
    link_down: bool,
    write_calls: usize,
}

impl MockTransport {
    /// Empty link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the device to read.
    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Queue `bytes` for reading once `tx_len` bytes have been written.
    pub fn push_rx_after(&mut self, tx_len: usize, bytes: &[u8]) {
        self.scheduled.push((tx_len, bytes.to_vec()));
    }

    /// Report no write space for the next `polls` calls to `write_space`.
    pub fn refuse_writes(&mut self, polls: usize) {
        self.refusals.set(polls);
    }

    /// Accept at most `bytes` per write call.
    pub fn limit_chunk(&mut self, bytes: usize) {
        self.max_chunk = Some(bytes);
    }

    /// Fail every read and write.
    pub fn set_link_down(&mut self, down: bool) {
        self.link_down = down;
    }

    /// Everything written so far.
    pub fn tx(&self) -> &[u8] {
        &self.tx
    }

    /// Drain and return everything written so far.
    pub fn take_tx(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }

    /// Written output as lossy UTF-8, for reply assertions.
    pub fn tx_string(&self) -> String {
        String::from_utf8_lossy(&self.tx).into_owned()
    }

    /// Number of write calls.
    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    /// Unread input.
    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }

    fn release_scheduled(&mut self) {
        let written = self.tx.len();
        let mut i = 0;
        while i < self.scheduled.len() {
            if self.scheduled[i].0 <= written {
                let (_, bytes) = self.scheduled.remove(i);
                self.rx.extend(bytes);
            } else {
                i += 1;
            }
        }
    }
}

impl SerialTransport for MockTransport {
    type Error = MockError;

    fn available(&self) -> usize {
        self.rx.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.link_down {
            return Err(MockError::LinkDown);
        }
        let mut n = 0;
        for slot in buf.iter_mut() {
            match self.rx.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn write_space(&self) -> usize {
        let refusals = self.refusals.get();
        if refusals > 0 {
            self.refusals.set(refusals - 1);
            0
        } else {
            self.max_chunk.unwrap_or(usize::MAX)
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.write_calls += 1;
        if self.link_down {
            return Err(MockError::LinkDown);
        }
        let n = self.max_chunk.map_or(data.len(), |max| data.len().min(max));
        self.tx.extend_from_slice(&data[..n]);
        self.release_scheduled();
        Ok(n)
    }
}

// ── Delay, calibration, state ────────────────────────────────────────────────

/// Delay that only records what it was asked to wait.
#[derive(Debug, Default)]
pub struct MockDelay {
    calls: usize,
    total_ns: u64,
}

impl MockDelay {
    /// Fresh recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of delay calls.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Sum of requested delays in nanoseconds.
    pub fn total_ns(&self) -> u64 {
        self.total_ns
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.calls += 1;
        self.total_ns += u64::from(ns);
    }
}

/// Calibration table with nominal entries for the wired ADC inputs.
#[derive(Debug, Clone)]
pub struct FixedCalibration {
    entries: [Option<ChannelCalibration>; 8],
}

impl FixedCalibration {
    /// Nominal calibration on `0..ANALOG_INPUTS`, nothing elsewhere.
    pub fn new() -> Self {
        let mut entries = [None; 8];
        for entry in entries.iter_mut().take(usize::from(ANALOG_INPUTS)) {
            *entry = Some(ChannelCalibration::nominal());
        }
        Self { entries }
    }

    /// Override one channel.
    pub fn set(&mut self, channel: ChannelIndex, calibration: Option<ChannelCalibration>) {
        self.entries[usize::from(channel.get())] = calibration;
    }
}

impl Default for FixedCalibration {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationTable for FixedCalibration {
    fn channel(&self, channel: ChannelIndex) -> Option<ChannelCalibration> {
        self.entries[usize::from(channel.get())]
    }
}

/// State probe replaying a script of values for a single variable id.
///
/// Each read consumes one value; the last one repeats.
#[derive(Debug, Default)]
pub struct MockStateProbe {
    id: u8,
    values: RefCell<VecDeque<i32>>,
    last: Cell<Option<i32>>,
}

impl MockStateProbe {
    /// Probe exposing variable `id` with successive `values`.
    pub fn scripted(id: u8, values: &[i32]) -> Self {
        Self {
            id,
            values: RefCell::new(values.iter().copied().collect()),
            last: Cell::new(None),
        }
    }
}

impl StateProbe for MockStateProbe {
    fn read(&self, id: u8) -> Option<i32> {
        if id != self.id {
            return None;
        }
        if let Some(value) = self.values.borrow_mut().pop_front() {
            self.last.set(Some(value));
        }
        self.last.get()
    }
}

// ── Host board ───────────────────────────────────────────────────────────────

/// Board built entirely from fakes.
#[derive(Debug)]
pub struct HostBoard;

impl Board for HostBoard {
    type Digital = FakeDigitalSampler;
    type Analog = FakeAnalogSampler;
    type DigitalDma = FakeDmaPingPong<u8>;
    type AnalogDma = FakeDmaPingPong<u16>;
    type Transport = MockTransport;
    type Delay = MockDelay;
    type Calibration = FixedCalibration;
    type Probe = MockStateProbe;
}

impl HostBoard {
    /// Fakes with default behavior: counting digital lines, ramping ADC,
    /// instant DMA and an unconstrained link.
    pub fn parts() -> BoardParts<HostBoard> {
        BoardParts {
            digital: FakeDigitalSampler::new(),
            analog: FakeAnalogSampler::new(),
            digital_dma: FakeDmaPingPong::counter(),
            analog_dma: FakeDmaPingPong::ramp(),
            transport: MockTransport::new(),
            delay: MockDelay::new(),
            calibration: FixedCalibration::new(),
            probe: MockStateProbe::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Fakes never fail unless told to
mod tests {
    use super::*;

    #[test]
    fn dma_fills_halves_in_order() {
        let mut dma = FakeDmaPingPong::counter();
        let mut a = [0u8; 4];
        let mut b = [0u8; 4];
        dma.claim().unwrap();
        dma.prime(&mut a, &mut b).unwrap();

        assert!(!dma.poll_filled(HalfIndex::B, &mut b));
        assert!(dma.poll_filled(HalfIndex::A, &mut a));
        assert_eq!(a, [0, 1, 2, 3]);

        dma.rewind(HalfIndex::A, &mut a);
        assert!(dma.poll_filled(HalfIndex::B, &mut b));
        assert_eq!(b, [4, 5, 6, 7]);
    }

    #[test]
    fn dma_stalls_after_limit() {
        let mut dma = FakeDmaPingPong::counter().stall_after(1);
        let mut a = [0u8; 2];
        let mut b = [0u8; 2];
        dma.prime(&mut a, &mut b).unwrap();
        assert!(dma.poll_filled(HalfIndex::A, &mut a));
        dma.rewind(HalfIndex::A, &mut a);
        assert!(!dma.poll_filled(HalfIndex::B, &mut b));
        dma.force_idle(HalfIndex::B);
        assert_eq!(dma.forced_idle(), &[HalfIndex::B]);
    }

    #[test]
    fn dma_overrun_shows_on_peek_only() {
        let mut dma = FakeDmaPingPong::counter().overrun_after(1);
        let mut a = [0u8; 2];
        let mut b = [0u8; 2];
        dma.prime(&mut a, &mut b).unwrap();
        assert!(!dma.peek_filled(HalfIndex::A));
        assert!(dma.poll_filled(HalfIndex::A, &mut a));
        dma.rewind(HalfIndex::A, &mut a);
        assert!(dma.peek_filled(HalfIndex::B));
        assert!(!dma.peek_filled(HalfIndex::A));
        assert_eq!(dma.completed(), 1);
    }

    #[test]
    fn dma_latency_delays_completion() {
        let mut dma = FakeDmaPingPong::ramp().with_latency(2);
        let mut a = [0u16; 2];
        let mut b = [0u16; 2];
        dma.prime(&mut a, &mut b).unwrap();
        assert!(!dma.poll_filled(HalfIndex::A, &mut a));
        assert!(!dma.poll_filled(HalfIndex::A, &mut a));
        assert!(dma.poll_filled(HalfIndex::A, &mut a));
    }

    #[test]
    fn transport_releases_scheduled_input() {
        let mut link = MockTransport::new();
        link.push_rx_after(3, b"+");
        assert_eq!(link.write(b"ab").unwrap(), 2);
        assert_eq!(link.available(), 0);
        assert_eq!(link.write(b"c").unwrap(), 1);
        assert_eq!(link.read_byte().unwrap(), Some(b'+'));
    }

    #[test]
    fn transport_backpressure() {
        let mut link = MockTransport::new();
        link.refuse_writes(1);
        link.limit_chunk(2);
        assert_eq!(link.write_space(), 0);
        assert_eq!(link.write_space(), 2);
        assert_eq!(link.write(b"abc").unwrap(), 2);
        assert_eq!(link.tx(), b"ab");
    }

    #[test]
    fn claims_are_exclusive() {
        let mut sampler = FakeDigitalSampler::new();
        sampler.claim().unwrap();
        assert_eq!(sampler.claim(), Err(MockError::Busy));
        sampler.release();
        sampler.release();
        assert!(sampler.claim().is_ok());
    }

    #[test]
    fn probe_replays_script() {
        let probe = MockStateProbe::scripted(3, &[1, 2]);
        assert_eq!(probe.read(4), None);
        assert_eq!(probe.read(3), Some(1));
        assert_eq!(probe.read(3), Some(2));
        assert_eq!(probe.read(3), Some(2));
    }

    #[test]
    fn calibration_covers_wired_inputs() {
        let cal = FixedCalibration::new();
        assert!(cal.channel(ChannelIndex::new(0).unwrap()).is_some());
        assert!(cal.channel(ChannelIndex::new(7).unwrap()).is_none());
    }
}
