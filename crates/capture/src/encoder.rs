//! Sample Encoder/Transmitter.
//!
//! Wire format per time-sample:
//!
//! ```text
//! digital:  1ddddddd 1000000d                 (bits 0-6, bit 7)
//! analog:   1ccccccc 100ccccc   per channel   (bits 0-6, bits 7-11)
//! ```
//!
//! Every data byte has bit 7 set, so data can never be confused with the
//! ASCII replies and the `$<n>+` completion marker. With decimation `k`,
//! analog bytes follow only samples whose index is a multiple of `k`.
//!
//! Bytes are staged in a fixed buffer and flushed when the next sample would
//! not fit and after every half. A flush never drops bytes: refused writes are
//! retried with exponential backoff, and a flush that gives up keeps its
//! pending bytes for the next attempt.

use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use heapless::{String, Vec};
use platform::memory::TX_BUFFER_BYTES;
use platform::SerialTransport;

use crate::config::EngineConfig;
use crate::error::CaptureError;

/// Frame a value of up to 14 bits as two 7-bit groups, low group first.
#[allow(clippy::cast_possible_truncation)] // both groups are masked to 7 bits
pub const fn frame_word(value: u16) -> [u8; 2] {
    [0x80 | (value & 0x7F) as u8, 0x80 | ((value >> 7) & 0x7F) as u8]
}

/// Reverse [`frame_word`]. `None` if either byte lacks the framing bit.
pub const fn unframe_word(bytes: [u8; 2]) -> Option<u16> {
    if bytes[0] & 0x80 == 0 || bytes[1] & 0x80 == 0 {
        return None;
    }
    Some((bytes[0] & 0x7F) as u16 | (((bytes[1] & 0x7F) as u16) << 7))
}

/// Largest encoded sample: digital word plus 8 analog channels.
const MAX_SAMPLE_BYTES: usize = 2 + 2 * 8;

/// Staging buffer plus framing state for one capture.
#[derive(Debug)]
pub struct Encoder {
    tx: Vec<u8, TX_BUFFER_BYTES>,
    decimation: u32,
    sample_index: u32,
    data_bytes: u32,
}

impl Encoder {
    /// Empty encoder.
    pub const fn new() -> Self {
        Self {
            tx: Vec::new(),
            decimation: 1,
            sample_index: 0,
            data_bytes: 0,
        }
    }

    /// Reset counters for a new capture with decimation `k`.
    pub fn begin(&mut self, decimation: u32) {
        self.tx.clear();
        self.decimation = decimation.max(1);
        self.sample_index = 0;
        self.data_bytes = 0;
    }

    /// Drop staged bytes (abort/reset).
    pub fn discard(&mut self) {
        self.tx.clear();
    }

    /// Data bytes encoded since [`begin`](Self::begin).
    pub fn data_bytes(&self) -> u32 {
        self.data_bytes
    }

    /// Samples encoded since [`begin`](Self::begin).
    pub fn samples(&self) -> u32 {
        self.sample_index
    }

    /// Bytes staged but not yet accepted by the transport.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    /// Encode one time-sample.
    ///
    /// `analog` is the latest round-robin group (ascending channel order); it
    /// is emitted only on samples whose index is a multiple of the decimation
    /// factor.
    #[allow(clippy::arithmetic_side_effects)] // Safety: decimation ≥ 1; counters bounded by u32 sample count
    #[allow(clippy::cast_possible_truncation)] // encoded sample ≤ MAX_SAMPLE_BYTES
    #[allow(clippy::indexing_slicing)] // Safety: needed ≤ MAX_SAMPLE_BYTES (channels capped at 8)
    pub fn push_sample<T: SerialTransport, D: DelayNs>(
        &mut self,
        digital: u8,
        analog: &[u16],
        transport: &mut T,
        delay: &mut D,
        config: &EngineConfig,
    ) -> Result<(), CaptureError> {
        let fresh = self.sample_index % self.decimation == 0;
        let channels = if fresh { analog.len().min(8) } else { 0 };
        let needed = 2 + 2 * channels;

        if self.room() < needed {
            self.flush(transport, delay, config)?;
            if self.room() < needed {
                warn!("transmit buffer still full after {} retries", config.flush_retry_limit);
                return Err(CaptureError::Transport);
            }
        }

        let mut frame = [0u8; MAX_SAMPLE_BYTES];
        let [lo, hi] = frame_word(u16::from(digital));
        frame[0] = lo;
        frame[1] = hi;
        for (slot, &code) in frame[2..needed].chunks_exact_mut(2).zip(analog) {
            slot.copy_from_slice(&frame_word(code & 0x0FFF));
        }
        self.stage(&frame[..needed])?;
        self.data_bytes = self.data_bytes.saturating_add(needed as u32);
        self.sample_index += 1;
        Ok(())
    }

    /// Push staged bytes to the transport.
    ///
    /// Returns `Ok(true)` when everything was accepted, `Ok(false)` when the
    /// retry ceiling was hit with bytes still pending.
    #[allow(clippy::arithmetic_side_effects)] // Safety: n ≤ len; attempts ≤ retry limit
    pub fn flush<T: SerialTransport, D: DelayNs>(
        &mut self,
        transport: &mut T,
        delay: &mut D,
        config: &EngineConfig,
    ) -> Result<bool, CaptureError> {
        let mut attempts = 0u32;
        let mut backoff_us = config.backoff_initial_us;
        while !self.tx.is_empty() {
            let space = transport.write_space().min(self.tx.len());
            let written = if space == 0 {
                0
            } else {
                let chunk = self.tx.get(..space).unwrap_or(&[]);
                transport
                    .write(chunk)
                    .map_err(|_| CaptureError::Transport)?
                    .min(space)
            };

            if written > 0 {
                let len = self.tx.len();
                self.tx.copy_within(written.., 0);
                self.tx.truncate(len - written);
                attempts = 0;
                backoff_us = config.backoff_initial_us;
                continue;
            }

            attempts += 1;
            if attempts >= config.flush_retry_limit {
                warn!("flush gave up with {} bytes pending", self.tx.len());
                return Ok(false);
            }
            delay.delay_us(backoff_us);
            backoff_us = backoff_us.saturating_mul(2).min(config.backoff_max_us);
        }
        Ok(true)
    }

    /// Flush the data, then send the `$<n>+` completion marker.
    ///
    /// Returns the data byte count carried in the marker.
    pub fn finish<T: SerialTransport, D: DelayNs>(
        &mut self,
        transport: &mut T,
        delay: &mut D,
        config: &EngineConfig,
    ) -> Result<u32, CaptureError> {
        if !self.flush(transport, delay, config)? {
            return Err(CaptureError::Transport);
        }
        let mut marker: String<16> = String::new();
        write!(marker, "${}+", self.data_bytes).map_err(|_| CaptureError::Transport)?;
        self.send(marker.as_bytes(), transport, delay, config)?;
        Ok(self.data_bytes)
    }

    /// Send a textual reply. Staged data, if any, goes out first.
    pub fn send<T: SerialTransport, D: DelayNs>(
        &mut self,
        text: &[u8],
        transport: &mut T,
        delay: &mut D,
        config: &EngineConfig,
    ) -> Result<(), CaptureError> {
        for chunk in text.chunks(TX_BUFFER_BYTES) {
            if self.room() < chunk.len() && !self.flush(transport, delay, config)? {
                return Err(CaptureError::Transport);
            }
            self.stage(chunk)?;
        }
        if self.flush(transport, delay, config)? {
            Ok(())
        } else {
            Err(CaptureError::Transport)
        }
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: len ≤ capacity
    fn room(&self) -> usize {
        self.tx.capacity() - self.tx.len()
    }

    fn stage(&mut self, bytes: &[u8]) -> Result<(), CaptureError> {
        self.tx
            .extend_from_slice(bytes)
            .map_err(|_| CaptureError::Transport)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests unwrap fake transports that never fail
#[allow(clippy::indexing_slicing)] // Tests index into known-length output
mod tests {
    use super::*;
    use platform::mocks::{MockDelay, MockTransport};

    #[test]
    fn frames_digital_word() {
        assert_eq!(frame_word(0xFF), [0xFF, 0x81]);
        assert_eq!(frame_word(0x00), [0x80, 0x80]);
        assert_eq!(frame_word(0x7F), [0xFF, 0x80]);
    }

    #[test]
    fn every_twelve_bit_code_round_trips() {
        for code in 0u16..4096 {
            let framed = frame_word(code);
            assert!(framed.iter().all(|b| b & 0x80 != 0));
            assert_eq!(framed[1] & 0x60, 0, "high group of {code} exceeds 5 bits");
            assert_eq!(unframe_word(framed), Some(code));
        }
    }

    #[test]
    fn unframe_rejects_ascii() {
        assert_eq!(unframe_word([b'$', 0x80]), None);
        assert_eq!(unframe_word([0x80, b'+']), None);
    }

    #[test]
    fn decimated_samples_skip_analog() {
        let config = EngineConfig::default();
        let mut link = MockTransport::new();
        let mut delay = MockDelay::new();
        let mut enc = Encoder::new();
        enc.begin(2);
        for i in 0..4u8 {
            enc.push_sample(i, &[0x123], &mut link, &mut delay, &config).unwrap();
        }
        enc.flush(&mut link, &mut delay, &config).unwrap();
        // 4 × 2 digital + 2 × 2 analog
        assert_eq!(enc.data_bytes(), 12);
        assert_eq!(&link.tx()[..4], &[0x80, 0x80, 0xA3, 0x82]);
        assert_eq!(&link.tx()[4..6], &[0x81, 0x80]);
    }

    #[test]
    fn marker_counts_data_only() {
        let config = EngineConfig::default();
        let mut link = MockTransport::new();
        let mut delay = MockDelay::new();
        let mut enc = Encoder::new();
        enc.begin(1);
        for _ in 0..3 {
            enc.push_sample(0, &[], &mut link, &mut delay, &config).unwrap();
        }
        assert_eq!(enc.finish(&mut link, &mut delay, &config).unwrap(), 6);
        assert!(link.tx().ends_with(b"$6+"));
    }

    #[test]
    fn refused_writes_back_off_without_dropping() {
        let config = EngineConfig::default();
        let mut link = MockTransport::new();
        link.refuse_writes(3);
        let mut delay = MockDelay::new();
        let mut enc = Encoder::new();
        enc.begin(1);
        enc.push_sample(0x55, &[], &mut link, &mut delay, &config).unwrap();
        assert!(enc.flush(&mut link, &mut delay, &config).unwrap());
        assert_eq!(link.tx(), &frame_word(0x55));
        assert_eq!(delay.calls(), 3);
        // 10 + 20 + 40 µs
        assert_eq!(delay.total_ns(), 70_000);
    }

    #[test]
    fn flush_gives_up_but_keeps_bytes() {
        let config = EngineConfig {
            flush_retry_limit: 4,
            ..EngineConfig::default()
        };
        let mut link = MockTransport::new();
        link.refuse_writes(10);
        let mut delay = MockDelay::new();
        let mut enc = Encoder::new();
        enc.begin(1);
        enc.push_sample(1, &[], &mut link, &mut delay, &config).unwrap();
        assert!(!enc.flush(&mut link, &mut delay, &config).unwrap());
        assert_eq!(enc.pending(), 2);
        // Remaining refusals: 10 - 4 = 6; the next flush with limit 4 still fails,
        // the one after succeeds.
        assert!(!enc.flush(&mut link, &mut delay, &config).unwrap());
        assert!(enc.flush(&mut link, &mut delay, &config).unwrap());
        assert_eq!(link.tx(), &frame_word(1));
    }

    #[test]
    fn short_writes_preserve_order() {
        let config = EngineConfig::default();
        let mut link = MockTransport::new();
        link.limit_chunk(3);
        let mut delay = MockDelay::new();
        let mut enc = Encoder::new();
        enc.begin(1);
        for i in 0..50u8 {
            enc.push_sample(i, &[u16::from(i) * 80], &mut link, &mut delay, &config)
                .unwrap();
        }
        enc.flush(&mut link, &mut delay, &config).unwrap();
        let out = link.tx();
        assert_eq!(out.len(), 200);
        for (i, sample) in out.chunks_exact(4).enumerate() {
            assert_eq!(unframe_word([sample[0], sample[1]]), Some(i as u16));
            assert_eq!(unframe_word([sample[2], sample[3]]), Some(i as u16 * 80));
        }
    }
}
