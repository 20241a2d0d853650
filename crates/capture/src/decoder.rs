//! Host-side stream decoder.
//!
//! Reassembles samples from the framed byte stream, holding the last analog
//! group across decimated samples the way the host tool does, and stops at
//! the `$<n>+` completion marker. Used by the `xtask decode` command and by
//! the engine's own tests.

use heapless::Vec;

use crate::encoder::unframe_word;

/// One reassembled time-sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSample {
    /// Post-trigger sample index.
    pub index: u32,
    /// Digital lines.
    pub digital: u8,
    /// Analog codes in ascending channel order (held on decimated samples).
    pub analog: Vec<u16, 8>,
    /// `true` if `analog` was transmitted with this sample.
    pub fresh: bool,
}

/// Decoder output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    /// A complete sample.
    Sample(DecodedSample),
    /// Completion marker; carries the byte count it announced.
    End {
        /// Data bytes announced by the device.
        announced: u32,
        /// Data bytes actually received.
        received: u32,
    },
}

/// Malformed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// An ASCII byte arrived mid-sample.
    #[error("unframed byte 0x{0:02x} inside a sample")]
    Unframed(u8),
    /// Marker did not match `$<digits>+`.
    #[error("malformed completion marker")]
    BadMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Data,
    Marker(u32),
    Done,
}

/// Incremental decoder for one capture.
#[derive(Debug)]
pub struct StreamDecoder {
    analog_channels: usize,
    decimation: u32,
    index: u32,
    received: u32,
    pending: Vec<u8, 18>,
    held: Vec<u16, 8>,
    phase: Phase,
}

impl StreamDecoder {
    /// Decoder for a capture with `analog_channels` enabled and decimation `k`.
    pub fn new(analog_channels: usize, decimation: u32) -> Self {
        let analog_channels = analog_channels.min(8);
        let mut held = Vec::new();
        for _ in 0..analog_channels {
            // Capacity is 8 and analog_channels ≤ 8.
            let _ = held.push(0);
        }
        Self {
            analog_channels,
            decimation: decimation.max(1),
            index: 0,
            received: 0,
            pending: Vec::new(),
            held,
            phase: Phase::Data,
        }
    }

    /// `true` once the completion marker has been consumed.
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Feed one byte. Returns an event when a sample or the marker completes.
    #[allow(clippy::arithmetic_side_effects)] // Safety: marker digits checked; counters saturate
    pub fn push(&mut self, byte: u8) -> Result<Option<DecoderEvent>, DecodeError> {
        match self.phase {
            Phase::Done => Ok(None),
            Phase::Marker(value) => match byte {
                b'0'..=b'9' => {
                    let next = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(u32::from(byte - b'0')))
                        .ok_or(DecodeError::BadMarker)?;
                    self.phase = Phase::Marker(next);
                    Ok(None)
                }
                b'+' => {
                    self.phase = Phase::Done;
                    Ok(Some(DecoderEvent::End {
                        announced: value,
                        received: self.received,
                    }))
                }
                _ => Err(DecodeError::BadMarker),
            },
            Phase::Data if byte == b'$' => {
                if !self.pending.is_empty() {
                    return Err(DecodeError::Unframed(byte));
                }
                self.phase = Phase::Marker(0);
                Ok(None)
            }
            Phase::Data if byte & 0x80 == 0 => Err(DecodeError::Unframed(byte)),
            Phase::Data => {
                self.received = self.received.saturating_add(1);
                // Capacity covers the largest sample, which completes below.
                let _ = self.pending.push(byte);
                if self.pending.len() < self.expected_len() {
                    return Ok(None);
                }
                Ok(Some(DecoderEvent::Sample(self.take_sample())))
            }
        }
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: decimation ≥ 1
    fn expected_len(&self) -> usize {
        if self.index % self.decimation == 0 {
            2 + 2 * self.analog_channels
        } else {
            2
        }
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: index bounded by stream length
    #[allow(clippy::cast_possible_truncation)] // digital word has 8 payload bits
    fn take_sample(&mut self) -> DecodedSample {
        let mut words = self
            .pending
            .chunks_exact(2)
            .filter_map(|pair| unframe_word([*pair.first()?, *pair.get(1)?]));
        let digital = words.next().unwrap_or(0) as u8;
        let fresh = self.pending.len() > 2;
        if fresh {
            for (slot, code) in self.held.iter_mut().zip(words) {
                *slot = code;
            }
        }
        let sample = DecodedSample {
            index: self.index,
            digital,
            analog: self.held.clone(),
            fresh,
        };
        self.pending.clear();
        self.index += 1;
        sample
    }
}
