//! Sample arena: the static pool carved into ping-pong halves at arm time.
//!
//! The pool is a word slice so every half starts 4-byte aligned, which the
//! DMA engine needs for 16-bit transfers. Carving borrows the arena mutably,
//! so halves cannot outlive the capture that carved them and a new plan can
//! never alias a previous one.

use crate::error::PlanError;
use crate::planner::BufferLayout;
use platform::HalfIndex;

/// Two halves of one signal type.
#[derive(Debug)]
pub struct HalfPair<'b, W> {
    a: &'b mut [W],
    b: &'b mut [W],
}

impl<'b, W> HalfPair<'b, W> {
    fn new(a: &'b mut [W], b: &'b mut [W]) -> Self {
        Self { a, b }
    }

    /// Length of each half.
    pub fn len(&self) -> usize {
        self.a.len()
    }

    /// `true` for a zero-length pair (signal type disabled).
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Read access to one half.
    pub fn get(&self, half: HalfIndex) -> &[W] {
        match half {
            HalfIndex::A => &*self.a,
            HalfIndex::B => &*self.b,
        }
    }

    /// Write access to one half.
    pub fn get_mut(&mut self, half: HalfIndex) -> &mut [W] {
        match half {
            HalfIndex::A => &mut *self.a,
            HalfIndex::B => &mut *self.b,
        }
    }

    /// Both halves at once, for priming.
    pub fn both_mut(&mut self) -> (&mut [W], &mut [W]) {
        (&mut *self.a, &mut *self.b)
    }
}

/// The four halves of one capture.
#[derive(Debug)]
pub struct CaptureBuffers<'b> {
    /// Sequencer samples, one byte each.
    pub digital: HalfPair<'b, u8>,
    /// ADC words, round-robin order.
    pub analog: HalfPair<'b, u16>,
}

/// Word-aligned pool handed to the engine once at startup.
#[derive(Debug)]
pub struct SampleArena<'a> {
    words: &'a mut [u32],
}

impl<'a> SampleArena<'a> {
    /// Wrap `words` (typically a `static` from `platform::memory`).
    pub fn new(words: &'a mut [u32]) -> Self {
        Self { words }
    }

    /// Capacity in bytes; the planner's `free_bytes`.
    #[allow(clippy::arithmetic_side_effects)] // Safety: slice length × 4 fits in usize
    pub fn capacity_bytes(&self) -> usize {
        self.words.len() * 4
    }

    /// Clear the pool and split it per `layout`.
    ///
    /// Fails with `InsufficientMemory` if the layout was planned for a bigger
    /// arena.
    #[allow(clippy::arithmetic_side_effects)] // Safety: sizes checked against capacity first
    pub fn carve(&mut self, layout: &BufferLayout) -> Result<CaptureBuffers<'_>, PlanError> {
        let too_small = PlanError::InsufficientMemory {
            required: layout.total_bytes(),
            available: self.capacity_bytes(),
        };
        // Two byte halves rounded up to whole words; two u16 halves of n words
        // each occupy exactly n u32s.
        let digital_words = (2 * layout.digital_bytes_per_half).div_ceil(4);
        let analog_words = layout.analog_words_per_half;
        if digital_words + analog_words > self.words.len() {
            return Err(too_small);
        }

        self.words.fill(0);
        let (digital_region, rest) = self.words.split_at_mut(digital_words);
        let (analog_region, _) = rest.split_at_mut(analog_words);

        let digital_bytes: &mut [u8] = bytemuck::cast_slice_mut(digital_region);
        let analog_halfwords: &mut [u16] = bytemuck::cast_slice_mut(analog_region);

        let digital = split_pair(digital_bytes, layout.digital_bytes_per_half);
        let analog = split_pair(analog_halfwords, layout.analog_words_per_half);
        match (digital, analog) {
            (Some(digital), Some(analog)) => Ok(CaptureBuffers { digital, analog }),
            _ => Err(too_small),
        }
    }
}

fn split_pair<W>(region: &mut [W], len: usize) -> Option<HalfPair<'_, W>> {
    if len.checked_mul(2)? > region.len() {
        return None;
    }
    let (a, rest) = region.split_at_mut(len);
    let (b, _) = rest.split_at_mut(len);
    Some(HalfPair::new(a, b))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests unwrap layouts known to fit
mod tests {
    use super::*;

    fn layout(samples: usize, words: usize) -> BufferLayout {
        BufferLayout {
            samples_per_half: samples,
            digital_bytes_per_half: samples,
            analog_words_per_half: words,
            analog_groups_per_half: words,
            decimation_factor: 1,
            analog_channels: usize::from(words > 0),
        }
    }

    #[test]
    fn carve_splits_without_overlap() {
        let mut words = [0xFFFF_FFFFu32; 64];
        let mut arena = SampleArena::new(&mut words);
        let mut buffers = arena.carve(&layout(10, 6)).unwrap();

        assert_eq!(buffers.digital.len(), 10);
        assert_eq!(buffers.analog.len(), 6);
        assert!(buffers.digital.get(HalfIndex::A).iter().all(|&b| b == 0));

        buffers.digital.get_mut(HalfIndex::A).fill(0xAA);
        buffers.analog.get_mut(HalfIndex::B).fill(0x0FFF);
        assert!(buffers.digital.get(HalfIndex::B).iter().all(|&b| b == 0));
        assert!(buffers.analog.get(HalfIndex::A).iter().all(|&w| w == 0));
    }

    #[test]
    fn carve_rejects_oversized_layout() {
        let mut words = [0u32; 4];
        let mut arena = SampleArena::new(&mut words);
        assert!(matches!(
            arena.carve(&layout(16, 0)),
            Err(PlanError::InsufficientMemory { .. })
        ));
    }

    #[test]
    fn split_pair_refuses_short_region() {
        let mut region = [0u16; 5];
        assert!(split_pair(&mut region, 3).is_none());
        assert!(split_pair(&mut region, usize::MAX).is_none());
        assert_eq!(split_pair(&mut region, 2).unwrap().len(), 2);
    }

    #[test]
    fn digital_only_has_empty_analog() {
        let mut words = [0u32; 8];
        let mut arena = SampleArena::new(&mut words);
        assert_eq!(arena.capacity_bytes(), 32);
        let buffers = arena.carve(&layout(8, 0)).unwrap();
        assert!(buffers.analog.is_empty());
    }
}
