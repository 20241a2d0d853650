//! Shared-resource claim registry.
//!
//! The PIO block and the DMA channels are shared between the capture engine
//! and the crossbar routing subsystem. Whoever drives a resource claims it
//! here first and releases it when done; a second claimant gets
//! [`ClaimError::Busy`] instead of silently reprogramming live hardware.
//!
//! The registry sits behind a `critical_section::Mutex` rather than an atomic
//! read-modify-write: Cortex-M0+ has no compare-and-swap, and claims must be
//! visible across both cores.

use core::cell::Cell;

use critical_section::Mutex;
use platform::memory::DMA_CHANNEL_COUNT;
use thiserror_no_std::Error;

/// Number of PIO state machines per block.
pub const PIO_STATE_MACHINES: u8 = 4;

/// Bit offset of the PIO state machines in the claim word.
const PIO_BIT_BASE: u32 = 16;

/// A claimable hardware resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resource {
    /// DMA channel 0..=11.
    DmaChannel(u8),
    /// PIO1 state machine 0..=3 (PIO0 belongs to the LED driver).
    PioStateMachine(u8),
}

impl Resource {
    #[allow(clippy::arithmetic_side_effects)] // Safety: shift amounts bounded by the guards (< 20)
    fn bit(self) -> Option<u32> {
        match self {
            Resource::DmaChannel(ch) if ch < DMA_CHANNEL_COUNT => Some(1 << ch),
            Resource::PioStateMachine(sm) if sm < PIO_STATE_MACHINES => {
                Some(1 << (PIO_BIT_BASE + u32::from(sm)))
            }
            _ => None,
        }
    }
}

/// Claim failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClaimError {
    /// Someone else holds the resource.
    #[error("resource busy: {0:?}")]
    Busy(Resource),
    /// The resource does not exist on this chip.
    #[error("no such resource: {0:?}")]
    Unknown(Resource),
}

/// Claim word guarded by a critical section.
pub struct ResourceClaims {
    held: Mutex<Cell<u32>>,
}

/// The device-wide registry.
pub static CLAIMS: ResourceClaims = ResourceClaims::new();

impl ResourceClaims {
    /// Empty registry.
    pub const fn new() -> Self {
        Self {
            held: Mutex::new(Cell::new(0)),
        }
    }

    /// Claim every resource in `resources`, or none of them.
    pub fn claim_all(&self, resources: &[Resource]) -> Result<(), ClaimError> {
        let mut wanted = 0u32;
        for &resource in resources {
            wanted |= resource.bit().ok_or(ClaimError::Unknown(resource))?;
        }
        critical_section::with(|cs| {
            let held = self.held.borrow(cs);
            if let Some(&busy) = resources
                .iter()
                .find(|r| r.bit().is_some_and(|bit| held.get() & bit != 0))
            {
                return Err(ClaimError::Busy(busy));
            }
            held.set(held.get() | wanted);
            Ok(())
        })
    }

    /// Claim a single resource.
    pub fn claim(&self, resource: Resource) -> Result<(), ClaimError> {
        self.claim_all(&[resource])
    }

    /// Release every resource in `resources`. Releasing an unheld resource
    /// is a no-op.
    pub fn release_all(&self, resources: &[Resource]) {
        let mask = resources
            .iter()
            .filter_map(|r| r.bit())
            .fold(0u32, |acc, bit| acc | bit);
        critical_section::with(|cs| {
            let held = self.held.borrow(cs);
            held.set(held.get() & !mask);
        });
    }

    /// Release a single resource.
    pub fn release(&self, resource: Resource) {
        self.release_all(&[resource]);
    }

    /// `true` while `resource` is held.
    pub fn is_claimed(&self, resource: Resource) -> bool {
        let Some(bit) = resource.bit() else {
            return false;
        };
        critical_section::with(|cs| self.held.borrow(cs).get() & bit != 0)
    }
}

impl Default for ResourceClaims {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_all_is_all_or_nothing() {
        let claims = ResourceClaims::new();
        assert_eq!(claims.claim(Resource::DmaChannel(9)), Ok(()));

        let err = claims.claim_all(&[Resource::DmaChannel(8), Resource::DmaChannel(9)]);
        assert_eq!(err, Err(ClaimError::Busy(Resource::DmaChannel(9))));
        assert!(!claims.is_claimed(Resource::DmaChannel(8)));
    }

    #[test]
    fn release_frees_for_the_next_claimant() {
        let claims = ResourceClaims::new();
        assert_eq!(claims.claim(Resource::PioStateMachine(0)), Ok(()));
        assert!(claims.claim(Resource::PioStateMachine(0)).is_err());
        claims.release(Resource::PioStateMachine(0));
        claims.release(Resource::PioStateMachine(0));
        assert_eq!(claims.claim(Resource::PioStateMachine(0)), Ok(()));
    }

    #[test]
    fn dma_and_pio_do_not_alias() {
        let claims = ResourceClaims::new();
        assert_eq!(claims.claim(Resource::DmaChannel(0)), Ok(()));
        assert_eq!(claims.claim(Resource::PioStateMachine(0)), Ok(()));
    }

    #[test]
    fn out_of_range_resources_are_rejected() {
        let claims = ResourceClaims::new();
        assert_eq!(
            claims.claim(Resource::DmaChannel(12)),
            Err(ClaimError::Unknown(Resource::DmaChannel(12)))
        );
        assert_eq!(
            claims.claim(Resource::PioStateMachine(4)),
            Err(ClaimError::Unknown(Resource::PioStateMachine(4)))
        );
        assert!(!claims.is_claimed(Resource::DmaChannel(12)));
    }
}
