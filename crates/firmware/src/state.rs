//! Named device-state values published by the other subsystems.
//!
//! The routing and LED subsystems run on core 0 and publish small integers
//! here (active net count, selected layout, ...); core 1 reads them when an
//! internal-variable trigger is armed. Slots are plain atomics with
//! load/store only, which Cortex-M0+ supports without CAS.

use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use platform::StateProbe;

/// Number of variable slots.
pub const STATE_SLOTS: usize = 16;

/// Well-known variable ids.
pub mod vars {
    /// Number of nets currently routed through the crossbar.
    pub const ROUTED_NETS: u8 = 0;
    /// Index of the active routing layout.
    pub const ACTIVE_LAYOUT: u8 = 1;
    /// Free-running LED frame counter.
    pub const LED_FRAME: u8 = 2;
}

/// Table of published values.
pub struct DeviceState {
    values: [AtomicI32; STATE_SLOTS],
    known: [AtomicBool; STATE_SLOTS],
}

/// The device-wide table.
pub static DEVICE_STATE: DeviceState = DeviceState::new();

impl DeviceState {
    /// Table with every slot unpublished.
    #[allow(clippy::declare_interior_mutable_const)] // array-repeat seed, never used by reference
    pub const fn new() -> Self {
        const ZERO: AtomicI32 = AtomicI32::new(0);
        const UNKNOWN: AtomicBool = AtomicBool::new(false);
        Self {
            values: [ZERO; STATE_SLOTS],
            known: [UNKNOWN; STATE_SLOTS],
        }
    }

    /// Publish `value` for `id`. Ids past the table are ignored.
    pub fn publish(&self, id: u8, value: i32) {
        let slot = usize::from(id);
        if let (Some(v), Some(k)) = (self.values.get(slot), self.known.get(slot)) {
            v.store(value, Ordering::Relaxed);
            k.store(true, Ordering::Release);
        }
    }

    /// Current value of `id`, if it has ever been published.
    pub fn get(&self, id: u8) -> Option<i32> {
        let slot = usize::from(id);
        if !self.known.get(slot)?.load(Ordering::Acquire) {
            return None;
        }
        self.values.get(slot).map(|v| v.load(Ordering::Relaxed))
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}

/// [`StateProbe`] over a [`DeviceState`] table.
#[derive(Clone, Copy)]
pub struct DeviceStateProbe {
    table: &'static DeviceState,
}

impl DeviceStateProbe {
    /// Probe reading `table`.
    pub const fn new(table: &'static DeviceState) -> Self {
        Self { table }
    }
}

impl Default for DeviceStateProbe {
    fn default() -> Self {
        Self::new(&DEVICE_STATE)
    }
}

impl StateProbe for DeviceStateProbe {
    fn read(&self, id: u8) -> Option<i32> {
        self.table.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpublished_reads_none() {
        static TABLE: DeviceState = DeviceState::new();
        assert_eq!(TABLE.get(vars::ROUTED_NETS), None);
    }

    #[test]
    fn probe_sees_latest_value() {
        static TABLE: DeviceState = DeviceState::new();
        let probe = DeviceStateProbe::new(&TABLE);
        TABLE.publish(vars::ACTIVE_LAYOUT, 3);
        TABLE.publish(vars::ACTIVE_LAYOUT, -7);
        assert_eq!(probe.read(vars::ACTIVE_LAYOUT), Some(-7));
    }

    #[test]
    fn ids_past_the_table_are_ignored() {
        static TABLE: DeviceState = DeviceState::new();
        TABLE.publish(200, 1);
        assert_eq!(TABLE.get(200), None);
    }
}
