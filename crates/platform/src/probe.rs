//! Read-only view of named device-state variables.
//!
//! Internal-variable triggers compare one of these against a target value,
//! letting a capture start when, say, the routing subsystem reaches a given
//! state rather than when a pin moves.

/// Source of named integer state values.
pub trait StateProbe {
    /// Current value of variable `id`, or `None` if the id is unknown.
    fn read(&self, id: u8) -> Option<i32>;
}

/// Probe that knows no variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoState;

impl StateProbe for NoState {
    fn read(&self, _id: u8) -> Option<i32> {
        None
    }
}
