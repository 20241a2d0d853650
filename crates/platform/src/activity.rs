//! "Capture in progress" signal shared with the other core.
//!
//! The second core drives the crossbar routing and LED subsystems, which
//! compete with capture for DMA bandwidth. While the flag is set it must skip
//! its periodic work. A single atomic boolean is enough: one writer (the
//! capture engine), any number of readers, no ordering requirements with other
//! memory, so plain load/store is used (Cortex-M0+ has no CAS).

use core::sync::atomic::{AtomicBool, Ordering};

/// Cross-core flag raised for the lifetime of an armed capture.
#[derive(Debug, Default)]
pub struct CaptureActivity {
    running: AtomicBool,
}

impl CaptureActivity {
    /// New, cleared flag. Usable in a `static`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// Raise the flag.
    pub fn begin(&self) {
        self.running.store(true, Ordering::Release);
    }

    /// Clear the flag. Idempotent.
    pub fn end(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// `true` while a capture is armed or running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Raise the flag and return a guard that clears it on drop.
    pub fn hold(&self) -> ActivityGuard<'_> {
        self.begin();
        ActivityGuard { activity: self }
    }
}

/// Clears the [`CaptureActivity`] flag when dropped.
#[derive(Debug)]
pub struct ActivityGuard<'a> {
    activity: &'a CaptureActivity,
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.activity.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_clears_on_drop() {
        let activity = CaptureActivity::new();
        {
            let _guard = activity.hold();
            assert!(activity.is_running());
        }
        assert!(!activity.is_running());
    }

    #[test]
    fn end_is_idempotent() {
        let activity = CaptureActivity::new();
        activity.end();
        activity.begin();
        activity.end();
        activity.end();
        assert!(!activity.is_running());
    }
}
