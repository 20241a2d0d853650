//! Trigger Detector.
//!
//! ```text
//! Disabled ──arm()──► Armed ──condition──► Detected ──consume()──► Disabled
//! ```
//!
//! While armed, every sample is offered to [`TriggerDetector::evaluate`]. The
//! first sample after arming only records the reference value; a transition
//! needs two samples. Internal-variable triggers ignore samples and are
//! checked once per loop iteration through [`TriggerDetector::evaluate_variable`].

use platform::{ChannelIndex, Edge, StateProbe};

/// What starts the timed capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerKind {
    /// Capture starts immediately.
    #[default]
    None,
    /// Analog code crosses `level`.
    AnalogLevel {
        /// ADC channel.
        channel: ChannelIndex,
        /// 12-bit threshold.
        level: u16,
        /// Crossing direction.
        edge: Edge,
    },
    /// Analog slope changes sign (rising = slope turns positive).
    AnalogEdge {
        /// ADC channel.
        channel: ChannelIndex,
        /// Sign change direction.
        edge: Edge,
    },
    /// Digital line transition.
    DigitalEdge {
        /// Digital line.
        channel: ChannelIndex,
        /// Transition direction.
        edge: Edge,
    },
    /// Named device-state value equals `value`.
    InternalVariable {
        /// Variable id passed to the [`StateProbe`].
        id: u8,
        /// Expected value.
        value: i32,
    },
}

impl TriggerKind {
    /// ADC channel the condition watches, if any.
    pub fn analog_channel(&self) -> Option<ChannelIndex> {
        match *self {
            TriggerKind::AnalogLevel { channel, .. } | TriggerKind::AnalogEdge { channel, .. } => {
                Some(channel)
            }
            _ => None,
        }
    }
}

/// Session trigger setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerConfig {
    /// Condition.
    pub kind: TriggerKind,
    /// `false` after `d`; the kind is kept for status only.
    pub enabled: bool,
}

impl TriggerConfig {
    /// Enabled trigger of `kind` (`None` yields a disabled config).
    pub fn new(kind: TriggerKind) -> Self {
        Self {
            kind,
            enabled: kind != TriggerKind::None,
        }
    }

    /// Condition to arm with, `None` when disabled.
    pub fn effective(&self) -> TriggerKind {
        if self.enabled {
            self.kind
        } else {
            TriggerKind::None
        }
    }
}

/// Detector lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerState {
    /// Not watching.
    Disabled,
    /// Watching; no condition seen yet.
    Armed,
    /// Condition seen; waiting to be consumed.
    Detected,
}

/// One time-sample as seen by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerSample {
    /// Digital lines.
    pub digital: u8,
    /// Fresh code for the trigger's ADC channel, `None` on decimated samples.
    pub analog: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    None,
    Level(bool),
    Slope { code: u16, sign: i8 },
}

/// Edge/level/variable detector.
#[derive(Debug, Clone, Copy)]
pub struct TriggerDetector {
    kind: TriggerKind,
    state: TriggerState,
    reference: Reference,
}

impl TriggerDetector {
    /// Disabled detector.
    pub const fn new() -> Self {
        Self {
            kind: TriggerKind::None,
            state: TriggerState::Disabled,
            reference: Reference::None,
        }
    }

    /// Start watching for `kind`, clearing any previous reference.
    ///
    /// `TriggerKind::None` goes straight to `Detected`.
    pub fn arm(&mut self, kind: TriggerKind) {
        self.kind = kind;
        self.reference = Reference::None;
        self.state = if kind == TriggerKind::None {
            TriggerState::Detected
        } else {
            TriggerState::Armed
        };
    }

    /// Stop watching.
    pub fn disarm(&mut self) {
        self.state = TriggerState::Disabled;
        self.reference = Reference::None;
    }

    /// Mark detected from outside (hardware line watcher).
    pub fn force_detected(&mut self) {
        if self.state == TriggerState::Armed {
            self.state = TriggerState::Detected;
        }
    }

    /// Take a pending detection, returning to `Disabled`.
    pub fn consume(&mut self) -> bool {
        if self.state == TriggerState::Detected {
            self.disarm();
            true
        } else {
            false
        }
    }

    /// Current state.
    pub fn state(&self) -> TriggerState {
        self.state
    }

    /// Condition being watched.
    pub fn kind(&self) -> TriggerKind {
        self.kind
    }

    /// `true` if the condition is evaluated from the variable probe rather
    /// than from samples.
    pub fn watches_variable(&self) -> bool {
        matches!(self.kind, TriggerKind::InternalVariable { .. })
    }

    /// Offer one sample. Returns `true` when this sample is the trigger point.
    pub fn evaluate(&mut self, sample: TriggerSample) -> bool {
        if self.state != TriggerState::Armed {
            return false;
        }
        let fired = match self.kind {
            TriggerKind::None => true,
            TriggerKind::DigitalEdge { channel, edge } => {
                let high = sample.digital & channel.bit() != 0;
                self.level_transition(high, edge)
            }
            TriggerKind::AnalogLevel { level, edge, .. } => match sample.analog {
                Some(code) => self.level_transition(code >= level, edge),
                None => false,
            },
            TriggerKind::AnalogEdge { edge, .. } => match sample.analog {
                Some(code) => self.slope_transition(code, edge),
                None => false,
            },
            TriggerKind::InternalVariable { .. } => false,
        };
        if fired {
            self.state = TriggerState::Detected;
        }
        fired
    }

    /// Check an internal-variable condition once.
    pub fn evaluate_variable<P: StateProbe>(&mut self, probe: &P) -> bool {
        if self.state != TriggerState::Armed {
            return false;
        }
        let TriggerKind::InternalVariable { id, value } = self.kind else {
            return false;
        };
        let fired = probe.read(id) == Some(value);
        if fired {
            self.state = TriggerState::Detected;
        }
        fired
    }

    fn level_transition(&mut self, high: bool, edge: Edge) -> bool {
        let previous = self.reference;
        self.reference = Reference::Level(high);
        match previous {
            Reference::Level(was_high) => edge.matches(was_high, high),
            _ => false,
        }
    }

    // Flat stretches keep the previous sign, so a plateau between a fall and
    // a rise still counts as one sign change.
    fn slope_transition(&mut self, code: u16, edge: Edge) -> bool {
        let Reference::Slope { code: last, sign } = self.reference else {
            self.reference = Reference::Slope { code, sign: 0 };
            return false;
        };
        let new_sign: i8 = match code.cmp(&last) {
            core::cmp::Ordering::Greater => 1,
            core::cmp::Ordering::Less => -1,
            core::cmp::Ordering::Equal => sign,
        };
        self.reference = Reference::Slope { code, sign: new_sign };
        if sign == 0 || new_sign == sign {
            return false;
        }
        edge.matches(sign > 0, new_sign > 0)
    }
}

impl Default for TriggerDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests unwrap constant channel indices
mod tests {
    use super::*;
    use platform::mocks::MockStateProbe;

    fn ch(n: u8) -> ChannelIndex {
        ChannelIndex::new(n).unwrap()
    }

    fn digital(value: u8) -> TriggerSample {
        TriggerSample {
            digital: value,
            analog: None,
        }
    }

    fn analog(code: u16) -> TriggerSample {
        TriggerSample {
            digital: 0,
            analog: Some(code),
        }
    }

    /// Feed `levels` on line 0, re-arming after every detection. Returns the
    /// indices that fired.
    fn fire_points(edge: Edge, levels: &[u8]) -> Vec<usize> {
        let kind = TriggerKind::DigitalEdge { channel: ch(0), edge };
        let mut detector = TriggerDetector::new();
        detector.arm(kind);
        let mut fired = Vec::new();
        for (i, &level) in levels.iter().enumerate() {
            if detector.evaluate(digital(level)) {
                fired.push(i);
                assert!(detector.consume());
                detector.arm(kind);
            }
        }
        fired
    }

    #[test]
    fn rising_edge_on_reference_sequence() {
        let fired = fire_points(Edge::Rising, &[0, 0, 1, 1, 0, 1]);
        assert_eq!(fired, vec![2, 5]);
        for never in [0, 1, 3, 4] {
            assert!(!fired.contains(&never));
        }
    }

    #[test]
    fn falling_and_either_edges() {
        assert_eq!(fire_points(Edge::Falling, &[0, 0, 1, 1, 0, 1]), vec![4]);
        // Re-arming on index 2 makes index 3 the new reference.
        assert_eq!(fire_points(Edge::Either, &[0, 0, 1, 1, 0, 1]), vec![2, 4]);
    }

    #[test]
    fn first_sample_never_fires() {
        let mut detector = TriggerDetector::new();
        detector.arm(TriggerKind::DigitalEdge {
            channel: ch(0),
            edge: Edge::Either,
        });
        assert!(!detector.evaluate(digital(1)));
        assert_eq!(detector.state(), TriggerState::Armed);
    }

    #[test]
    fn watches_only_its_line() {
        let mut detector = TriggerDetector::new();
        detector.arm(TriggerKind::DigitalEdge {
            channel: ch(3),
            edge: Edge::Rising,
        });
        assert!(!detector.evaluate(digital(0b0000)));
        assert!(!detector.evaluate(digital(0b0111)));
        assert!(detector.evaluate(digital(0b1000)));
    }

    #[test]
    fn analog_level_crossing() {
        let mut detector = TriggerDetector::new();
        detector.arm(TriggerKind::AnalogLevel {
            channel: ch(0),
            level: 2048,
            edge: Edge::Rising,
        });
        assert!(!detector.evaluate(analog(100)));
        assert!(!detector.evaluate(analog(2000)));
        assert!(!detector.evaluate(TriggerSample {
            digital: 0,
            analog: None
        }));
        assert!(detector.evaluate(analog(2048)));
    }

    #[test]
    fn analog_slope_turns_positive() {
        let mut detector = TriggerDetector::new();
        detector.arm(TriggerKind::AnalogEdge {
            channel: ch(1),
            edge: Edge::Rising,
        });
        // Falling, flat, then rising: fires on the first rise.
        assert!(!detector.evaluate(analog(900)));
        assert!(!detector.evaluate(analog(800)));
        assert!(!detector.evaluate(analog(800)));
        assert!(detector.evaluate(analog(850)));
    }

    #[test]
    fn analog_slope_needs_established_sign() {
        let mut detector = TriggerDetector::new();
        detector.arm(TriggerKind::AnalogEdge {
            channel: ch(1),
            edge: Edge::Falling,
        });
        assert!(!detector.evaluate(analog(100)));
        assert!(!detector.evaluate(analog(50)));
        assert!(!detector.evaluate(analog(10)));
        assert!(!detector.evaluate(analog(40)));
        assert!(detector.evaluate(analog(20)));
    }

    #[test]
    fn variable_trigger_checks_probe() {
        let probe = MockStateProbe::scripted(7, &[1, 2, 5]);
        let mut detector = TriggerDetector::new();
        detector.arm(TriggerKind::InternalVariable { id: 7, value: 5 });
        assert!(detector.watches_variable());
        assert!(!detector.evaluate(digital(0xFF)));
        assert!(!detector.evaluate_variable(&probe));
        assert!(!detector.evaluate_variable(&probe));
        assert!(detector.evaluate_variable(&probe));
        assert_eq!(detector.state(), TriggerState::Detected);
    }

    #[test]
    fn none_is_detected_immediately() {
        let mut detector = TriggerDetector::new();
        detector.arm(TriggerKind::None);
        assert!(detector.consume());
        assert_eq!(detector.state(), TriggerState::Disabled);
    }

    #[test]
    fn disabled_config_is_none() {
        let mut cfg = TriggerConfig::new(TriggerKind::DigitalEdge {
            channel: ch(0),
            edge: Edge::Rising,
        });
        assert!(cfg.enabled);
        cfg.enabled = false;
        assert_eq!(cfg.effective(), TriggerKind::None);
    }
}
