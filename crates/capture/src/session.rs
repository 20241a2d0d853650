//! The single live capture configuration and its state tag.
//!
//! Setters only succeed while Idle; the engine is the sole owner.

use platform::{ChannelIndex, ChannelMask, SampleRateHz};

use crate::config::EngineConfig;
use crate::error::PlanError;
use crate::planner::{self, BufferLayout, PlanRequest};
use crate::trigger::{TriggerConfig, TriggerKind};

/// Capture lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureState {
    /// Configurable; no resources held.
    #[default]
    Idle,
    /// Resources claimed and primed; waiting to start or for the trigger.
    Armed,
    /// Hardware sampling, halves streaming.
    Running,
    /// Last sample encoded; completion marker pending.
    DataReady,
}

/// Session settings plus state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureSession {
    sample_rate: SampleRateHz,
    total_samples: u32,
    digital: ChannelMask,
    analog: ChannelMask,
    trigger: TriggerConfig,
    state: CaptureState,
}

impl CaptureSession {
    /// Fresh session: configured defaults, all digital lines, no analog.
    pub fn new(config: &EngineConfig) -> Self {
        let sample_rate =
            SampleRateHz::new(config.default_sample_rate_hz).unwrap_or(SampleRateHz::MIN);
        Self {
            sample_rate,
            total_samples: config.default_total_samples.max(1),
            digital: ChannelMask::ALL,
            analog: ChannelMask::NONE,
            trigger: TriggerConfig::default(),
            state: CaptureState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// `true` while Idle.
    pub fn is_idle(&self) -> bool {
        self.state == CaptureState::Idle
    }

    /// Digital sample rate.
    pub fn sample_rate(&self) -> SampleRateHz {
        self.sample_rate
    }

    /// Post-trigger samples per capture.
    pub fn total_samples(&self) -> u32 {
        self.total_samples
    }

    /// Enabled digital lines.
    pub fn digital(&self) -> ChannelMask {
        self.digital
    }

    /// Enabled ADC channels.
    pub fn analog(&self) -> ChannelMask {
        self.analog
    }

    /// Trigger setting.
    pub fn trigger(&self) -> TriggerConfig {
        self.trigger
    }

    /// Decimation the current rate and analog mask imply.
    pub fn decimation_factor(&self, config: &EngineConfig) -> u32 {
        planner::decimation_factor(
            self.sample_rate,
            self.analog.count(),
            config.planner.adc_max_throughput_sps,
        )
    }

    /// Plan halves for this session in an arena of `free_bytes`.
    pub fn plan(&self, free_bytes: usize, config: &EngineConfig) -> Result<BufferLayout, PlanError> {
        planner::plan(
            &PlanRequest {
                sample_rate: self.sample_rate,
                total_samples: self.total_samples,
                digital: self.digital,
                analog: self.analog,
                free_bytes,
            },
            &config.planner,
        )
    }

    /// Set the sample rate. Returns `false` (unchanged) unless Idle.
    pub fn set_sample_rate(&mut self, rate: SampleRateHz) -> bool {
        self.when_idle(|s| s.sample_rate = rate)
    }

    /// Set the post-trigger sample count. Returns `false` unless Idle.
    pub fn set_total_samples(&mut self, samples: u32) -> bool {
        self.when_idle(|s| s.total_samples = samples)
    }

    /// Enable or disable one digital line. Returns `false` unless Idle.
    pub fn set_digital(&mut self, channel: ChannelIndex, enabled: bool) -> bool {
        self.when_idle(|s| s.digital = s.digital.with(channel, enabled))
    }

    /// Enable or disable one ADC channel. Returns `false` unless Idle.
    pub fn set_analog(&mut self, channel: ChannelIndex, enabled: bool) -> bool {
        self.when_idle(|s| s.analog = s.analog.with(channel, enabled))
    }

    /// Configure the trigger. Returns `false` unless Idle.
    pub fn set_trigger(&mut self, kind: TriggerKind) -> bool {
        self.when_idle(|s| s.trigger = TriggerConfig::new(kind))
    }

    /// Disable the trigger. Returns `false` unless Idle.
    pub fn disable_trigger(&mut self) -> bool {
        self.when_idle(|s| s.trigger.enabled = false)
    }

    /// Drop the trigger setting in any state. Used when the host disarms.
    pub fn clear_trigger(&mut self) {
        self.trigger = TriggerConfig::default();
    }

    /// Idle → Armed.
    pub fn arm(&mut self) -> bool {
        self.advance(CaptureState::Idle, CaptureState::Armed)
    }

    /// Armed → Running.
    pub fn start(&mut self) -> bool {
        self.advance(CaptureState::Armed, CaptureState::Running)
    }

    /// Running → DataReady.
    pub fn finish(&mut self) -> bool {
        self.advance(CaptureState::Running, CaptureState::DataReady)
    }

    /// Any state → Idle. Settings are kept; only the state tag resets.
    pub fn reset(&mut self) {
        self.state = CaptureState::Idle;
    }

    fn advance(&mut self, from: CaptureState, to: CaptureState) -> bool {
        if self.state == from {
            self.state = to;
            true
        } else {
            false
        }
    }

    fn when_idle(&mut self, apply: impl FnOnce(&mut Self)) -> bool {
        if self.is_idle() {
            apply(self);
            true
        } else {
            false
        }
    }
}
