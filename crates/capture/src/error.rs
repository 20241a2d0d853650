//! Error types.
//!
//! Each error has one wire reason (`!<reason>` reply). Nothing here is fatal:
//! every path that produces one returns the session to Idle.

use platform::OutOfRangeError;

/// Buffer Layout Planner failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlanError {
    /// Neither a digital nor an analog channel is enabled.
    #[error("no channel enabled")]
    NoChannels,
    /// Zero sample count, or analog conversions slower than the ADC can pace.
    #[error("sample count or rate outside what the hardware can pace")]
    InvalidRequest,
    /// Even the smallest legal half does not fit.
    #[error("{required} bytes required, {available} available")]
    InsufficientMemory {
        /// Bytes the smallest layout needs, margin included.
        required: usize,
        /// Arena capacity.
        available: usize,
    },
}

/// Which hardware step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareFault {
    /// Sequencer state machine is held by another subsystem.
    SequencerClaim,
    /// Digital DMA channels are held by another subsystem.
    DigitalDmaClaim,
    /// Analog DMA channels are held by another subsystem.
    AnalogDmaClaim,
    /// Sequencer rejected its program or divider.
    SequencerConfig,
    /// ADC rejected its divisor or mask.
    AdcConfig,
    /// A DMA pair could not be primed.
    DmaPrime,
}

/// Capture failure. Maps onto a wire reason via [`reason`](Self::reason).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureError {
    /// Layout planning failed.
    #[error("planning failed: {0}")]
    Plan(PlanError),
    /// A hardware resource could not be claimed or configured.
    #[error("hardware unavailable: {0:?}")]
    Hardware(HardwareFault),
    /// A DMA half never completed within its time budget.
    #[error("DMA stalled")]
    Stall,
    /// Hardware finished the next half before the previous one was consumed.
    #[error("DMA overran the reader")]
    Overrun,
    /// The host link failed or stayed full past the retry ceiling.
    #[error("transport failed")]
    Transport,
}

impl CaptureError {
    /// Reason string sent after `!`.
    pub fn reason(&self) -> &'static str {
        match self {
            CaptureError::Plan(PlanError::InsufficientMemory { .. }) => "mem",
            CaptureError::Plan(_) => "range",
            CaptureError::Hardware(_) => "busy",
            CaptureError::Stall => "stall",
            CaptureError::Overrun => "overrun",
            CaptureError::Transport => "transport",
        }
    }
}

impl From<PlanError> for CaptureError {
    fn from(err: PlanError) -> Self {
        CaptureError::Plan(err)
    }
}

/// Command rejected before any state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Unknown command or malformed arguments.
    #[error("malformed command")]
    Syntax,
    /// Well-formed argument outside its valid range.
    #[error("argument out of range: {0}")]
    Range(OutOfRangeError),
}

impl CommandError {
    /// Reason string sent after `!`.
    pub fn reason(&self) -> &'static str {
        match self {
            CommandError::Syntax => "syntax",
            CommandError::Range(_) => "range",
        }
    }
}

impl From<OutOfRangeError> for CommandError {
    fn from(err: OutOfRangeError) -> Self {
        CommandError::Range(err)
    }
}
