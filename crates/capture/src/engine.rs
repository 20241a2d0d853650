//! Command/Protocol Engine.
//!
//! Owns the board, the arena and the single [`CaptureSession`]. [`poll`]
//! drains the host link through the [`CommandReader`] and answers every
//! complete command with exactly one `\n`-terminated reply, except `C`/`F`,
//! which stream data and a `$<n>+` marker, and `+`/`*`, which reply nothing.
//!
//! [`poll`]: CaptureEngine::poll

use core::fmt::Write as _;

use heapless::String;
use platform::config::{ANALOG_FORMAT_DESCRIPTOR, DEVICE_ID};
use platform::{Board, BoardParts, CalibrationTable, CaptureActivity, OutOfRangeError, SerialTransport};

use crate::arena::SampleArena;
use crate::config::EngineConfig;
use crate::coordinator::{Coordinator, RunOutcome};
use crate::encoder::Encoder;
use crate::error::{CaptureError, CommandError};
use crate::protocol::{Command, CommandReader};
use crate::recovery::DmaRecoveryState;
use crate::session::{CaptureSession, CaptureState};
use crate::trigger::TriggerDetector;

/// Longest textual reply, newline included.
const MAX_REPLY_BYTES: usize = 48;

/// The capture engine for one board.
pub struct CaptureEngine<'a, B: Board> {
    parts: BoardParts<B>,
    arena: SampleArena<'a>,
    activity: &'a CaptureActivity,
    config: EngineConfig,
    session: CaptureSession,
    reader: CommandReader,
    encoder: Encoder,
    detector: TriggerDetector,
    recovery: DmaRecoveryState,
}

impl<'a, B: Board> CaptureEngine<'a, B> {
    /// Build an engine over `parts`, using `arena_words` as capture memory.
    ///
    /// Fails if `config` is out of range.
    pub fn new(
        parts: BoardParts<B>,
        arena_words: &'a mut [u32],
        activity: &'a CaptureActivity,
        config: EngineConfig,
    ) -> Result<Self, OutOfRangeError> {
        config.validate()?;
        let arena = SampleArena::new(arena_words);
        info!("capture engine up, {} arena bytes", arena.capacity_bytes());
        Ok(Self {
            parts,
            arena,
            activity,
            session: CaptureSession::new(&config),
            config,
            reader: CommandReader::new(),
            encoder: Encoder::new(),
            detector: TriggerDetector::new(),
            recovery: DmaRecoveryState::new(),
        })
    }

    /// Current session.
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// DMA health.
    pub fn recovery(&self) -> DmaRecoveryState {
        self.recovery
    }

    /// Board instances.
    pub fn parts(&self) -> &BoardParts<B> {
        &self.parts
    }

    /// Board instances, mutably (tests inject faults through this).
    pub fn parts_mut(&mut self) -> &mut BoardParts<B> {
        &mut self.parts
    }

    /// Process every byte currently available on the host link.
    ///
    /// Returns `Err(Transport)` only when the link itself fails; command and
    /// capture failures are reported to the host and leave the engine Idle.
    pub fn poll(&mut self) -> Result<(), CaptureError> {
        while self.parts.transport.available() > 0 {
            let Some(byte) = self
                .parts
                .transport
                .read_byte()
                .map_err(|_| CaptureError::Transport)?
            else {
                break;
            };
            match self.reader.push(byte) {
                Some(Ok(command)) => self.handle(command)?,
                Some(Err(err)) => self.reject(err)?,
                None => {}
            }
        }
        Ok(())
    }

    /// Execute one parsed command.
    pub fn handle(&mut self, command: Command) -> Result<(), CaptureError> {
        debug!("command {:?}", command);
        match command {
            Command::Identify => self.reply(format_args!("{}", DEVICE_ID)),
            Command::SetRate(rate) => {
                if !self.session.set_sample_rate(rate) {
                    return self.busy();
                }
                let k = self.session.decimation_factor(&self.config);
                self.reply(format_args!("*{}", k))
            }
            Command::SetSamples(samples) => {
                let accepted = self.session.set_total_samples(samples);
                self.ack(accepted)
            }
            Command::Analog { enable, channel } => {
                let accepted = self.session.set_analog(channel, enable);
                self.ack(accepted)
            }
            Command::Digital { enable, channel } => {
                let accepted = self.session.set_digital(channel, enable);
                self.ack(accepted)
            }
            Command::AnalogFormat => self.reply(format_args!("{}", ANALOG_FORMAT_DESCRIPTOR)),
            Command::Calibration(channel) => match self.parts.calibration.channel(channel) {
                Some(cal) => self.reply(format_args!(
                    "{}x{}",
                    cal.scale_microvolts,
                    cal.offset_microvolts
                )),
                None => self.reply(format_args!("!range")),
            },
            Command::RunOnce => self.run(false),
            Command::RunContinuous => self.run(true),
            Command::Trigger(kind) => {
                let accepted = self.session.set_trigger(kind);
                self.ack(accepted)
            }
            Command::DisableTrigger => {
                let accepted = self.session.disable_trigger();
                self.ack(accepted)
            }
            Command::Status => {
                let state = self.session.state();
                let armed = state != CaptureState::Idle;
                let started = matches!(state, CaptureState::Running | CaptureState::DataReady);
                let sending = state == CaptureState::DataReady;
                self.reply(format_args!(
                    "A{}S{}R{}T{}",
                    u8::from(armed),
                    u8::from(started),
                    u8::from(sending),
                    u8::from(self.session.trigger().enabled)
                ))
            }
            Command::Abort | Command::Reset => {
                self.reset();
                Ok(())
            }
            // Pre-trigger capture is not supported; report the effective value.
            Command::PreTrigger(_) => self.reply(format_args!("*0")),
            Command::Memory => {
                let free = self.arena.capacity_bytes();
                match self.session.plan(free, &self.config) {
                    Ok(layout) => self.reply(format_args!(
                        "{},{},{}",
                        free,
                        layout.samples_per_half,
                        layout.decimation_factor
                    )),
                    Err(_) => self.reply(format_args!("!mem")),
                }
            }
        }
    }

    /// Back to Idle with settings kept except the trigger, which the host
    /// must set again; drops any partial command and any staged transmit
    /// bytes. Idempotent.
    pub fn reset(&mut self) {
        self.session.reset();
        self.session.clear_trigger();
        self.detector.disarm();
        self.encoder.discard();
        self.reader.clear();
    }

    fn run(&mut self, continuous: bool) -> Result<(), CaptureError> {
        if !self.session.is_idle() {
            return self.busy();
        }
        let activity = self.activity;
        let _running = activity.hold();
        let mut cycles = 0u32;
        loop {
            let result = self.run_cycle();
            self.session.reset();
            self.detector.disarm();
            match result {
                Ok(RunOutcome::Completed { .. }) if continuous => {
                    cycles = cycles.saturating_add(1);
                    debug!("continuous cycle {} done", cycles);
                }
                Ok(RunOutcome::Completed { .. }) => return Ok(()),
                Ok(RunOutcome::Aborted) => {
                    self.session.clear_trigger();
                    return Ok(());
                }
                Ok(RunOutcome::Reset) => {
                    self.reset();
                    return Ok(());
                }
                Err(err) => {
                    warn!("capture failed: {}", err.reason());
                    return self.reply(format_args!("!{}", err.reason()));
                }
            }
        }
    }

    fn run_cycle(&mut self) -> Result<RunOutcome, CaptureError> {
        let layout = self
            .session
            .plan(self.arena.capacity_bytes(), &self.config)?;
        Coordinator::new(
            &mut self.parts,
            &mut self.session,
            &mut self.detector,
            &mut self.encoder,
            &mut self.recovery,
            &self.config,
        )
        .run(&mut self.arena, &layout)
    }

    fn ack(&mut self, accepted: bool) -> Result<(), CaptureError> {
        if accepted {
            self.reply(format_args!("*"))
        } else {
            self.busy()
        }
    }

    fn busy(&mut self) -> Result<(), CaptureError> {
        self.reply(format_args!("!busy"))
    }

    fn reject(&mut self, err: CommandError) -> Result<(), CaptureError> {
        debug!("rejected command: {}", err.reason());
        self.reply(format_args!("!{}", err.reason()))
    }

    fn reply(&mut self, args: core::fmt::Arguments<'_>) -> Result<(), CaptureError> {
        let mut line: String<MAX_REPLY_BYTES> = String::new();
        line.write_fmt(args)
            .and_then(|()| line.write_char('\n'))
            .map_err(|_| CaptureError::Transport)?;
        self.encoder.send(
            line.as_bytes(),
            &mut self.parts.transport,
            &mut self.parts.delay,
            &self.config,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests unwrap fakes that only fail when told to
mod tests {
    use super::*;
    use platform::mocks::HostBoard;

    fn engine<'a>(
        words: &'a mut [u32],
        activity: &'a CaptureActivity,
    ) -> CaptureEngine<'a, HostBoard> {
        CaptureEngine::new(HostBoard::parts(), words, activity, EngineConfig::default()).unwrap()
    }

    fn exchange(engine: &mut CaptureEngine<'_, HostBoard>, input: &[u8]) -> std::string::String {
        engine.parts_mut().transport.push_rx(input);
        engine.poll().unwrap();
        let out = engine.parts_mut().transport.take_tx();
        std::string::String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn identify_and_format() {
        let mut words = vec![0u32; 1024];
        let activity = CaptureActivity::new();
        let mut engine = engine(&mut words, &activity);
        assert_eq!(exchange(&mut engine, b"i"), "BBLA1\n");
        assert_eq!(exchange(&mut engine, b"a\n"), "u12,f7x2,le\n");
    }

    #[test]
    fn rate_reply_carries_decimation() {
        let mut words = vec![0u32; 1024];
        let activity = CaptureActivity::new();
        let mut engine = engine(&mut words, &activity);
        assert_eq!(exchange(&mut engine, b"R800000\n"), "*1\n");
        assert_eq!(exchange(&mut engine, b"A10\n"), "*\n");
        assert_eq!(exchange(&mut engine, b"R800000\n"), "*4\n");
    }

    #[test]
    fn calibration_reply() {
        let mut words = vec![0u32; 1024];
        let activity = CaptureActivity::new();
        let mut engine = engine(&mut words, &activity);
        assert_eq!(exchange(&mut engine, b"a1\n"), "805x0\n");
        assert_eq!(exchange(&mut engine, b"a7\n"), "!range\n");
    }

    #[test]
    fn status_and_trigger_flags() {
        let mut words = vec![0u32; 1024];
        let activity = CaptureActivity::new();
        let mut engine = engine(&mut words, &activity);
        assert_eq!(exchange(&mut engine, b"S"), "A0S0R0T0\n");
        assert_eq!(exchange(&mut engine, b"tg3,r\n"), "*\n");
        assert_eq!(exchange(&mut engine, b"S"), "A0S0R0T1\n");
        assert_eq!(exchange(&mut engine, b"d"), "*\n");
        assert_eq!(exchange(&mut engine, b"S"), "A0S0R0T0\n");
    }

    #[test]
    fn host_disarm_clears_trigger() {
        let mut words = vec![0u32; 1024];
        let activity = CaptureActivity::new();
        let mut engine = engine(&mut words, &activity);
        exchange(&mut engine, b"tg3,r\n");
        assert_eq!(exchange(&mut engine, b"*"), "");
        assert_eq!(exchange(&mut engine, b"S"), "A0S0R0T0\n");
        exchange(&mut engine, b"tl0,200,f\n");
        assert_eq!(exchange(&mut engine, b"+"), "");
        assert_eq!(exchange(&mut engine, b"S"), "A0S0R0T0\n");
    }

    #[test]
    fn analog_below_adc_floor_replies_range() {
        let mut words = vec![0u32; 1024];
        let activity = CaptureActivity::new();
        let mut engine = engine(&mut words, &activity);
        exchange(&mut engine, b"A10\n");
        assert_eq!(exchange(&mut engine, b"R100\n"), "*1\n");
        assert_eq!(exchange(&mut engine, b"F"), "!range\n");
        assert!(!engine.parts().digital.is_claimed());
        assert!(engine.session().is_idle());
    }

    #[test]
    fn errors_leave_settings_untouched() {
        let mut words = vec![0u32; 1024];
        let activity = CaptureActivity::new();
        let mut engine = engine(&mut words, &activity);
        let before = *engine.session();
        assert_eq!(exchange(&mut engine, b"R0\n"), "!range\n");
        assert_eq!(exchange(&mut engine, b"Lx\n"), "!syntax\n");
        assert_eq!(exchange(&mut engine, b"q"), "!syntax\n");
        assert_eq!(*engine.session(), before);
    }

    #[test]
    fn pre_trigger_is_forced_to_zero() {
        let mut words = vec![0u32; 1024];
        let activity = CaptureActivity::new();
        let mut engine = engine(&mut words, &activity);
        assert_eq!(exchange(&mut engine, b"P100\n"), "*0\n");
    }

    #[test]
    fn memory_query() {
        let mut words = vec![0u32; 1024];
        let activity = CaptureActivity::new();
        let mut engine = engine(&mut words, &activity);
        // Default session: 1000 samples, digital only.
        assert_eq!(exchange(&mut engine, b"m"), "4096,1000,1\n");
        exchange(&mut engine, b"L100000\n");
        assert_eq!(exchange(&mut engine, b"m"), "4096,1024,1\n");
        for line in 0..8u8 {
            exchange(&mut engine, format!("D0{line}\n").as_bytes());
        }
        assert_eq!(exchange(&mut engine, b"m"), "!mem\n");
    }

    #[test]
    fn activity_flag_drops_after_run() {
        let mut words = vec![0u32; 1024];
        let activity = CaptureActivity::new();
        let mut engine = engine(&mut words, &activity);
        exchange(&mut engine, b"L10\n");
        let out = exchange(&mut engine, b"F");
        assert!(out.ends_with("$20+"));
        assert!(!activity.is_running());
        assert!(engine.session().is_idle());
    }

    #[test]
    fn rejects_bad_config() {
        let mut words = [0u32; 4];
        let activity = CaptureActivity::new();
        let config = EngineConfig {
            stall_poll_interval_us: 0,
            ..EngineConfig::default()
        };
        assert!(CaptureEngine::new(HostBoard::parts(), &mut words, &activity, config).is_err());
    }
}
