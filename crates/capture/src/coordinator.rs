//! Buffer/Transfer Coordinator: one capture cycle.
//!
//! ```text
//! claim ─► configure ─► carve + prime ─► [wait for fast trigger] ─► start
//!                                                                  │
//!     ┌──────────────── poll current half (digital, analog) ◄──────┘
//!     │ both filled: flip, rewind completed half, hand off, flush
//!     └─► total reached ─► teardown ─► `$<n>+`
//! ```
//!
//! Every exit (completion, abort, reset, error) goes through teardown, which
//! stops both engines, aborts both chains and releases exactly what was
//! claimed. Abort and reset discard the staged transmit bytes and send no
//! marker.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use platform::{
    AdcClockDivisor, AdcCode, AnalogSampler, Board, BoardParts, ChannelMask, DigitalSampler,
    DmaPingPong, HalfIndex, SequencerTiming, SerialTransport,
};

use crate::arena::{CaptureBuffers, SampleArena};
use crate::config::EngineConfig;
use crate::encoder::Encoder;
use crate::error::{CaptureError, HardwareFault, PlanError};
use crate::planner::BufferLayout;
use crate::recovery::DmaRecoveryState;
use crate::session::CaptureSession;
use crate::trigger::{TriggerDetector, TriggerKind, TriggerSample};

/// How a capture cycle ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunOutcome {
    /// All samples sent, marker emitted.
    Completed {
        /// Data bytes carried in the marker.
        data_bytes: u32,
    },
    /// Host sent `+`.
    Aborted,
    /// Host sent `*`.
    Reset,
}

/// Host byte seen while the capture loop serviced the link.
enum Interrupt {
    Abort,
    Reset,
}

impl From<Interrupt> for RunOutcome {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Abort => RunOutcome::Aborted,
            Interrupt::Reset => RunOutcome::Reset,
        }
    }
}

#[derive(Debug, Default)]
struct Claims {
    sequencer: bool,
    digital_dma: bool,
    analog_dma: bool,
}

/// Latest analog round-robin group, held across decimated samples.
#[derive(Debug, Default)]
struct HeldGroup {
    codes: Vec<u16, 8>,
    trigger_slot: Option<usize>,
}

impl HeldGroup {
    fn new(analog: ChannelMask, trigger: TriggerKind) -> Self {
        let trigger_slot = trigger
            .analog_channel()
            .and_then(|ch| analog.iter().position(|enabled| enabled == ch));
        let mut codes = Vec::new();
        for _ in 0..analog.count() {
            // At most 8 channels.
            let _ = codes.push(0);
        }
        Self {
            codes,
            trigger_slot,
        }
    }

    fn refresh(&mut self, group: &[u16]) {
        for (held, &word) in self.codes.iter_mut().zip(group) {
            *held = AdcCode::from_raw(word).get();
        }
    }

    fn trigger_code(&self) -> Option<u16> {
        self.codes.get(self.trigger_slot?).copied()
    }
}

/// Post-trigger bookkeeping across halves.
#[derive(Debug)]
struct Progress {
    held: HeldGroup,
    triggered: bool,
    captured: u32,
    total: u32,
}

/// Borrowed engine state driving one cycle.
pub struct Coordinator<'r, B: Board> {
    parts: &'r mut BoardParts<B>,
    session: &'r mut CaptureSession,
    detector: &'r mut TriggerDetector,
    encoder: &'r mut Encoder,
    recovery: &'r mut DmaRecoveryState,
    config: &'r EngineConfig,
}

impl<'r, B: Board> Coordinator<'r, B> {
    /// Borrow everything one cycle touches.
    pub fn new(
        parts: &'r mut BoardParts<B>,
        session: &'r mut CaptureSession,
        detector: &'r mut TriggerDetector,
        encoder: &'r mut Encoder,
        recovery: &'r mut DmaRecoveryState,
        config: &'r EngineConfig,
    ) -> Self {
        Self {
            parts,
            session,
            detector,
            encoder,
            recovery,
            config,
        }
    }

    /// Run one capture of `session.total_samples()` post-trigger samples.
    ///
    /// The session must be Idle on entry; it is left in DataReady on
    /// completion and untouched otherwise, so the caller resets it either way.
    pub fn run(
        mut self,
        arena: &mut SampleArena<'_>,
        layout: &BufferLayout,
    ) -> Result<RunOutcome, CaptureError> {
        let trigger = self.session.trigger().effective();
        if let Some(channel) = trigger.analog_channel() {
            if !self.session.analog().contains(channel) {
                warn!("analog trigger on disabled channel {}", channel.get());
                return Err(CaptureError::Plan(PlanError::InvalidRequest));
            }
        }

        let mut claims = Claims::default();
        let result = self.cycle(arena, layout, trigger, &mut claims);
        self.teardown(&claims);
        match result {
            Ok(RunOutcome::Completed { .. }) => {
                let data_bytes = self.encoder.finish(
                    &mut self.parts.transport,
                    &mut self.parts.delay,
                    self.config,
                )?;
                info!("capture complete, {} data bytes", data_bytes);
                Ok(RunOutcome::Completed { data_bytes })
            }
            Ok(outcome) => {
                self.encoder.discard();
                info!("capture interrupted by host: {:?}", outcome);
                Ok(outcome)
            }
            Err(err) => {
                self.encoder.discard();
                Err(err)
            }
        }
    }

    fn cycle(
        &mut self,
        arena: &mut SampleArena<'_>,
        layout: &BufferLayout,
        trigger: TriggerKind,
        claims: &mut Claims,
    ) -> Result<RunOutcome, CaptureError> {
        self.claim(layout.has_analog(), claims)?;
        if self.recovery.needs_recovery() {
            self.recover();
        }
        self.configure(layout)?;

        let mut buffers = arena.carve(layout)?;
        self.prime(&mut buffers, layout.has_analog())?;
        self.encoder.begin(layout.decimation_factor);
        self.detector.arm(trigger);
        self.session.arm();
        info!(
            "armed: {} samples/half, k={}, trigger {:?}",
            layout.samples_per_half,
            layout.decimation_factor,
            trigger
        );

        if let Some(interrupt) = self.wait_fast_trigger(trigger)? {
            return Ok(interrupt.into());
        }

        if layout.has_analog() {
            let stale = self.parts.analog.drain_fifo();
            debug!("dropped {} stale ADC words", stale);
            self.parts.analog.start();
        }
        self.parts.digital.start();
        self.session.start();

        self.stream(&mut buffers, layout)
    }

    fn claim(&mut self, analog: bool, claims: &mut Claims) -> Result<(), CaptureError> {
        self.parts
            .digital
            .claim()
            .map_err(|_| fault(HardwareFault::SequencerClaim))?;
        claims.sequencer = true;
        self.parts
            .digital_dma
            .claim()
            .map_err(|_| fault(HardwareFault::DigitalDmaClaim))?;
        claims.digital_dma = true;
        if analog {
            self.parts
                .analog_dma
                .claim()
                .map_err(|_| fault(HardwareFault::AnalogDmaClaim))?;
            claims.analog_dma = true;
        }
        Ok(())
    }

    fn recover(&mut self) {
        let stalls = self.recovery.stall_count();
        self.parts.digital.stop();
        self.parts.analog.stop();
        self.parts.digital_dma.abort();
        self.parts.analog_dma.abort();
        let dropped = self.parts.analog.drain_fifo();
        self.recovery.on_recovered();
        info!(
            "acquisition reset after {} stall(s), {} stale ADC words dropped",
            stalls,
            dropped
        );
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: decimation ≥ 1; C ≤ 8 so the product fits
    #[allow(clippy::cast_possible_truncation)] // channel count ≤ 8
    fn configure(&mut self, layout: &BufferLayout) -> Result<(), CaptureError> {
        let rate = self.session.sample_rate();
        let timing = SequencerTiming::for_rate(rate, self.config.sys_clock_hz);
        self.parts
            .digital
            .configure(timing, self.session.digital())
            .map_err(|_| fault(HardwareFault::SequencerConfig))?;
        debug!(
            "sequencer {:?}, achieved {} mHz",
            timing.program,
            timing.achieved_rate_millihz(self.config.sys_clock_hz)
        );

        if layout.has_analog() {
            let group_rate = rate.get() / layout.decimation_factor;
            let conversions = group_rate.saturating_mul(layout.analog_channels as u32);
            let divisor = AdcClockDivisor::for_rate(conversions, self.config.adc_clock_hz);
            self.parts
                .analog
                .configure(divisor, self.session.analog())
                .map_err(|_| fault(HardwareFault::AdcConfig))?;
        }
        Ok(())
    }

    fn prime(&mut self, buffers: &mut CaptureBuffers<'_>, analog: bool) -> Result<(), CaptureError> {
        let (first, second) = buffers.digital.both_mut();
        self.parts
            .digital_dma
            .prime(first, second)
            .map_err(|_| fault(HardwareFault::DmaPrime))?;
        if analog {
            let (first, second) = buffers.analog.both_mut();
            self.parts
                .analog_dma
                .prime(first, second)
                .map_err(|_| fault(HardwareFault::DmaPrime))?;
        }
        Ok(())
    }

    /// Block until a hardware-watched edge or a device-state match, servicing
    /// abort bytes meanwhile. Other trigger kinds return immediately and are
    /// evaluated on captured samples.
    fn wait_fast_trigger(&mut self, trigger: TriggerKind) -> Result<Option<Interrupt>, CaptureError> {
        let hardware_edge = match trigger {
            TriggerKind::DigitalEdge { channel, edge } => self.parts.digital.watch_edge(channel, edge),
            TriggerKind::InternalVariable { .. } => false,
            _ => return Ok(None),
        };
        if !hardware_edge && !self.detector.watches_variable() {
            return Ok(None);
        }

        loop {
            if let Some(interrupt) = self.service_link()? {
                return Ok(Some(interrupt));
            }
            let seen = if hardware_edge {
                self.parts.digital.edge_seen()
            } else {
                self.detector.evaluate_variable(&self.parts.probe)
            };
            if seen {
                self.detector.force_detected();
                debug!("trigger seen before start");
                return Ok(None);
            }
        }
    }

    fn stream(
        &mut self,
        buffers: &mut CaptureBuffers<'_>,
        layout: &BufferLayout,
    ) -> Result<RunOutcome, CaptureError> {
        let analog = layout.has_analog();
        let mut progress = Progress {
            held: HeldGroup::new(self.session.analog(), self.detector.kind()),
            triggered: self.detector.consume(),
            captured: 0,
            total: self.session.total_samples(),
        };
        let mut current = HalfIndex::A;
        let budget_us = self
            .config
            .stall_budget_us(layout.samples_per_half, self.session.sample_rate().get());
        let interval_us = self.config.stall_poll_interval_us;
        let mut waited_us = 0u64;

        loop {
            if let Some(interrupt) = self.service_link()? {
                return Ok(interrupt.into());
            }

            let digital_done = self
                .parts
                .digital_dma
                .poll_filled(current, buffers.digital.get_mut(current));
            let analog_done = !analog
                || self
                    .parts
                    .analog_dma
                    .poll_filled(current, buffers.analog.get_mut(current));

            if !(digital_done && analog_done) {
                if waited_us >= budget_us {
                    return Err(self.stall(current, digital_done));
                }
                self.parts.delay.delay_us(interval_us);
                waited_us = waited_us.saturating_add(u64::from(interval_us));
                continue;
            }
            waited_us = 0;

            let completed = current;
            current = current.other();
            self.parts
                .digital_dma
                .rewind(completed, buffers.digital.get_mut(completed));
            if analog {
                self.parts
                    .analog_dma
                    .rewind(completed, buffers.analog.get_mut(completed));
            }
            debug!("half {:?} complete", completed);

            let done = self.hand_off(
                buffers.digital.get(completed),
                buffers.analog.get(completed),
                layout,
                &mut progress,
            )?;
            self.encoder
                .flush(&mut self.parts.transport, &mut self.parts.delay, self.config)?;
            if done {
                self.session.finish();
                return Ok(RunOutcome::Completed {
                    data_bytes: self.encoder.data_bytes(),
                });
            }
            // Filling half already complete: the chain lapped the reader.
            let lapped = self.parts.digital_dma.peek_filled(current)
                || (analog && self.parts.analog_dma.peek_filled(current));
            if lapped {
                error!("DMA overran the reader on half {:?}", current);
                return Err(CaptureError::Overrun);
            }
        }
    }

    /// Encode one completed half. Returns `true` once the requested number
    /// of samples has been encoded.
    #[allow(clippy::arithmetic_side_effects)] // Safety: decimation ≥ 1; captured < total ≤ u32::MAX
    fn hand_off(
        &mut self,
        digital: &[u8],
        analog: &[u16],
        layout: &BufferLayout,
        progress: &mut Progress,
    ) -> Result<bool, CaptureError> {
        let k = layout.decimation_factor as usize;
        let mask = self.session.digital().bits();
        let mut groups = analog.chunks_exact(layout.analog_channels.max(1));

        for (s, &lines) in digital.iter().enumerate() {
            let fresh = layout.has_analog() && s % k == 0;
            if fresh {
                if let Some(group) = groups.next() {
                    progress.held.refresh(group);
                }
            }

            if !progress.triggered {
                let sample = TriggerSample {
                    digital: lines,
                    analog: if fresh { progress.held.trigger_code() } else { None },
                };
                if !self.detector.evaluate(sample) {
                    continue;
                }
                self.detector.consume();
                progress.triggered = true;
                info!("trigger at half offset {}", s);
            }
            // Decimated streams start on a group boundary so that every
            // k-th sent sample carries the group converted with it.
            if progress.captured == 0 && layout.has_analog() && !fresh {
                continue;
            }

            self.encoder.push_sample(
                lines & mask,
                &progress.held.codes,
                &mut self.parts.transport,
                &mut self.parts.delay,
                self.config,
            )?;
            progress.captured += 1;
            if progress.captured >= progress.total {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Drain inbound bytes; `+` and `*` interrupt the capture, anything else
    /// is dropped.
    fn service_link(&mut self) -> Result<Option<Interrupt>, CaptureError> {
        while self.parts.transport.available() > 0 {
            let byte = self
                .parts
                .transport
                .read_byte()
                .map_err(|_| CaptureError::Transport)?;
            match byte {
                Some(b'+') => return Ok(Some(Interrupt::Abort)),
                Some(b'*') => return Ok(Some(Interrupt::Reset)),
                Some(_) => {}
                None => break,
            }
        }
        Ok(None)
    }

    fn stall(&mut self, half: HalfIndex, digital_done: bool) -> CaptureError {
        if digital_done {
            self.parts.analog_dma.force_idle(half);
        } else {
            self.parts.digital_dma.force_idle(half);
        }
        self.recovery.on_stall();
        error!(
            "{} DMA stalled on half {:?} ({} stalls since recovery)",
            if digital_done { "analog" } else { "digital" },
            half,
            self.recovery.stall_count()
        );
        CaptureError::Stall
    }

    fn teardown(&mut self, claims: &Claims) {
        if claims.sequencer {
            self.parts.digital.stop();
        }
        if claims.analog_dma {
            self.parts.analog.stop();
        }
        if claims.digital_dma {
            self.parts.digital_dma.abort();
            self.parts.digital_dma.release();
        }
        if claims.analog_dma {
            self.parts.analog_dma.abort();
            self.parts.analog_dma.release();
        }
        if claims.sequencer {
            self.parts.digital.release();
        }
    }
}

fn fault(kind: HardwareFault) -> CaptureError {
    warn!("hardware unavailable: {:?}", kind);
    CaptureError::Hardware(kind)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests unwrap fakes that only fail when told to
mod tests {
    use super::*;
    use crate::session::CaptureState;
    use platform::mocks::{FakeDmaPingPong, HostBoard};
    use platform::{ChannelIndex, Edge, SampleRateHz};

    struct Rig {
        parts: BoardParts<HostBoard>,
        session: CaptureSession,
        detector: TriggerDetector,
        encoder: Encoder,
        recovery: DmaRecoveryState,
        config: EngineConfig,
        words: std::vec::Vec<u32>,
    }

    impl Rig {
        fn new() -> Self {
            let config = EngineConfig {
                stall_poll_interval_us: 1_000,
                stall_margin_us: 0,
                ..EngineConfig::default()
            };
            Self {
                parts: HostBoard::parts(),
                session: CaptureSession::new(&config),
                detector: TriggerDetector::new(),
                encoder: Encoder::new(),
                recovery: DmaRecoveryState::new(),
                config,
                words: vec![0; 4096],
            }
        }

        fn run(&mut self) -> Result<RunOutcome, CaptureError> {
            let mut arena = SampleArena::new(&mut self.words);
            let layout = self
                .session
                .plan(arena.capacity_bytes(), &self.config)
                .unwrap();
            Coordinator::new(
                &mut self.parts,
                &mut self.session,
                &mut self.detector,
                &mut self.encoder,
                &mut self.recovery,
                &self.config,
            )
            .run(&mut arena, &layout)
        }
    }

    #[test]
    fn completes_and_releases_everything() {
        let mut rig = Rig::new();
        rig.session.set_total_samples(10);
        let outcome = rig.run().unwrap();
        assert_eq!(outcome, RunOutcome::Completed { data_bytes: 20 });
        assert_eq!(rig.session.state(), CaptureState::DataReady);
        assert!(!rig.parts.digital.is_claimed());
        assert!(!rig.parts.digital_dma.is_claimed());
        assert!(!rig.parts.digital.is_running());
        assert!(rig.parts.transport.tx().ends_with(b"$20+"));
    }

    #[test]
    fn spans_several_halves_and_rewinds_each() {
        let mut rig = Rig::new();
        rig.config.planner.preferred_half_samples = 16;
        rig.session.set_total_samples(40);
        assert_eq!(rig.run().unwrap(), RunOutcome::Completed { data_bytes: 80 });
        // 16 + 16 + 8 of the third half.
        assert_eq!(rig.parts.digital_dma.completed(), 3);
        assert_eq!(rig.parts.digital_dma.rewinds(), 3);
    }

    #[test]
    fn busy_sequencer_claims_nothing_else() {
        let mut rig = Rig::new();
        rig.parts.digital.set_busy(true);
        assert_eq!(
            rig.run(),
            Err(CaptureError::Hardware(HardwareFault::SequencerClaim))
        );
        assert!(!rig.parts.digital_dma.is_claimed());
        assert_eq!(rig.parts.digital.releases(), 0);
        assert!(rig.parts.transport.tx().is_empty());
    }

    #[test]
    fn busy_analog_dma_releases_digital_side() {
        let mut rig = Rig::new();
        rig.session.set_analog(ChannelIndex::new(0).unwrap(), true);
        rig.parts.analog_dma.set_busy(true);
        assert_eq!(
            rig.run(),
            Err(CaptureError::Hardware(HardwareFault::AnalogDmaClaim))
        );
        assert!(!rig.parts.digital.is_claimed());
        assert!(!rig.parts.digital_dma.is_claimed());
    }

    #[test]
    fn stall_forces_half_idle_and_flags_recovery() {
        let mut rig = Rig::new();
        rig.parts.digital_dma = FakeDmaPingPong::counter().stall_after(0);
        assert_eq!(rig.run(), Err(CaptureError::Stall));
        assert_eq!(rig.parts.digital_dma.forced_idle(), &[HalfIndex::A]);
        assert!(rig.recovery.needs_recovery());
        assert!(!rig.parts.digital.is_claimed());

        rig.session.reset();
        rig.parts.digital_dma = FakeDmaPingPong::counter();
        rig.session.set_total_samples(4);
        assert_eq!(rig.run().unwrap(), RunOutcome::Completed { data_bytes: 8 });
        assert!(!rig.recovery.needs_recovery());
    }

    #[test]
    fn slow_rate_waits_out_a_long_half() {
        let mut rig = Rig::new();
        // 100 samples per half at 100 Hz: one second, a thousand 1 ms polls.
        rig.config.planner.preferred_half_samples = 100;
        rig.session.set_sample_rate(SampleRateHz::new(100).unwrap());
        rig.session.set_total_samples(200);
        rig.parts.digital_dma = FakeDmaPingPong::counter().with_latency(1_000);
        assert_eq!(rig.run().unwrap(), RunOutcome::Completed { data_bytes: 400 });
        assert!(!rig.recovery.needs_recovery());
        assert!(rig.parts.digital_dma.forced_idle().is_empty());
    }

    #[test]
    fn same_latency_at_fast_rate_is_a_stall() {
        let mut rig = Rig::new();
        // 1 ms per half at 100 kHz; a second of silence is far past the budget.
        rig.session.set_sample_rate(SampleRateHz::new(100_000).unwrap());
        rig.session.set_total_samples(100);
        rig.parts.digital_dma = FakeDmaPingPong::counter().with_latency(1_000);
        assert_eq!(rig.run(), Err(CaptureError::Stall));
        assert_eq!(rig.parts.digital_dma.forced_idle(), &[HalfIndex::A]);
    }

    #[test]
    fn lapped_half_aborts_with_overrun() {
        let mut rig = Rig::new();
        rig.config.planner.preferred_half_samples = 16;
        rig.session.set_total_samples(64);
        rig.parts.digital_dma = FakeDmaPingPong::counter().overrun_after(1);
        assert_eq!(rig.run(), Err(CaptureError::Overrun));
        assert_eq!(rig.parts.digital_dma.completed(), 1);
        assert!(rig.parts.digital_dma.aborts() >= 1);
        assert!(!rig.parts.digital_dma.is_claimed());
        assert!(!rig.parts.digital.is_claimed());
        assert!(!rig.recovery.needs_recovery());
        assert!(!rig.parts.transport.tx().contains(&b'$'));
    }

    #[test]
    fn decimated_trigger_snaps_to_group_boundary() {
        let mut rig = Rig::new();
        rig.session.set_sample_rate(SampleRateHz::new(800_000).unwrap());
        rig.session.set_analog(ChannelIndex::new(0).unwrap(), true);
        // Line 0 of the counter rises at sample 1, inside the first group.
        rig.session.set_trigger(TriggerKind::DigitalEdge {
            channel: ChannelIndex::new(0).unwrap(),
            edge: Edge::Rising,
        });
        rig.session.set_total_samples(2);
        rig.run().unwrap();
        // Sample 4 with group 1 (ramp word 1), then sample 5 alone.
        assert_eq!(
            &rig.parts.transport.tx()[..6],
            &[0x84, 0x80, 0x81, 0x80, 0x85, 0x80]
        );
    }

    #[test]
    fn software_trigger_discards_pre_trigger_samples() {
        let mut rig = Rig::new();
        // Line 2 of the counter rises at sample 4.
        rig.session.set_trigger(TriggerKind::DigitalEdge {
            channel: ChannelIndex::new(2).unwrap(),
            edge: Edge::Rising,
        });
        rig.session.set_total_samples(3);
        rig.run().unwrap();
        let tx = rig.parts.transport.tx();
        assert_eq!(&tx[..6], &[0x84, 0x80, 0x85, 0x80, 0x86, 0x80]);
    }

    #[test]
    fn hardware_edge_starts_at_first_sample() {
        let mut rig = Rig::new();
        rig.parts.digital = platform::mocks::FakeDigitalSampler::new().with_edge_watch(3);
        rig.session.set_trigger(TriggerKind::DigitalEdge {
            channel: ChannelIndex::new(0).unwrap(),
            edge: Edge::Falling,
        });
        rig.session.set_total_samples(2);
        rig.run().unwrap();
        assert_eq!(&rig.parts.transport.tx()[..4], &[0x80, 0x80, 0x81, 0x80]);
    }

    #[test]
    fn abort_during_variable_wait_sends_nothing() {
        let mut rig = Rig::new();
        rig.session.set_trigger(TriggerKind::InternalVariable { id: 1, value: 9 });
        rig.parts.transport.push_rx(b"x+");
        assert_eq!(rig.run().unwrap(), RunOutcome::Aborted);
        assert!(rig.parts.transport.tx().is_empty());
        assert!(!rig.parts.digital.is_claimed());
        assert_eq!(rig.parts.digital.starts(), 0);
    }

    #[test]
    fn analog_trigger_needs_enabled_channel() {
        let mut rig = Rig::new();
        rig.session.set_sample_rate(SampleRateHz::new(1_000).unwrap());
        rig.session.set_trigger(TriggerKind::AnalogLevel {
            channel: ChannelIndex::new(1).unwrap(),
            level: 100,
            edge: Edge::Rising,
        });
        assert_eq!(rig.run(), Err(CaptureError::Plan(PlanError::InvalidRequest)));
        assert_eq!(rig.parts.digital.claims(), 0);
    }
}
