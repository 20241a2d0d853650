//! PIO-based digital sampler.
//!
//! Both programs are loaded once at boot and selected per capture, so arming
//! never touches instruction memory shared with the routing subsystem's
//! state machines.

use embassy_rp::pac;
use embassy_rp::peripherals::PIO1;
use embassy_rp::pio::{
    Common, Config, Direction, FifoJoin, LoadedProgram, Pin, ShiftConfig, ShiftDirection,
    StateMachine,
};
use fixed::types::U24F8;
use platform::config::DIGITAL_PIN_BASE;
use platform::{ChannelIndex, ChannelMask, DigitalSampler, Edge, SequencerProgram, SequencerTiming};

use super::RpError;
use crate::claims::{Resource, CLAIMS};

const STATE_MACHINE: Resource = Resource::PioStateMachine(0);

/// IO_BANK0 raw-interrupt bits per GPIO: level low, level high, edge low, edge high.
const EDGE_LOW: u32 = 1 << 2;
const EDGE_HIGH: u32 = 1 << 3;

/// Latched edge watch on one GPIO.
#[derive(Clone, Copy)]
struct EdgeWatch {
    register: usize,
    mask: u32,
}

/// PIO1 state machine 0 sampling GPIO 0..=7 into bytes.
pub struct PioSampler {
    _common: Common<'static, PIO1>,
    sm: StateMachine<'static, PIO1, 0>,
    pins: [Pin<'static, PIO1>; 8],
    continuous: LoadedProgram<'static, PIO1>,
    slow: LoadedProgram<'static, PIO1>,
    origin: u8,
    slow_delay: Option<u32>,
    claimed: bool,
    watch: Option<EdgeWatch>,
}

impl PioSampler {
    /// Load both sampling programs into PIO1 and take state machine 0.
    pub fn new(
        mut common: Common<'static, PIO1>,
        sm: StateMachine<'static, PIO1, 0>,
        pins: [Pin<'static, PIO1>; 8],
    ) -> Self {
        // One sample per cycle, autopushed a byte at a time.
        let continuous = pio_proc::pio_asm!(
            ".wrap_target",
            "    in pins, 8",
            ".wrap",
        );
        // in + irq + mov + (Y + 1) jmp iterations per sample.
        let slow = pio_proc::pio_asm!(
            ".wrap_target",
            "    in pins, 8",
            "    irq nowait 0",
            "    mov x, y",
            "delay:",
            "    jmp x-- delay",
            ".wrap",
        );
        let continuous = common.load_program(&continuous.program);
        let slow = common.load_program(&slow.program);
        let origin = continuous.origin;
        Self {
            _common: common,
            sm,
            pins,
            continuous,
            slow,
            origin,
            slow_delay: None,
            claimed: false,
            watch: None,
        }
    }

    /// Load Y with the per-sample delay through the TX FIFO.
    fn preload_delay(&mut self, delay_cycles: u32) {
        self.sm.tx().push(delay_cycles);
        // SAFETY: the state machine is disabled; PULL/MOV only touch its own
        // OSR and Y register.
        unsafe {
            self.sm.exec_instr(
                pio::InstructionOperands::PULL {
                    if_empty: false,
                    block: true,
                }
                .encode(),
            );
            self.sm.exec_instr(
                pio::InstructionOperands::MOV {
                    destination: pio::MovDestination::Y,
                    op: pio::MovOperation::None,
                    source: pio::MovSource::OSR,
                }
                .encode(),
            );
        }
    }
}

impl DigitalSampler for PioSampler {
    type Error = RpError;

    fn claim(&mut self) -> Result<(), Self::Error> {
        if !self.claimed {
            CLAIMS.claim(STATE_MACHINE)?;
            self.claimed = true;
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.claimed {
            self.stop();
            self.watch = None;
            CLAIMS.release(STATE_MACHINE);
            self.claimed = false;
        }
    }

    fn configure(&mut self, timing: SequencerTiming, lines: ChannelMask) -> Result<(), Self::Error> {
        if !self.claimed {
            return Err(RpError::NotClaimed);
        }
        let (program, join, delay) = match timing.program {
            SequencerProgram::Continuous => (&self.continuous, FifoJoin::RxOnly, None),
            // Slow mode needs the TX FIFO to preload Y.
            SequencerProgram::Slow { delay_cycles } => (&self.slow, FifoJoin::Duplex, Some(delay_cycles)),
        };
        let mut cfg = Config::default();
        cfg.use_program(program, &[]);
        let origin = program.origin;
        let [p0, p1, p2, p3, p4, p5, p6, p7] = &self.pins;
        let pins = [p0, p1, p2, p3, p4, p5, p6, p7];
        cfg.set_in_pins(&pins);
        cfg.shift_in = ShiftConfig {
            auto_fill: true,
            threshold: 8,
            direction: ShiftDirection::Left,
        };
        cfg.fifo_join = join;
        cfg.clock_divider = U24F8::from_bits(timing.divider.bits());
        self.sm.set_config(&cfg);
        self.sm.set_pin_dirs(Direction::In, &pins);
        self.origin = origin;
        self.slow_delay = delay;
        defmt::debug!(
            "pio: {} div {}.{} lines {=u8:#x}",
            timing.program,
            timing.divider.int,
            timing.divider.frac,
            lines.bits()
        );
        Ok(())
    }

    fn start(&mut self) {
        self.sm.set_enable(false);
        self.sm.restart();
        self.sm.clear_fifos();
        if let Some(delay) = self.slow_delay {
            self.preload_delay(delay);
        }
        // SAFETY: jumps to the start of a program loaded by `new`.
        unsafe { self.sm.exec_jmp(self.origin) };
        self.sm.set_enable(true);
    }

    fn stop(&mut self) {
        self.sm.set_enable(false);
        self.sm.clear_fifos();
    }

    #[allow(clippy::cast_possible_truncation)] // eight lines from the base pin
    fn pins(&self) -> u8 {
        (pac::SIO.gpio_in().read() >> DIGITAL_PIN_BASE) as u8
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: gpio < 30, shifts < 32
    fn watch_edge(&mut self, line: ChannelIndex, edge: Edge) -> bool {
        let gpio = u32::from(DIGITAL_PIN_BASE) + u32::from(line.get());
        let shift = (gpio % 8) * 4;
        let bits = match edge {
            Edge::Rising => EDGE_HIGH,
            Edge::Falling => EDGE_LOW,
            Edge::Either => EDGE_HIGH | EDGE_LOW,
        };
        let watch = EdgeWatch {
            register: (gpio / 8) as usize,
            mask: bits << shift,
        };
        // Edges latched before arming do not count.
        pac::IO_BANK0
            .intr(watch.register)
            .write_value(pac::io::regs::Int(watch.mask));
        self.watch = Some(watch);
        true
    }

    fn edge_seen(&mut self) -> bool {
        let Some(watch) = self.watch else {
            return false;
        };
        let raw = pac::IO_BANK0.intr(watch.register).read().0;
        if raw & watch.mask == 0 {
            return false;
        }
        pac::IO_BANK0
            .intr(watch.register)
            .write_value(pac::io::regs::Int(watch.mask));
        self.watch = None;
        true
    }
}
