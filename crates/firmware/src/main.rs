//! Breadboard LA firmware - Main Entry Point
//!
//! Hardware-only entry point for the RP2040. Core 0 runs USB and the
//! routing/LED duties; core 1 runs the capture engine, whose capture loop
//! busy-polls DMA and must not share an executor with USB.

#![no_std]
#![no_main]

use capture::{CaptureEngine, EngineConfig};
use embassy_executor::{Executor, Spawner};
use embassy_rp::bind_interrupts;
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::{PIO1, USB};
use embassy_rp::pio::Pio;
use embassy_rp::usb::Driver;
use embassy_time::Timer;
use firmware::boot::{self, CORE1_STACK_BYTES, IDLE_POLL_US};
use firmware::rp::{usb, PioSampler, PipeTransport, RpAdc, RpBoard, RpPingPong};
use firmware::state::vars;
use firmware::{BoardCalibration, DeviceStateProbe, DEVICE_STATE};
use platform::config::{dev_banner, APP_VERSION};
use platform::memory::CAPTURE_ARENA_WORDS;
use platform::{BoardParts, CaptureActivity};
use static_cell::{ConstStaticCell, StaticCell};

// RTT transport for defmt and the panic handler
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    PIO1_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO1>;
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

// Capture arena: word-aligned, never on a stack, handed out exactly once.
static ARENA: ConstStaticCell<[u32; CAPTURE_ARENA_WORDS]> =
    ConstStaticCell::new([0; CAPTURE_ARENA_WORDS]);

// Set while a capture runs; core 0 duties yield on it.
static ACTIVITY: CaptureActivity = CaptureActivity::new();

static CORE1_STACK: StaticCell<Stack<CORE1_STACK_BYTES>> = StaticCell::new();
static CORE1_EXECUTOR: StaticCell<Executor> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    defmt::info!("{} v{}", dev_banner(), APP_VERSION);

    // Step 1: clocks
    let p = embassy_rp::init(boot::hardware::build_embassy_config());

    // Step 2: USB and the pipe pumps
    let link = usb::build(Driver::new(p.USB, Irqs));
    defmt::unwrap!(spawner.spawn(usb::device_task(link.device)));
    defmt::unwrap!(spawner.spawn(usb::rx_task(link.receiver)));
    defmt::unwrap!(spawner.spawn(usb::tx_task(link.sender)));

    // Step 3: capture engine on core 1
    let Pio {
        mut common, sm0, ..
    } = Pio::new(p.PIO1, Irqs);
    let pins = [
        common.make_pio_pin(p.PIN_0),
        common.make_pio_pin(p.PIN_1),
        common.make_pio_pin(p.PIN_2),
        common.make_pio_pin(p.PIN_3),
        common.make_pio_pin(p.PIN_4),
        common.make_pio_pin(p.PIN_5),
        common.make_pio_pin(p.PIN_6),
        common.make_pio_pin(p.PIN_7),
    ];
    let parts = BoardParts::<RpBoard> {
        digital: PioSampler::new(common, sm0, pins),
        analog: RpAdc::new(p.ADC, p.PIN_26, p.PIN_27, p.PIN_28, p.PIN_29),
        digital_dma: RpPingPong::digital(),
        analog_dma: RpPingPong::analog(),
        transport: PipeTransport::new(),
        delay: embassy_time::Delay,
        calibration: BoardCalibration::nominal(),
        probe: DeviceStateProbe::default(),
    };
    spawn_core1(p.CORE1, CORE1_STACK.init(Stack::new()), move || {
        let executor = CORE1_EXECUTOR.init(Executor::new());
        executor.run(|spawner| defmt::unwrap!(spawner.spawn(capture_task(parts))));
    });

    // Step 4: core 0 duties. Routing and LED rendering live outside this
    // repository; the frame counter stands in for them and honours the
    // capture pause.
    let mut frame: i32 = 0;
    loop {
        if !ACTIVITY.is_running() {
            frame = frame.wrapping_add(1);
            DEVICE_STATE.publish(vars::LED_FRAME, frame);
        }
        Timer::after_millis(20).await;
    }
}

#[embassy_executor::task]
async fn capture_task(parts: BoardParts<RpBoard>) -> ! {
    let mut engine = match CaptureEngine::new(parts, ARENA.take(), &ACTIVITY, EngineConfig::default()) {
        Ok(engine) => engine,
        Err(e) => {
            defmt::error!("capture config rejected: {}", e);
            loop {
                Timer::after_secs(1).await;
            }
        }
    };
    defmt::info!("capture engine ready on core 1");
    loop {
        if let Err(e) = engine.poll() {
            defmt::warn!("command loop: {}", e);
        }
        Timer::after_micros(IDLE_POLL_US).await;
    }
}
