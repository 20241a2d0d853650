//! Capture engine emulator
//!
//! The full command protocol on stdin/stdout, backed by synthetic signals:
//! digital lines count up, ADC inputs carry a triangle wave.
//! Run with: cargo run --example emulator --features emulator
//!
//! ```text
//! $ printf 'i\nA10\nL16\nF' | cargo run -q --example emulator --features emulator | xxd
//! ```

use std::thread;
use std::time::Duration;

use capture::{CaptureEngine, EngineConfig};
use firmware::emulator::{init_tracing, EmulatorBoard, StdioTransport};
use platform::config;
use platform::memory::CAPTURE_ARENA_WORDS;
use platform::{CaptureActivity, SerialTransport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    tracing::info!("{} v{} - emulator", config::APP_NAME, config::APP_VERSION);

    let activity = CaptureActivity::new();
    let mut arena = vec![0u32; CAPTURE_ARENA_WORDS];
    let parts = EmulatorBoard::parts(StdioTransport::spawn());
    let mut engine = CaptureEngine::new(parts, &mut arena, &activity, EngineConfig::default())
        .map_err(|e| format!("engine config rejected: {e:?}"))?;

    loop {
        if let Err(e) = engine.poll() {
            tracing::warn!("command loop: {e}");
        }
        let transport = &engine.parts().transport;
        if transport.is_closed() && transport.available() == 0 {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    tracing::info!("stdin closed, exiting");
    Ok(())
}
