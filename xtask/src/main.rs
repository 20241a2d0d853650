// Desktop tooling crate: unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod decode;
mod doc;
mod flash;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Breadboard LA development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flash firmware to the RP2040 via probe-rs
    Flash {
        /// Build and flash release version
        #[arg(short, long)]
        release: bool,
    },
    /// Check firmware builds for both hardware and emulator targets
    Check,
    /// Run all tests (unit, integration, and doc)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
    /// Build and optionally open documentation
    Doc {
        /// Open documentation in browser
        #[arg(long)]
        open: bool,
    },
    /// Decode a recorded capture stream into CSV
    Decode {
        /// Raw bytes received after `F` (up to and including `$<n>+`)
        input: PathBuf,
        /// Enabled analog channels when the capture ran
        #[arg(short, long, default_value_t = 0)]
        analog: usize,
        /// Analog decimation factor (the `*<k>` reply to `R`)
        #[arg(short = 'k', long, default_value_t = 1)]
        decimation: u32,
        /// Write CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Flash { release } => flash::run(release),
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
        Commands::Doc { open } => doc::run(open),
        Commands::Decode {
            input,
            analog,
            decimation,
            output,
        } => decode::run(&input, analog, decimation, output.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_takes_factor_from_rate_reply() {
        // `R800000` with one analog channel answers `*4`.
        let cli = Cli::try_parse_from(["xtask", "decode", "cap.bin", "-a", "1", "-k", "4"]).unwrap();
        match cli.command {
            Commands::Decode {
                analog, decimation, ..
            } => {
                assert_eq!(analog, 1);
                assert_eq!(decimation, 4);
            }
            _ => panic!("expected decode"),
        }
    }
}
