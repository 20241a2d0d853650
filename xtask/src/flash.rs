use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

const TARGET: &str = "thumbv6m-none-eabi";
const CHIP: &str = "RP2040";

fn binary_path(release: bool) -> String {
    let profile = if release { "release" } else { "debug" };
    format!("target/{TARGET}/{profile}/firmware")
}

pub fn run(release: bool) -> Result<()> {
    let mode = if release { "release" } else { "debug" };

    println!();
    println!("{}", format!("🔨 Building firmware ({mode} mode)...").cyan().bold());

    let build_start = Instant::now();
    let mut build = Command::new("cargo");
    build.args(["build", "-p", "firmware", "--target", TARGET, "--features", "hardware"]);
    if release {
        build.arg("--release");
    }
    let output = build.output().context("Failed to run cargo build")?;
    if !output.status.success() {
        eprintln!("{}", "✗ Build failed".red().bold());
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("Build failed");
    }
    println!(
        "{}",
        format!("✓ Build successful in {:.2}s", build_start.elapsed().as_secs_f64()).green()
    );

    show_binary_size(release);

    println!();
    println!("{}", format!("📡 Flashing to {CHIP}...").cyan().bold());
    let flash_start = Instant::now();
    // `download` rather than `run`: the firmware never exits and RTT is
    // attached separately.
    let output = Command::new("probe-rs")
        .args(["download", "--chip", CHIP, "--probe-index", "0"])
        .arg(binary_path(release))
        .output()
        .context("Failed to run probe-rs. Is probe-rs installed? (cargo install probe-rs-tools)")?;
    if !output.status.success() {
        eprintln!("{}", "✗ Flash failed".red().bold());
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("Flash failed - check the SWD probe and that the board is powered");
    }

    let reset = Command::new("probe-rs")
        .args(["reset", "--chip", CHIP, "--probe-index", "0"])
        .output()
        .context("Failed to reset target")?;
    if !reset.status.success() {
        eprintln!("{}", "⚠ Reset failed; power-cycle the board".yellow());
    }

    println!(
        "{}",
        format!("✓ Flashed in {:.2}s", flash_start.elapsed().as_secs_f64()).green()
    );
    println!(
        "   {}",
        format!("Use 'probe-rs attach --chip {CHIP} {}' for RTT logs", binary_path(release))
            .dimmed()
    );
    println!();
    Ok(())
}

/// Best effort: needs `cargo-binutils`.
fn show_binary_size(release: bool) {
    let Ok(out) = Command::new("rust-size").arg("-A").arg(binary_path(release)).output() else {
        return;
    };
    if !out.status.success() {
        return;
    }
    println!("{}", "📊 Binary size:".cyan());
    for line in String::from_utf8_lossy(&out.stdout).lines() {
        if line.starts_with(".text") || line.starts_with(".data") || line.starts_with(".bss") {
            println!("   {}", line.dimmed());
        }
    }
}
